use async_trait::async_trait;

use super::{
    http::HttpSource,
    plugin::{BoxedSource, SourcePlugin, TrackLookup},
};
use crate::protocol::tracks::{LoadResult, TrackQuery};

/// Routes lookups to the first source that accepts them.
pub struct SourceManager {
    pub sources: Vec<BoxedSource>,
}

impl SourceManager {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// The sources that work without any credentials.
    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        manager.register(HttpSource::new());
        manager
    }

    pub fn register(&mut self, source: impl SourcePlugin + 'static) {
        tracing::info!("Loaded source: {}", source.name());
        self.sources.push(Box::new(source));
    }

    /// Load tracks using the first matching source
    pub async fn load(&self, query: &TrackQuery) -> LoadResult {
        for source in &self.sources {
            if source.can_handle(query) {
                tracing::trace!("Loading '{}' with source: {}", query, source.name());
                return source.load(query).await;
            }
        }

        tracing::debug!("No source could handle identifier: {}", query);
        LoadResult::Empty {}
    }
}

impl Default for SourceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackLookup for SourceManager {
    async fn lookup(&self, query: &TrackQuery) -> LoadResult {
        self.load(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedSource;

    #[tokio::test]
    async fn first_accepting_source_wins() {
        let mut manager = SourceManager::with_defaults();
        manager.register(ScriptedSource::new(&["song-a"]));

        let url = manager
            .load(&TrackQuery::parse("https://cdn.example.org/song-b.mp3"))
            .await;
        assert_eq!(url.into_tracks()[0].info.source_name, "http");

        let search = manager.load(&TrackQuery::parse("song-a")).await;
        assert_eq!(search.into_tracks()[0].title(), "song-a");
    }

    #[tokio::test]
    async fn unhandled_queries_are_empty() {
        let manager = SourceManager::with_defaults();
        let result = manager.lookup(&TrackQuery::parse("some search")).await;
        assert!(matches!(result, LoadResult::Empty {}));
    }
}
