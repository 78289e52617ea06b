use async_trait::async_trait;
use tracing::debug;

use crate::{
    protocol::tracks::{LoadResult, Track, TrackInfo, TrackQuery},
    sources::SourcePlugin,
};

/// HTTP/HTTPS Source Plugin
///
/// Turns direct stream URLs into a track without probing them; the voice
/// node fetches the audio itself.
pub struct HttpSource;

impl HttpSource {
    pub fn new() -> Self {
        Self
    }

    fn extract_metadata(&self, url: &str) -> TrackInfo {
        let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
        let rest = rest.split(['?', '#']).next().unwrap_or(rest);
        let title = rest
            .split_once('/')
            .and_then(|(_, path)| path.trim_end_matches('/').rsplit('/').next())
            .filter(|segment| !segment.is_empty())
            .unwrap_or("Audio Stream")
            .to_string();

        TrackInfo {
            identifier: url.to_string(),
            is_seekable: false,
            author: "unknown".to_string(),
            length: 0,
            is_stream: true,
            position: 0,
            title,
            uri: Some(url.to_string()),
            source_name: "http".to_string(),
        }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourcePlugin for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn can_handle(&self, query: &TrackQuery) -> bool {
        query.is_url()
    }

    async fn load(&self, query: &TrackQuery) -> LoadResult {
        let url = query.as_str();
        debug!("Resolving direct url: {}", url);
        LoadResult::Track(Track::new(self.extract_metadata(url)))
    }
}
