use async_trait::async_trait;

use crate::protocol::tracks::{LoadResult, TrackQuery};

/// Trait that all source plugins must implement.
///
/// Each source resolves the identifiers it recognises into tracks.
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    /// Unique identifier for this source (e.g., "http")
    fn name(&self) -> &str;

    /// Check if this source can handle the given query.
    fn can_handle(&self, query: &TrackQuery) -> bool;

    /// Resolve the query into track(s).
    async fn load(&self, query: &TrackQuery) -> LoadResult;
}

pub type BoxedSource = Box<dyn SourcePlugin>;

/// Track lookup as seen by the player.
#[async_trait]
pub trait TrackLookup: Send + Sync {
    async fn lookup(&self, query: &TrackQuery) -> LoadResult;
}
