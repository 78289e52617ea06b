//! Fixtures shared by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    common::types::GuildId,
    player::queue::{StatusNotifier, StatusTarget},
    protocol::tracks::{LoadResult, PlaylistData, Track, TrackInfo, TrackQuery},
    sources::SourcePlugin,
};

/// A track without a known length. The loopback node never ends it by itself.
pub fn track(title: &str) -> Track {
    timed_track(title, 0)
}

pub fn timed_track(title: &str, length_ms: u64) -> Track {
    Track::new(TrackInfo {
        identifier: title.to_string(),
        is_seekable: length_ms > 0,
        author: "test".to_string(),
        length: length_ms,
        is_stream: false,
        position: 0,
        title: title.to_string(),
        uri: None,
        source_name: "test".to_string(),
    })
}

/// Search source over a fixed catalogue.
pub struct ScriptedSource {
    catalogue: Vec<Track>,
    playlists: Vec<PlaylistData>,
}

impl ScriptedSource {
    pub fn new(titles: &[&str]) -> Self {
        Self {
            catalogue: titles.iter().map(|t| track(t)).collect(),
            playlists: Vec::new(),
        }
    }

    /// Makes `name` resolve to a playlist of `titles`.
    pub fn with_playlist(mut self, name: &str, titles: &[&str]) -> Self {
        self.playlists.push(PlaylistData {
            name: name.to_string(),
            tracks: titles.iter().map(|t| track(t)).collect(),
        });
        self
    }
}

#[async_trait]
impl SourcePlugin for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn can_handle(&self, query: &TrackQuery) -> bool {
        !query.is_url()
    }

    async fn load(&self, query: &TrackQuery) -> LoadResult {
        let needle = query.as_str();
        if let Some(playlist) = self.playlists.iter().find(|p| p.name == needle) {
            return LoadResult::Playlist(playlist.clone());
        }

        let exact: Vec<Track> = self
            .catalogue
            .iter()
            .filter(|t| t.title() == needle)
            .cloned()
            .collect();
        if !exact.is_empty() {
            return LoadResult::Search(exact);
        }

        let partial: Vec<Track> = self
            .catalogue
            .iter()
            .filter(|t| t.title().contains(needle))
            .cloned()
            .collect();
        if partial.is_empty() {
            LoadResult::Empty {}
        } else {
            LoadResult::Search(partial)
        }
    }
}

/// Collects every announcement.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(GuildId, StatusTarget, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(GuildId, StatusTarget, String)> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl StatusNotifier for RecordingNotifier {
    async fn announce(&self, guild_id: GuildId, target: StatusTarget, message: &str) {
        self.messages.lock().push((guild_id, target, message.to_string()));
    }
}
