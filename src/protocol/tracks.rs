use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // Matches http:// or https:// URLs
    Regex::new(r"^https?://\S+$").expect("static regex")
});

/// A single audio track as returned by a source lookup.
///
/// Tracks are opaque to the player: they are queued, handed to the voice
/// connection and announced by title, nothing more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub info: TrackInfo,
    /// User-provided data attached to the track.
    #[serde(default = "default_json_object")]
    pub user_data: serde_json::Value,
}

fn default_json_object() -> serde_json::Value {
    serde_json::json!({})
}

impl Track {
    pub fn new(info: TrackInfo) -> Self {
        Self {
            info,
            user_data: default_json_object(),
        }
    }

    pub fn title(&self) -> &str {
        &self.info.title
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub identifier: String,
    pub is_seekable: bool,
    pub author: String,
    /// Length in milliseconds. 0 for live streams.
    pub length: u64,
    pub is_stream: bool,
    pub position: u64,
    pub title: String,
    pub uri: Option<String>,
    pub source_name: String,
}

/// Result of looking up an identifier against the sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "loadType", content = "data", rename_all = "camelCase")]
pub enum LoadResult {
    /// A single track was loaded.
    Track(Track),
    /// A playlist was loaded.
    Playlist(PlaylistData),
    /// A search returned results.
    Search(Vec<Track>),
    /// No matches found.
    Empty {},
    /// An error occurred during loading.
    Error(LoadError),
}

impl LoadResult {
    /// Every track carried by this result, in source order.
    pub fn into_tracks(self) -> Vec<Track> {
        match self {
            Self::Track(track) => vec![track],
            Self::Playlist(playlist) => playlist.tracks,
            Self::Search(tracks) => tracks,
            Self::Empty {} | Self::Error(_) => Vec::new(),
        }
    }

    pub fn is_miss(&self) -> bool {
        match self {
            Self::Track(_) => false,
            Self::Playlist(playlist) => playlist.tracks.is_empty(),
            Self::Search(tracks) => tracks.is_empty(),
            Self::Empty {} | Self::Error(_) => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistData {
    pub name: String,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadError {
    pub message: Option<String>,
    pub cause: String,
}

/// What the user asked to play: a direct URL or free-text search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackQuery {
    Url(String),
    Search(String),
}

impl TrackQuery {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if URL_REGEX.is_match(input) {
            Self::Url(input.to_string())
        } else {
            Self::Search(input.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(s) | Self::Search(s) => s,
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl std::fmt::Display for TrackQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_and_searches_are_told_apart() {
        assert!(TrackQuery::parse("https://cdn.example.org/a.mp3").is_url());
        assert!(TrackQuery::parse(" http://radio.example.org/live ").is_url());
        assert_eq!(
            TrackQuery::parse("never gonna give you up"),
            TrackQuery::Search("never gonna give you up".into())
        );
        assert!(!TrackQuery::parse("ftp://example.org/a.mp3").is_url());
    }

    #[test]
    fn empty_playlists_count_as_misses() {
        let playlist = LoadResult::Playlist(PlaylistData {
            name: "nothing".into(),
            tracks: vec![],
        });
        assert!(playlist.is_miss());
        assert!(LoadResult::Empty {}.is_miss());
        assert!(LoadResult::Search(vec![]).into_tracks().is_empty());
    }

    #[test]
    fn load_result_uses_tagged_shape() {
        let json = serde_json::to_value(LoadResult::Empty {}).unwrap();
        assert_eq!(json["loadType"], "empty");
    }
}
