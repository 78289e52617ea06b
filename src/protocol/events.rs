use serde::{Deserialize, Serialize};

use crate::protocol::tracks::Track;

/// Events emitted by a voice connection to its subscriber.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum VoiceEvent {
    #[serde(rename = "TrackStartEvent")]
    TrackStart { track: Track },

    #[serde(rename = "TrackEndEvent")]
    TrackEnd { track: Track, reason: TrackEndReason },

    /// The transport closed underneath us.
    #[serde(rename = "WebSocketClosedEvent")]
    Closed {
        code: u16,
        reason: String,
        #[serde(rename = "byRemote")]
        by_remote: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackEndReason {
    Finished,
    LoadFailed,
    Stopped,
    Replaced,
    Cleanup,
}

impl TrackEndReason {
    /// Whether the track ended on its own, so the queue may move on.
    /// Stops, replacements and cleanups are driven by whoever caused them.
    pub fn may_start_next(self) -> bool {
        matches!(self, Self::Finished | Self::LoadFailed)
    }
}
