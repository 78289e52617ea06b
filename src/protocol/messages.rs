//! User-facing response texts. The command layer relays these verbatim.

use crate::protocol::tracks::{Track, TrackQuery};

pub const CONNECTED: &str = "Joined the voice channel.";
pub const DISCONNECTED: &str = "Left the voice channel.";
pub const NOT_CONNECTED: &str = "Sorry, I'm currently not in any voice channel.";
pub const ALREADY_CONNECTED: &str = "Sorry, I'm already connected to a voice channel.";
pub const CONNECT_FAILED: &str = "Sorry, I couldn't join that voice channel.";
pub const PLAYBACK_FAILED: &str = "Sorry, the voice connection dropped before playback could start.";

pub const PLAYER_STOPPED: &str = "Player stopped.";
pub const NOTHING_TO_STOP: &str = "Sorry, there is nothing to stop.";
pub const NOTHING_TO_PAUSE: &str = "Sorry, there is nothing to pause.";
pub const NOTHING_TO_RESUME: &str = "Sorry, there is nothing to resume.";

pub const NO_TRACKS_LEFT: &str = "No tracks left in the queue.";
pub const QUEUE_CLEARED: &str = "Queue cleared.";
pub const QUEUE_ALREADY_EMPTY: &str = "The queue is already empty.";

pub const NOT_IN_VOICE: &str = "Sorry, you must be in a voice channel to use this command.";
pub const NOT_OPERATOR: &str = "Sorry, you must have Voice Operator privileges to use this command.";

pub fn now_playing(track: &Track) -> String {
    format!("Now playing `{}`.", track.title())
}

pub fn queued(track: &Track) -> String {
    format!("Queued `{}`.", track.title())
}

pub fn queued_playlist(count: usize, name: &str) -> String {
    format!("Queued {} tracks from `{}`.", count, name)
}

pub fn paused(track: &Track) -> String {
    format!("Paused `{}`.", track.title())
}

pub fn resumed(track: &Track) -> String {
    format!("Resumed `{}`.", track.title())
}

pub fn lookup_failed(query: &TrackQuery) -> String {
    format!("Failed to find tracks for query `{}`.", query)
}
