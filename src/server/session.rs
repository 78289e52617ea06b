use async_trait::async_trait;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    common::types::{ChannelId, GuildId, SessionId, now_ms},
    protocol::{events::TrackEndReason, tracks::Track},
    voice::BoxedConnection,
};

/// A guild's live voice connection.
pub struct Session {
    pub id: SessionId,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub connection: BoxedConnection,
    /// Unix timestamp in milliseconds.
    pub created_at: u64,
    /// Cancels this session's event pump.
    pub(crate) cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(guild_id: GuildId, channel_id: ChannelId, connection: BoxedConnection) -> Self {
        Self {
            id: SessionId::generate(),
            guild_id,
            channel_id,
            connection,
            created_at: now_ms(),
            cancel: CancellationToken::new(),
        }
    }

    /// Stops event delivery. The connection itself is left alone.
    pub(crate) fn shutdown(&self) {
        tracing::debug!("[{}] shutting down session {}", self.guild_id, self.id);
        self.cancel.cancel();
        self.connection.unsubscribe();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Receives the events of every registered session.
///
/// Called from the session's event pump, one event at a time per session.
#[async_trait]
pub trait SessionEvents: Send + Sync {
    async fn on_track_end(&self, session: &Arc<Session>, track: Track, reason: TrackEndReason);

    async fn on_closed(&self, session: &Arc<Session>, code: u16, reason: &str, by_remote: bool);
}
