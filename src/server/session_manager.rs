use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug, error, info, trace, warn};

use crate::{
    common::{
        errors::{OperationResult, VoiceError},
        types::{ChannelId, GuildId},
    },
    protocol::{events::VoiceEvent, messages},
    server::session::{Session, SessionEvents},
    voice::VoiceNode,
};

/// Guild → live session. The only place that knows whether a guild is connected.
pub struct SessionRegistry {
    node: Arc<dyn VoiceNode>,
    sessions: DashMap<GuildId, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new(node: Arc<dyn VoiceNode>) -> Self {
        Self {
            node,
            sessions: DashMap::new(),
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.sessions.get(&guild_id).map(|s| s.value().clone())
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    /// Snapshot of every live session.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|s| s.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns the guild's session, opening one on `channel_id` if there is none.
    pub async fn get_or_create(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        events: Arc<dyn SessionEvents>,
    ) -> OperationResult<Arc<Session>> {
        match self.get(guild_id) {
            Some(session) => OperationResult::success(session),
            None => self.create(guild_id, channel_id, events).await,
        }
    }

    /// Opens a new session. Fails if the guild already has one; the existing
    /// connection is never replaced.
    pub async fn create(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        events: Arc<dyn SessionEvents>,
    ) -> OperationResult<Arc<Session>> {
        if self.contains(guild_id) {
            return OperationResult::failure(messages::ALREADY_CONNECTED);
        }

        let connection = match self.node.connect(guild_id, channel_id).await {
            Ok(conn) => conn,
            Err(e) => {
                error!("[{}] failed to connect to channel {}: {}", guild_id, channel_id, e);
                return OperationResult::failure(messages::CONNECT_FAILED);
            }
        };

        let session = Arc::new(Session::new(guild_id, channel_id, connection));
        // subscribe first so nothing emitted before the pump starts is lost
        let rx = session.connection.subscribe();

        let inserted = match self.sessions.entry(guild_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                true
            }
        };

        if !inserted {
            // lost a race with another connect for this guild
            warn!("[{}] concurrent connect detected, dropping the new connection", guild_id);
            session.shutdown();
            if let Err(e) = session.connection.disconnect().await {
                debug!("[{}] discarding duplicate connection: {}", guild_id, e);
            }
            return OperationResult::failure(messages::ALREADY_CONNECTED);
        }

        tokio::spawn(pump_events(session.clone(), rx, events));
        info!(
            "[{}] session {} created on channel {}",
            guild_id, session.id, channel_id
        );
        OperationResult::success(session)
    }

    /// Removes `session` from the guild and disconnects it.
    ///
    /// Fails only when `session` is not the guild's current session. A
    /// connection that is already closed counts as disconnected.
    pub async fn remove(&self, guild_id: GuildId, session: &Session) -> OperationResult {
        let Some((_, removed)) = self
            .sessions
            .remove_if(&guild_id, |_, current| current.id == session.id)
        else {
            debug!("[{}] no session {} to remove", guild_id, session.id);
            return OperationResult::failure(messages::NOT_CONNECTED);
        };

        removed.shutdown();
        // must complete even if the caller is cancelled
        let connection = removed.connection.clone();
        match tokio::spawn(async move { connection.disconnect().await }).await {
            Ok(Ok(())) | Ok(Err(VoiceError::Closed)) => {}
            Ok(Err(e)) => warn!("[{}] error while disconnecting: {}", guild_id, e),
            Err(e) => error!("[{}] disconnect task failed: {}", guild_id, e),
        }

        info!("[{}] session {} removed", guild_id, removed.id);
        OperationResult::ok()
    }
}

/// Forwards one session's connection events until the session shuts down or
/// the connection goes away.
async fn pump_events(
    session: Arc<Session>,
    events: flume::Receiver<VoiceEvent>,
    handler: Arc<dyn SessionEvents>,
) {
    let cancel = session.cancel.clone();
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv_async() => match event {
                Ok(event) => event,
                Err(_) => break,
            },
        };

        match event {
            VoiceEvent::TrackStart { track } => {
                trace!("[{}] track started: {}", session.guild_id, track.title());
            }
            VoiceEvent::TrackEnd { track, reason } => {
                handler.on_track_end(&session, track, reason).await;
            }
            VoiceEvent::Closed {
                code,
                reason,
                by_remote,
            } => {
                handler.on_closed(&session, code, &reason, by_remote).await;
                break;
            }
        }
    }
    trace!("[{}] event pump for session {} stopped", session.guild_id, session.id);
}
