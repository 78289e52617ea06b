use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info, trace, warn};

use crate::{
    common::{
        errors::OperationResult,
        types::{ChannelId, GuildId},
    },
    protocol::{events::TrackEndReason, messages, tracks::Track},
    server::Session,
};

/// Where auto-advanced tracks are announced, usually the text channel the
/// queue was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusTarget(pub ChannelId);

/// Delivers announcements to a status target.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn announce(&self, guild_id: GuildId, target: StatusTarget, message: &str);
}

/// Read-only copy of a guild's queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub tracks: Vec<Track>,
    pub status_target: StatusTarget,
}

impl QueueSnapshot {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

struct GuildQueue {
    tracks: VecDeque<Track>,
    status_target: StatusTarget,
}

impl GuildQueue {
    fn new(status_target: StatusTarget) -> Self {
        Self {
            tracks: VecDeque::new(),
            status_target,
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tracks: self.tracks.iter().cloned().collect(),
            status_target: self.status_target,
        }
    }
}

/// What the completion handler did with a track-end event.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEndOutcome {
    /// Forced stop, stale event, or a guild without a queue.
    Ignored,
    /// Queue was empty; the connection was told to stop.
    Stopped,
    /// The next queued track is now playing.
    Advanced(Track),
    /// The next track could not be started.
    Failed,
}

/// Per-guild FIFO queues and their status targets.
///
/// Callers serialize access per guild (see `GuildLocks`); the map itself is
/// only touched through these methods.
pub struct QueueManager {
    queues: DashMap<GuildId, GuildQueue>,
    notifier: Arc<dyn StatusNotifier>,
}

impl QueueManager {
    pub fn new(notifier: Arc<dyn StatusNotifier>) -> Self {
        Self {
            queues: DashMap::new(),
            notifier,
        }
    }

    pub fn get_queue(&self, guild_id: GuildId) -> Option<QueueSnapshot> {
        self.queues.get(&guild_id).map(|q| q.snapshot())
    }

    /// Returns the guild's queue, provisioning an empty one announcing to
    /// `status_target` if it has none.
    pub fn get_or_create(&self, guild_id: GuildId, status_target: StatusTarget) -> QueueSnapshot {
        self.queues
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("[{}] queue created", guild_id);
                GuildQueue::new(status_target)
            })
            .snapshot()
    }

    pub fn len(&self, guild_id: GuildId) -> Option<usize> {
        self.queues.get(&guild_id).map(|q| q.tracks.len())
    }

    /// True when the guild has no queue or nothing in it.
    pub fn is_empty(&self, guild_id: GuildId) -> bool {
        self.len(guild_id).unwrap_or(0) == 0
    }

    /// Appends to the tail, creating the queue if needed. Returns the new length.
    pub fn enqueue_all(
        &self,
        guild_id: GuildId,
        tracks: Vec<Track>,
        status_target: StatusTarget,
    ) -> usize {
        let mut queue = self
            .queues
            .entry(guild_id)
            .or_insert_with(|| GuildQueue::new(status_target));
        queue.tracks.extend(tracks);
        queue.tracks.len()
    }

    /// Pops the head. An empty or missing queue is a warning, not a failure.
    pub fn try_dequeue(&self, guild_id: GuildId) -> OperationResult<Track> {
        let next = self
            .queues
            .get_mut(&guild_id)
            .and_then(|mut q| q.tracks.pop_front());
        match next {
            Some(track) => OperationResult::success(track),
            None => OperationResult::warning(messages::NO_TRACKS_LEFT),
        }
    }

    /// Empties the queue but keeps it (and its status target). Returns how
    /// many entries were dropped, or `None` if the guild has no queue.
    pub fn drain(&self, guild_id: GuildId) -> Option<usize> {
        self.queues.get_mut(&guild_id).map(|mut q| {
            let dropped = q.tracks.len();
            q.tracks.clear();
            dropped
        })
    }

    /// Discards the queue and its status target. Playback is not touched.
    pub fn clear(&self, guild_id: GuildId) -> Option<usize> {
        let removed = self.queues.remove(&guild_id).map(|(_, q)| q.tracks.len());
        if let Some(dropped) = removed {
            debug!("[{}] queue cleared ({} entries dropped)", guild_id, dropped);
        }
        removed
    }

    /// Completion handler. Must run under the guild's lock.
    ///
    /// Only organic endings advance the queue; stop/skip/replace are driven
    /// by whoever caused them. An ending is stale if the connection is
    /// already playing something else.
    pub async fn handle_track_end(
        &self,
        session: &Session,
        track: Track,
        reason: TrackEndReason,
    ) -> TrackEndOutcome {
        let guild_id = session.guild_id;

        if !reason.may_start_next() {
            trace!("[{}] {} ended ({:?}), not advancing", guild_id, track.title(), reason);
            return TrackEndOutcome::Ignored;
        }

        let Some(target) = self.queues.get(&guild_id).map(|q| q.status_target) else {
            trace!("[{}] no queue, nothing to advance", guild_id);
            return TrackEndOutcome::Ignored;
        };

        if let Some(current) = session.connection.current_track() {
            debug!(
                "[{}] stale end of {}, {} is already playing",
                guild_id,
                track.title(),
                current.title()
            );
            return TrackEndOutcome::Ignored;
        }

        let Some(next) = self.try_dequeue(guild_id).payload else {
            if let Err(e) = session.connection.stop().await {
                debug!("[{}] stop after queue end failed: {}", guild_id, e);
            }
            debug!("[{}] queue finished", guild_id);
            return TrackEndOutcome::Stopped;
        };

        if let Err(e) = session.connection.play(next.clone()).await {
            warn!("[{}] failed to start {}: {}", guild_id, next.title(), e);
            return TrackEndOutcome::Failed;
        }

        info!("[{}] auto-advanced to {}", guild_id, next.title());
        self.notifier
            .announce(guild_id, target, &messages::now_playing(&next))
            .await;
        TrackEndOutcome::Advanced(next)
    }
}
