use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    common::{
        errors::{OperationResult, VoiceError},
        types::{ChannelId, GuildId},
    },
    player::{
        checks,
        queue::{QueueManager, QueueSnapshot, StatusNotifier, StatusTarget, TrackEndOutcome},
    },
    protocol::{
        command::{Command, CommandIntent},
        events::TrackEndReason,
        messages,
        tracks::{LoadResult, Track, TrackQuery},
    },
    server::{GuildLocks, Session, SessionEvents, SessionRegistry},
    sources::TrackLookup,
    voice::{VoiceNode, VoicePresence},
};

/// Where a command is aimed: the guild, the voice channel to join on demand,
/// and the text channel that follows the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceContext {
    pub guild_id: GuildId,
    pub voice_channel: ChannelId,
    pub status_target: StatusTarget,
}

impl VoiceContext {
    pub fn new(guild_id: GuildId, voice_channel: ChannelId, text_channel: ChannelId) -> Self {
        Self {
            guild_id,
            voice_channel,
            status_target: StatusTarget(text_channel),
        }
    }
}

/// Playback façade used by the command layer.
///
/// Every operation for a guild runs under that guild's lock, and so does the
/// handling of the guild's connection events. Different guilds never wait
/// on each other.
#[derive(Clone)]
pub struct PlayerService {
    inner: Arc<PlayerInner>,
}

struct PlayerInner {
    registry: SessionRegistry,
    queues: QueueManager,
    locks: GuildLocks,
    lookup: Arc<dyn TrackLookup>,
}

impl PlayerService {
    pub fn new(
        node: Arc<dyn VoiceNode>,
        lookup: Arc<dyn TrackLookup>,
        notifier: Arc<dyn StatusNotifier>,
    ) -> Self {
        Self {
            inner: Arc::new(PlayerInner {
                registry: SessionRegistry::new(node),
                queues: QueueManager::new(notifier),
                locks: GuildLocks::new(),
                lookup,
            }),
        }
    }

    pub fn session(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.inner.registry.get(guild_id)
    }

    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.inner.registry.sessions()
    }

    pub fn is_connected(&self, guild_id: GuildId) -> bool {
        self.inner.registry.contains(guild_id)
    }

    pub fn queue(&self, guild_id: GuildId) -> Option<QueueSnapshot> {
        self.inner.queues.get_queue(guild_id)
    }

    fn events(&self) -> Arc<dyn SessionEvents> {
        self.inner.clone()
    }

    /// Joins `ctx.voice_channel`. Fails if the guild is already connected.
    pub async fn connect(&self, ctx: &VoiceContext) -> OperationResult<Arc<Session>> {
        let _guard = self.inner.locks.lock(ctx.guild_id).await;
        let result = self
            .inner
            .registry
            .create(ctx.guild_id, ctx.voice_channel, self.events())
            .await;
        if result.is_success() {
            result.with_message(messages::CONNECTED)
        } else {
            result
        }
    }

    /// Leaves the guild's voice channel and drops its queue.
    pub async fn disconnect(&self, guild_id: GuildId) -> OperationResult {
        let _guard = self.inner.locks.lock(guild_id).await;
        self.inner.disconnect_locked(guild_id).await
    }

    /// Replaces the queue with a fresh one and plays the first match.
    pub async fn play(&self, ctx: &VoiceContext, query: &str) -> OperationResult<Vec<Track>> {
        let _guard = self.inner.locks.lock(ctx.guild_id).await;
        let query = TrackQuery::parse(query);
        let session = match self.join_on_demand(ctx).await {
            Ok(session) => session,
            Err(failure) => return failure,
        };
        self.inner.play_locked(ctx, &session, &query).await
    }

    /// Appends to the queue, or plays right away if nothing is playing or queued.
    pub async fn enqueue(&self, ctx: &VoiceContext, query: &str) -> OperationResult<Vec<Track>> {
        let _guard = self.inner.locks.lock(ctx.guild_id).await;
        let query = TrackQuery::parse(query);
        let session = match self.join_on_demand(ctx).await {
            Ok(session) => session,
            Err(failure) => return failure,
        };

        let idle = self.inner.queues.is_empty(ctx.guild_id)
            && session.connection.current_track().is_none();
        if idle {
            return self.inner.play_locked(ctx, &session, &query).await;
        }

        let result = self.inner.lookup.lookup(&query).await;
        if result.is_miss() {
            debug!("[{}] no tracks for {}", ctx.guild_id, query);
            return OperationResult::failure(messages::lookup_failed(&query));
        }

        let (tracks, message) = match result {
            LoadResult::Playlist(playlist) => {
                let message = messages::queued_playlist(playlist.tracks.len(), &playlist.name);
                (playlist.tracks, message)
            }
            other => match other.into_tracks().into_iter().next() {
                Some(track) => {
                    let message = messages::queued(&track);
                    (vec![track], message)
                }
                None => unreachable!("a lookup hit carries at least one track"),
            },
        };

        let len = self
            .inner
            .queues
            .enqueue_all(ctx.guild_id, tracks.clone(), ctx.status_target);
        debug!("[{}] queued {} track(s), {} waiting", ctx.guild_id, tracks.len(), len);
        OperationResult::success(tracks).with_message(message)
    }

    /// Stops the current track and plays the next queued one.
    pub async fn skip(&self, guild_id: GuildId) -> OperationResult<Track> {
        let _guard = self.inner.locks.lock(guild_id).await;
        let Some(session) = self.inner.registry.get(guild_id) else {
            return OperationResult::failure(messages::NOT_CONNECTED);
        };

        // the Stopped end this produces never advances the queue
        if let Err(e) = session.connection.stop().await {
            return self.inner.transport_failure(guild_id, e);
        }

        let next = self.inner.queues.try_dequeue(guild_id);
        let Some(track) = next.payload.clone() else {
            return next;
        };

        if let Err(e) = session.connection.play(track.clone()).await {
            return self.inner.transport_failure(guild_id, e);
        }
        info!("[{}] skipped to {}", guild_id, track.title());
        let message = messages::now_playing(&track);
        OperationResult::success(track).with_message(message)
    }

    pub async fn stop(&self, guild_id: GuildId) -> OperationResult {
        let _guard = self.inner.locks.lock(guild_id).await;
        let Some(session) = self.inner.registry.get(guild_id) else {
            return OperationResult::failure(messages::NOT_CONNECTED);
        };
        if session.connection.current_track().is_none() {
            return OperationResult::failure(messages::NOTHING_TO_STOP);
        }

        match session.connection.stop().await {
            Ok(()) => OperationResult::ok().with_message(messages::PLAYER_STOPPED),
            Err(e) => self.inner.transport_failure(guild_id, e),
        }
    }

    pub async fn pause(&self, guild_id: GuildId) -> OperationResult<Track> {
        let _guard = self.inner.locks.lock(guild_id).await;
        let Some(session) = self.inner.registry.get(guild_id) else {
            return OperationResult::failure(messages::NOT_CONNECTED);
        };
        let Some(track) = session.connection.current_track() else {
            return OperationResult::failure(messages::NOTHING_TO_PAUSE);
        };

        match session.connection.pause().await {
            Ok(()) => {
                let message = messages::paused(&track);
                OperationResult::success(track).with_message(message)
            }
            Err(e) => self.inner.transport_failure(guild_id, e),
        }
    }

    pub async fn resume(&self, guild_id: GuildId) -> OperationResult<Track> {
        let _guard = self.inner.locks.lock(guild_id).await;
        let Some(session) = self.inner.registry.get(guild_id) else {
            return OperationResult::failure(messages::NOT_CONNECTED);
        };
        let track = match session.connection.current_track() {
            Some(track) if session.connection.is_paused() => track,
            _ => return OperationResult::failure(messages::NOTHING_TO_RESUME),
        };

        match session.connection.resume().await {
            Ok(()) => {
                let message = messages::resumed(&track);
                OperationResult::success(track).with_message(message)
            }
            Err(e) => self.inner.transport_failure(guild_id, e),
        }
    }

    /// Empties the queue. The current track keeps playing.
    pub async fn clear_queue(&self, guild_id: GuildId) -> OperationResult<usize> {
        let _guard = self.inner.locks.lock(guild_id).await;
        match self.inner.queues.drain(guild_id) {
            Some(dropped) if dropped > 0 => {
                debug!("[{}] {} queued track(s) cleared", guild_id, dropped);
                OperationResult::success(dropped).with_message(messages::QUEUE_CLEARED)
            }
            _ => OperationResult::failure(messages::QUEUE_ALREADY_EMPTY),
        }
    }

    /// Disconnects the guild if nobody but the bot is in its channel.
    /// Occupancy is checked again here, under the guild's lock.
    pub async fn reclaim_if_idle(&self, guild_id: GuildId, presence: &dyn VoicePresence) -> bool {
        let _guard = self.inner.locks.lock(guild_id).await;
        let Some(session) = self.inner.registry.get(guild_id) else {
            return false;
        };
        if presence.listener_count(guild_id, session.channel_id).await > 0 {
            return false;
        }
        self.inner.disconnect_locked(guild_id).await.is_success()
    }

    /// Runs a command from the chat front end.
    pub async fn execute(&self, intent: CommandIntent) -> OperationResult {
        if let Err(denied) = checks::check(&intent) {
            debug!(
                "[{}] {} refused for {}",
                intent.guild_id,
                intent.command.name(),
                intent.member.user_id
            );
            return denied;
        }
        let Some(voice_channel) = intent.target_channel() else {
            return OperationResult::failure(messages::NOT_IN_VOICE);
        };
        let ctx = VoiceContext::new(intent.guild_id, voice_channel, intent.text_channel);

        match &intent.command {
            Command::Join => self.connect(&ctx).await.discard(),
            Command::Leave => self.disconnect(ctx.guild_id).await,
            Command::Play(query) => self.play(&ctx, query).await.discard(),
            Command::Queue(query) => self.enqueue(&ctx, query).await.discard(),
            Command::Skip => self.skip(ctx.guild_id).await.discard(),
            Command::Stop => self.stop(ctx.guild_id).await,
            Command::Pause => self.pause(ctx.guild_id).await.discard(),
            Command::Resume => self.resume(ctx.guild_id).await.discard(),
            Command::Clear => self.clear_queue(ctx.guild_id).await.discard(),
        }
    }

    /// Disconnects every guild.
    pub async fn shutdown(&self) {
        let sessions = self.sessions();
        info!("Shutting down player, {} session(s) open", sessions.len());
        for session in sessions {
            self.disconnect(session.guild_id).await;
        }
    }

    async fn join_on_demand<T>(&self, ctx: &VoiceContext) -> Result<Arc<Session>, OperationResult<T>> {
        let result = self
            .inner
            .registry
            .get_or_create(ctx.guild_id, ctx.voice_channel, self.events())
            .await;
        match result {
            OperationResult {
                payload: Some(session),
                ..
            } => Ok(session),
            other => Err(other.forward()),
        }
    }
}

impl PlayerInner {
    async fn disconnect_locked(&self, guild_id: GuildId) -> OperationResult {
        let Some(session) = self.registry.get(guild_id) else {
            return OperationResult::failure(messages::NOT_CONNECTED);
        };
        // before any await: the caller may be cancelled mid-disconnect
        self.queues.clear(guild_id);
        let result = self.registry.remove(guild_id, &session).await;
        if result.is_success() {
            result.with_message(messages::DISCONNECTED)
        } else {
            result
        }
    }

    async fn play_locked(
        &self,
        ctx: &VoiceContext,
        session: &Session,
        query: &TrackQuery,
    ) -> OperationResult<Vec<Track>> {
        let result = self.lookup.lookup(query).await;
        if result.is_miss() {
            if let LoadResult::Error(err) = &result {
                warn!("[{}] lookup for {} failed: {}", ctx.guild_id, query, err.cause);
            }
            debug!("[{}] no tracks for {}", ctx.guild_id, query);
            return OperationResult::failure(messages::lookup_failed(query));
        }

        let tracks = result.into_tracks();
        let Some(first) = tracks.first().cloned() else {
            unreachable!("a lookup hit carries at least one track");
        };

        self.queues.clear(ctx.guild_id);
        if let Err(e) = session.connection.play(first.clone()).await {
            return self.transport_failure(ctx.guild_id, e);
        }
        self.queues.get_or_create(ctx.guild_id, ctx.status_target);

        info!("[{}] now playing {}", ctx.guild_id, first.title());
        OperationResult::success(tracks).with_message(messages::now_playing(&first))
    }

    /// The connection died under us; its Closed event does the cleanup.
    fn transport_failure<T>(&self, guild_id: GuildId, error: VoiceError) -> OperationResult<T> {
        match error {
            VoiceError::Closed => {
                debug!("[{}] connection already closed", guild_id);
                OperationResult::failure(messages::NOT_CONNECTED)
            }
            other => {
                warn!("[{}] voice transport error: {}", guild_id, other);
                OperationResult::failure(messages::PLAYBACK_FAILED)
            }
        }
    }

    fn is_current(&self, session: &Session) -> bool {
        self.registry
            .get(session.guild_id)
            .is_some_and(|current| current.id == session.id)
    }
}

#[async_trait]
impl SessionEvents for PlayerInner {
    async fn on_track_end(&self, session: &Arc<Session>, track: Track, reason: TrackEndReason) {
        let _guard = self.locks.lock(session.guild_id).await;
        if !self.is_current(session) {
            debug!("[{}] dropping event from old session {}", session.guild_id, session.id);
            return;
        }
        if let TrackEndOutcome::Failed = self.queues.handle_track_end(session, track, reason).await {
            warn!("[{}] queue stalled after a failed auto-advance", session.guild_id);
        }
    }

    async fn on_closed(&self, session: &Arc<Session>, code: u16, reason: &str, by_remote: bool) {
        let _guard = self.locks.lock(session.guild_id).await;
        if !self.is_current(session) {
            return;
        }
        info!(
            "[{}] voice connection closed (code {}, reason {:?}, remote {})",
            session.guild_id, code, reason, by_remote
        );
        self.queues.clear(session.guild_id);
        self.registry.remove(session.guild_id, session).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::types::UserId,
        protocol::command::MemberContext,
        sources::SourceManager,
        test_support::{RecordingNotifier, ScriptedSource, track},
        voice::{LoopbackNode, VoiceConnection},
    };
    use std::time::Duration;

    const GUILD: GuildId = GuildId(1);
    const TEXT: ChannelId = ChannelId(100);

    struct Harness {
        player: PlayerService,
        node: Arc<LoopbackNode>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness() -> Harness {
        let node = Arc::new(LoopbackNode::new(UserId(1)));
        let notifier = Arc::new(RecordingNotifier::default());
        let mut sources = SourceManager::new();
        sources.register(
            ScriptedSource::new(&["song-A", "song-B", "song-C"])
                .with_playlist("road trip", &["mix-1", "mix-2", "mix-3"]),
        );
        let player = PlayerService::new(node.clone(), Arc::new(sources), notifier.clone());
        Harness {
            player,
            node,
            notifier,
        }
    }

    fn ctx() -> VoiceContext {
        VoiceContext::new(GUILD, ChannelId(10), TEXT)
    }

    fn queued_titles(player: &PlayerService) -> Vec<String> {
        player
            .queue(GUILD)
            .map(|q| q.tracks.iter().map(|t| t.title().to_string()).collect())
            .unwrap_or_default()
    }

    fn playing(player: &PlayerService) -> Option<String> {
        player
            .session(GUILD)
            .and_then(|s| s.connection.current_track())
            .map(|t| t.title().to_string())
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn play_queue_skip_scenario() {
        let h = harness();

        let played = h.player.play(&ctx(), "song-A").await;
        assert!(played.is_success());
        assert_eq!(played.payload.unwrap()[0].title(), "song-A");
        assert!(h.player.is_connected(GUILD));

        let queued = h.player.enqueue(&ctx(), "song-B").await;
        assert!(queued.is_success());
        assert_eq!(queued.message(), Some("Queued `song-B`."));
        assert_eq!(queued_titles(&h.player), vec!["song-B"]);

        let skipped = h.player.skip(GUILD).await;
        assert!(skipped.is_success());
        assert_eq!(skipped.payload.map(|t| t.title().to_string()).as_deref(), Some("song-B"));
        assert_eq!(playing(&h.player).as_deref(), Some("song-B"));
        assert!(queued_titles(&h.player).is_empty());

        let again = h.player.skip(GUILD).await;
        assert!(again.is_warning());
        assert_eq!(again.message(), Some("No tracks left in the queue."));
        assert!(h.player.is_connected(GUILD));
    }

    #[tokio::test]
    async fn play_replaces_the_queue() {
        let h = harness();
        h.player.play(&ctx(), "song-A").await;
        h.player.enqueue(&ctx(), "song-B").await;

        let played = h.player.play(&ctx(), "song-C").await;
        assert_eq!(played.message(), Some("Now playing `song-C`."));
        assert_eq!(playing(&h.player).as_deref(), Some("song-C"));
        let queue = h.player.queue(GUILD).unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.status_target, StatusTarget(TEXT));
    }

    #[tokio::test]
    async fn lookup_miss_leaves_playback_and_queue_alone() {
        let h = harness();
        h.player.play(&ctx(), "song-A").await;
        h.player.enqueue(&ctx(), "song-B").await;

        let missed = h.player.play(&ctx(), "nothing here").await;
        assert!(missed.is_failure());
        assert_eq!(
            missed.message(),
            Some("Failed to find tracks for query `nothing here`.")
        );
        assert_eq!(playing(&h.player).as_deref(), Some("song-A"));
        assert_eq!(queued_titles(&h.player), vec!["song-B"]);

        assert!(h.player.enqueue(&ctx(), "nothing here").await.is_failure());
        assert_eq!(queued_titles(&h.player), vec!["song-B"]);
    }

    #[tokio::test]
    async fn queue_on_an_idle_guild_plays_right_away() {
        let h = harness();
        let result = h.player.enqueue(&ctx(), "song-A").await;
        assert_eq!(result.message(), Some("Now playing `song-A`."));
        assert_eq!(playing(&h.player).as_deref(), Some("song-A"));
        assert!(queued_titles(&h.player).is_empty());
    }

    #[tokio::test]
    async fn queue_takes_whole_playlists() {
        let h = harness();
        h.player.play(&ctx(), "song-A").await;

        let result = h.player.enqueue(&ctx(), "road trip").await;
        assert_eq!(result.message(), Some("Queued 3 tracks from `road trip`."));
        assert_eq!(queued_titles(&h.player), vec!["mix-1", "mix-2", "mix-3"]);
    }

    #[tokio::test]
    async fn commands_without_a_session_fail() {
        let h = harness();
        for result in [
            h.player.skip(GUILD).await.discard(),
            h.player.stop(GUILD).await,
            h.player.pause(GUILD).await.discard(),
            h.player.resume(GUILD).await.discard(),
            h.player.disconnect(GUILD).await,
        ] {
            assert!(result.is_failure());
            assert_eq!(result.message(), Some(messages::NOT_CONNECTED));
        }
        assert!(!h.player.is_connected(GUILD));
        assert_eq!(h.node.connect_count(), 0);
    }

    #[tokio::test]
    async fn stop_pause_and_resume() {
        let h = harness();
        h.player.connect(&ctx()).await;
        assert_eq!(h.player.stop(GUILD).await.message(), Some(messages::NOTHING_TO_STOP));
        assert_eq!(h.player.pause(GUILD).await.message(), Some(messages::NOTHING_TO_PAUSE));

        h.player.play(&ctx(), "song-A").await;
        assert_eq!(
            h.player.resume(GUILD).await.message(),
            Some(messages::NOTHING_TO_RESUME)
        );
        assert_eq!(h.player.pause(GUILD).await.message(), Some("Paused `song-A`."));
        assert_eq!(h.player.resume(GUILD).await.message(), Some("Resumed `song-A`."));

        let stopped = h.player.stop(GUILD).await;
        assert_eq!(stopped.message(), Some(messages::PLAYER_STOPPED));
        assert!(playing(&h.player).is_none());
        assert!(h.player.is_connected(GUILD));
    }

    #[tokio::test]
    async fn clear_queue_keeps_the_session() {
        let h = harness();
        assert_eq!(
            h.player.clear_queue(GUILD).await.message(),
            Some(messages::QUEUE_ALREADY_EMPTY)
        );

        h.player.play(&ctx(), "song-A").await;
        assert!(h.player.clear_queue(GUILD).await.is_failure());

        h.player.enqueue(&ctx(), "song-B").await;
        h.player.enqueue(&ctx(), "song-C").await;
        let cleared = h.player.clear_queue(GUILD).await;
        assert!(cleared.is_success());
        assert_eq!(cleared.payload, Some(2));
        assert_eq!(h.player.queue(GUILD).map(|q| q.len()), Some(0));
        assert_eq!(playing(&h.player).as_deref(), Some("song-A"));
        assert!(h.player.is_connected(GUILD));
    }

    #[tokio::test]
    async fn connect_twice_is_refused() {
        let h = harness();
        assert_eq!(h.player.connect(&ctx()).await.message(), Some(messages::CONNECTED));
        let again = h.player.connect(&ctx()).await;
        assert_eq!(again.message(), Some(messages::ALREADY_CONNECTED));
        assert_eq!(h.node.connect_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_connects_open_one_connection() {
        let h = harness();
        let attempts: Vec<_> = (0..16)
            .map(|_| {
                let player = h.player.clone();
                tokio::spawn(async move { player.connect(&ctx()).await.is_success() })
            })
            .collect();

        let mut created = 0;
        for attempt in attempts {
            if attempt.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(h.node.connect_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_plays_share_one_session() {
        let h = harness();
        let plays: Vec<_> = ["song-A", "song-B", "song-C", "song-A"]
            .into_iter()
            .map(|query| {
                let player = h.player.clone();
                tokio::spawn(async move { player.play(&ctx(), query).await.is_success() })
            })
            .collect();

        for play in plays {
            assert!(play.await.unwrap());
        }
        assert_eq!(h.node.connect_count(), 1);
        assert_eq!(h.player.sessions().len(), 1);
        assert_eq!(h.player.queue(GUILD).map(|q| q.len()), Some(0));
        assert!(playing(&h.player).is_some());
    }

    #[tokio::test]
    async fn disconnect_drops_queue_and_allows_reconnect() {
        let h = harness();
        h.player.play(&ctx(), "song-A").await;
        h.player.enqueue(&ctx(), "song-B").await;

        let left = h.player.disconnect(GUILD).await;
        assert_eq!(left.message(), Some(messages::DISCONNECTED));
        assert!(!h.player.is_connected(GUILD));
        assert!(h.player.queue(GUILD).is_none());
        assert!(h.player.disconnect(GUILD).await.is_failure());

        settle().await;
        assert!(h.player.connect(&ctx()).await.is_success());
        assert_eq!(h.node.connect_count(), 2);
    }

    #[tokio::test]
    async fn finished_track_advances_and_announces() {
        let h = harness();
        h.player.play(&ctx(), "song-A").await;
        h.player.enqueue(&ctx(), "song-B").await;

        h.node.connection(GUILD).unwrap().finish_current();
        settle().await;

        assert_eq!(playing(&h.player).as_deref(), Some("song-B"));
        assert!(queued_titles(&h.player).is_empty());
        assert_eq!(
            h.notifier.messages(),
            vec![(GUILD, StatusTarget(TEXT), "Now playing `song-B`.".to_string())]
        );

        h.node.connection(GUILD).unwrap().finish_current();
        settle().await;
        assert!(playing(&h.player).is_none());
        assert_eq!(h.notifier.messages().len(), 1);
        assert!(h.player.is_connected(GUILD));
    }

    #[tokio::test]
    async fn skip_never_double_advances() {
        let h = harness();
        h.player.play(&ctx(), "song-A").await;
        h.player.enqueue(&ctx(), "song-B").await;
        h.player.enqueue(&ctx(), "song-C").await;

        h.player.skip(GUILD).await;
        settle().await;

        assert_eq!(playing(&h.player).as_deref(), Some("song-B"));
        assert_eq!(queued_titles(&h.player), vec!["song-C"]);
        assert!(h.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn remote_close_cleans_up() {
        let h = harness();
        h.player.play(&ctx(), "song-A").await;
        h.player.enqueue(&ctx(), "song-B").await;

        h.node.connection(GUILD).unwrap().close_remote(4014, "kicked");
        settle().await;

        assert!(!h.player.is_connected(GUILD));
        assert!(h.player.queue(GUILD).is_none());
        assert!(h.player.sessions().is_empty());
    }

    #[tokio::test]
    async fn guilds_are_independent() {
        let h = harness();
        let other = VoiceContext::new(GuildId(2), ChannelId(20), ChannelId(200));
        h.player.play(&ctx(), "song-A").await;
        h.player.play(&other, "song-B").await;
        h.player.enqueue(&other, "song-C").await;

        h.player.disconnect(GUILD).await;
        assert!(h.player.is_connected(GuildId(2)));
        assert_eq!(h.player.queue(GuildId(2)).map(|q| q.len()), Some(1));
    }

    #[tokio::test]
    async fn reclaim_rechecks_listeners() {
        let h = harness();
        h.player.connect(&ctx()).await;
        h.node.join(GUILD, ChannelId(10), UserId(42));
        assert!(!h.player.reclaim_if_idle(GUILD, h.node.as_ref()).await);

        h.node.leave(GUILD, ChannelId(10), UserId(42));
        assert!(h.player.reclaim_if_idle(GUILD, h.node.as_ref()).await);
        assert!(!h.player.reclaim_if_idle(GUILD, h.node.as_ref()).await);
    }

    fn intent(command: Command, operator: bool) -> CommandIntent {
        CommandIntent {
            guild_id: GUILD,
            text_channel: TEXT,
            voice_channel: None,
            member: MemberContext {
                user_id: UserId(42),
                voice_channel: Some(ChannelId(10)),
                is_operator: operator,
            },
            command,
        }
    }

    #[tokio::test]
    async fn execute_checks_preconditions_then_dispatches() {
        let h = harness();

        let mut outside = intent(Command::Join, false);
        outside.member.voice_channel = None;
        assert_eq!(h.player.execute(outside).await.message(), Some(messages::NOT_IN_VOICE));

        let played = h.player.execute(intent(Command::Play("song-A".into()), false)).await;
        assert_eq!(played.message(), Some("Now playing `song-A`."));
        assert_eq!(
            h.player.session(GUILD).map(|s| s.channel_id),
            Some(ChannelId(10))
        );

        let refused = h.player.execute(intent(Command::Leave, false)).await;
        assert_eq!(refused.message(), Some(messages::NOT_OPERATOR));
        assert!(h.player.is_connected(GUILD));

        let left = h.player.execute(intent(Command::Leave, true)).await;
        assert!(left.is_success());
        assert!(!h.player.is_connected(GUILD));
    }

    #[tokio::test]
    async fn shutdown_disconnects_everything() {
        let h = harness();
        h.player.connect(&ctx()).await;
        h.player
            .connect(&VoiceContext::new(GuildId(2), ChannelId(20), TEXT))
            .await;

        h.player.shutdown().await;
        assert!(h.player.sessions().is_empty());
        let conn = h.node.connection(GUILD).unwrap();
        assert!(!conn.is_connected());
        conn.play(track("late")).await.unwrap_err();
    }
}
