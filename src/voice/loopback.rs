//! In-process voice node that "plays" tracks by waiting out their length.
//!
//! Used by the demo binary and the tests in place of a real audio transport.
//! It keeps its own picture of who sits in which channel, so it also answers
//! presence queries for the idle culler.

use std::{
    collections::HashSet,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, trace};

use crate::{
    common::{
        errors::VoiceError,
        types::{ChannelId, GuildId, UserId},
    },
    protocol::{
        events::{TrackEndReason, VoiceEvent},
        tracks::Track,
    },
    voice::connection::{VoiceConnection, VoiceNode, VoicePresence},
};

type Occupants = Arc<DashMap<(GuildId, ChannelId), HashSet<UserId>>>;

pub struct LoopbackNode {
    bot_user: UserId,
    occupants: Occupants,
    connections: DashMap<GuildId, Arc<LoopbackConnection>>,
    connects: AtomicUsize,
    unreachable: AtomicBool,
}

impl LoopbackNode {
    pub fn new(bot_user: UserId) -> Self {
        Self {
            bot_user,
            occupants: Arc::new(DashMap::new()),
            connections: DashMap::new(),
            connects: AtomicUsize::new(0),
            unreachable: AtomicBool::new(false),
        }
    }

    /// A user enters a voice channel.
    pub fn join(&self, guild_id: GuildId, channel_id: ChannelId, user: UserId) {
        self.occupants
            .entry((guild_id, channel_id))
            .or_default()
            .insert(user);
    }

    /// A user leaves a voice channel.
    pub fn leave(&self, guild_id: GuildId, channel_id: ChannelId, user: UserId) {
        if let Some(mut users) = self.occupants.get_mut(&(guild_id, channel_id)) {
            users.remove(&user);
        }
    }

    /// Most recent connection opened for `guild_id`, live or not.
    pub fn connection(&self, guild_id: GuildId) -> Option<Arc<LoopbackConnection>> {
        self.connections.get(&guild_id).map(|c| c.value().clone())
    }

    /// Number of successful connects since creation.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Makes subsequent connects fail, as if the voice server were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl VoiceNode for LoopbackNode {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, VoiceError> {
        // a real handshake suspends here
        tokio::task::yield_now().await;

        if self.unreachable.load(Ordering::SeqCst) {
            return Err(VoiceError::Connect(format!(
                "voice server for guild {} is unreachable",
                guild_id
            )));
        }

        let conn = LoopbackConnection::new(guild_id, channel_id, self.bot_user, self.occupants.clone());
        self.join(guild_id, channel_id, self.bot_user);
        self.connections.insert(guild_id, conn.clone());
        self.connects.fetch_add(1, Ordering::SeqCst);
        debug!("[{}] loopback connected to channel {}", guild_id, channel_id);
        Ok(conn)
    }
}

#[async_trait]
impl VoicePresence for LoopbackNode {
    fn current_user(&self) -> UserId {
        self.bot_user
    }

    async fn occupants(&self, guild_id: GuildId, channel_id: ChannelId) -> Vec<UserId> {
        self.occupants
            .get(&(guild_id, channel_id))
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default()
    }
}

pub struct LoopbackConnection {
    guild_id: GuildId,
    channel_id: ChannelId,
    bot_user: UserId,
    occupants: Occupants,
    me: Weak<LoopbackConnection>,
    state: Mutex<LoopbackState>,
}

#[derive(Default)]
struct LoopbackState {
    connected: bool,
    current: Option<Track>,
    paused: bool,
    /// Bumped on every play so a stale end timer can tell it lost.
    generation: u64,
    started_at: Option<Instant>,
    remaining: Duration,
    end_timer: Option<JoinHandle<()>>,
    subscriber: Option<flume::Sender<VoiceEvent>>,
}

impl LoopbackState {
    fn emit(&self, event: VoiceEvent) {
        if let Some(tx) = &self.subscriber {
            let _ = tx.send(event);
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.end_timer.take() {
            timer.abort();
        }
    }
}

impl LoopbackConnection {
    fn new(
        guild_id: GuildId,
        channel_id: ChannelId,
        bot_user: UserId,
        occupants: Occupants,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            guild_id,
            channel_id,
            bot_user,
            occupants,
            me: me.clone(),
            state: Mutex::new(LoopbackState {
                connected: true,
                ..Default::default()
            }),
        })
    }

    /// Ends the current track naturally, as if it played to the end.
    pub fn finish_current(&self) {
        let mut state = self.state.lock();
        let generation = state.generation;
        self.finish(&mut state, generation);
    }

    /// Drops the connection from the remote side.
    pub fn close_remote(&self, code: u16, reason: &str) {
        let mut state = self.state.lock();
        if !state.connected {
            return;
        }
        self.teardown(&mut state);
        state.emit(VoiceEvent::Closed {
            code,
            reason: reason.to_string(),
            by_remote: true,
        });
    }

    pub fn has_subscriber(&self) -> bool {
        self.state.lock().subscriber.is_some()
    }

    fn finish(&self, state: &mut LoopbackState, generation: u64) {
        if state.generation != generation || state.paused {
            return;
        }
        state.end_timer = None;
        state.started_at = None;
        if let Some(track) = state.current.take() {
            trace!("[{}] loopback finished {}", self.guild_id, track.title());
            state.emit(VoiceEvent::TrackEnd {
                track,
                reason: TrackEndReason::Finished,
            });
        }
    }

    fn teardown(&self, state: &mut LoopbackState) {
        state.connected = false;
        state.cancel_timer();
        state.current = None;
        state.paused = false;
        if let Some(mut users) = self.occupants.get_mut(&(self.guild_id, self.channel_id)) {
            users.remove(&self.bot_user);
        }
    }

    fn arm_timer(&self, state: &mut LoopbackState) {
        state.cancel_timer();
        let Some(track) = &state.current else {
            return;
        };
        if track.info.is_stream || track.info.length == 0 {
            return;
        }

        let generation = state.generation;
        let remaining = state.remaining;
        let me = self.me.clone();
        state.started_at = Some(Instant::now());
        state.end_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            if let Some(conn) = me.upgrade() {
                let mut state = conn.state.lock();
                conn.finish(&mut state, generation);
            }
        }));
    }

    fn ensure_connected(state: &LoopbackState) -> Result<(), VoiceError> {
        if state.connected {
            Ok(())
        } else {
            Err(VoiceError::Closed)
        }
    }
}

#[async_trait]
impl VoiceConnection for LoopbackConnection {
    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        let mut state = self.state.lock();
        Self::ensure_connected(&state)?;
        self.teardown(&mut state);
        state.emit(VoiceEvent::Closed {
            code: 1000,
            reason: "disconnected".to_string(),
            by_remote: false,
        });
        Ok(())
    }

    async fn play(&self, track: Track) -> Result<(), VoiceError> {
        let mut state = self.state.lock();
        Self::ensure_connected(&state)?;

        if let Some(previous) = state.current.take() {
            state.emit(VoiceEvent::TrackEnd {
                track: previous,
                reason: TrackEndReason::Replaced,
            });
        }

        state.generation += 1;
        state.paused = false;
        state.remaining = Duration::from_millis(track.info.length);
        state.current = Some(track.clone());
        self.arm_timer(&mut state);
        state.emit(VoiceEvent::TrackStart { track });
        Ok(())
    }

    async fn stop(&self) -> Result<(), VoiceError> {
        let mut state = self.state.lock();
        Self::ensure_connected(&state)?;
        state.cancel_timer();
        state.paused = false;
        state.started_at = None;
        if let Some(track) = state.current.take() {
            state.emit(VoiceEvent::TrackEnd {
                track,
                reason: TrackEndReason::Stopped,
            });
        }
        Ok(())
    }

    async fn pause(&self) -> Result<(), VoiceError> {
        let mut state = self.state.lock();
        Self::ensure_connected(&state)?;
        if state.paused || state.current.is_none() {
            return Ok(());
        }
        state.cancel_timer();
        if let Some(started) = state.started_at.take() {
            state.remaining = state.remaining.saturating_sub(started.elapsed());
        }
        state.paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), VoiceError> {
        let mut state = self.state.lock();
        Self::ensure_connected(&state)?;
        if !state.paused {
            return Ok(());
        }
        state.paused = false;
        self.arm_timer(&mut state);
        Ok(())
    }

    fn current_track(&self) -> Option<Track> {
        self.state.lock().current.clone()
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn subscribe(&self) -> flume::Receiver<VoiceEvent> {
        let (tx, rx) = flume::unbounded();
        self.state.lock().subscriber = Some(tx);
        rx
    }

    fn unsubscribe(&self) {
        self.state.lock().subscriber = None;
    }
}
