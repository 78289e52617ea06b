use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{configs::Config, player::PlayerService, voice::VoicePresence};

struct RunningLoop {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Periodically disconnects guilds whose voice channel has nobody but the bot.
pub struct IdleCuller {
    player: PlayerService,
    presence: Arc<dyn VoicePresence>,
    interval: Duration,
    shutdown_timeout: Duration,
    running: Mutex<Option<RunningLoop>>,
}

impl IdleCuller {
    pub fn new(player: PlayerService, presence: Arc<dyn VoicePresence>, config: &Config) -> Self {
        Self::with_interval(
            player,
            presence,
            config.culling_interval(),
            config.culling_shutdown_timeout(),
        )
    }

    pub fn with_interval(
        player: PlayerService,
        presence: Arc<dyn VoicePresence>,
        interval: Duration,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            player,
            presence,
            interval,
            shutdown_timeout,
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Starts the recurring cycle. The first cycle runs one interval from now.
    /// Returns false if already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.is_some() {
            return false;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            self.player.clone(),
            self.presence.clone(),
            self.interval,
            cancel.clone(),
        ));
        *running = Some(RunningLoop { cancel, task });
        info!("Idle culling started, every {:?}", self.interval);
        true
    }

    /// Cancels the timer and waits for an in-flight cycle, at most
    /// `shutdown_timeout`. Returns false if it was not running.
    pub async fn stop(&self) -> bool {
        let Some(RunningLoop { cancel, mut task }) = self.running.lock().take() else {
            return false;
        };

        cancel.cancel();
        match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => info!("Idle culling stopped"),
            Ok(Err(e)) => warn!("Idle culling task ended abnormally: {}", e),
            Err(_) => {
                task.abort();
                warn!(
                    "Idle culling did not finish within {:?}, forced stop",
                    self.shutdown_timeout
                );
            }
        }
        true
    }

    /// Runs one cycle right away.
    pub async fn cull_idle_sessions(&self) -> usize {
        cull_cycle(&self.player, self.presence.as_ref()).await
    }
}

async fn run_loop(
    player: PlayerService,
    presence: Arc<dyn VoicePresence>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        cull_cycle(&player, presence.as_ref()).await;
    }
}

/// Checks every connected guild concurrently and disconnects the idle ones.
/// Returns how many were disconnected.
pub async fn cull_cycle(player: &PlayerService, presence: &dyn VoicePresence) -> usize {
    let sessions = player.sessions();
    if sessions.is_empty() {
        return 0;
    }

    let checks = sessions.iter().map(|session| async move {
        if presence.listener_count(session.guild_id, session.channel_id).await > 0 {
            return false;
        }
        let reclaimed = player.reclaim_if_idle(session.guild_id, presence).await;
        if reclaimed {
            info!("[{}] left idle channel {}", session.guild_id, session.channel_id);
        }
        reclaimed
    });

    let culled = join_all(checks).await.into_iter().filter(|c| *c).count();
    debug!("Idle culling checked {} session(s), culled {}", sessions.len(), culled);
    culled
}
