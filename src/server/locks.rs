use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::common::types::GuildId;

/// One async mutex per guild. Guilds never contend with each other.
#[derive(Default)]
pub struct GuildLocks {
    locks: DashMap<GuildId, Arc<Mutex<()>>>,
}

impl GuildLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, guild_id: GuildId) -> OwnedMutexGuard<()> {
        // the map shard must not stay locked across the await
        let lock = self.locks.entry(guild_id).or_default().value().clone();
        lock.lock_owned().await
    }
}
