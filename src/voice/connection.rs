use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    common::{
        errors::VoiceError,
        types::{ChannelId, GuildId, UserId},
    },
    protocol::{events::VoiceEvent, tracks::Track},
};

/// One live audio connection for one guild.
///
/// Implemented by the transport that actually streams audio. Playback calls
/// only fail with `VoiceError::Closed` once the connection is gone.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Leaves the channel. Disconnecting twice reports `VoiceError::Closed`.
    async fn disconnect(&self) -> Result<(), VoiceError>;

    /// Starts `track`, replacing whatever is playing.
    async fn play(&self, track: Track) -> Result<(), VoiceError>;

    async fn stop(&self) -> Result<(), VoiceError>;

    async fn pause(&self) -> Result<(), VoiceError>;

    async fn resume(&self) -> Result<(), VoiceError>;

    fn current_track(&self) -> Option<Track>;

    fn is_paused(&self) -> bool;

    /// Registers the single event subscriber, replacing any previous one.
    fn subscribe(&self) -> flume::Receiver<VoiceEvent>;

    /// Drops the subscriber. Its receiver disconnects.
    fn unsubscribe(&self);
}

/// Opens voice connections.
#[async_trait]
pub trait VoiceNode: Send + Sync {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, VoiceError>;
}

/// Who is sitting in which voice channel.
#[async_trait]
pub trait VoicePresence: Send + Sync {
    /// The bot's own user.
    fn current_user(&self) -> UserId;

    /// Users currently in `channel_id`, the bot included if it is there.
    async fn occupants(&self, guild_id: GuildId, channel_id: ChannelId) -> Vec<UserId>;

    /// Occupants that are not the bot.
    async fn listener_count(&self, guild_id: GuildId, channel_id: ChannelId) -> usize {
        let me = self.current_user();
        self.occupants(guild_id, channel_id)
            .await
            .into_iter()
            .filter(|user| *user != me)
            .count()
    }
}

pub type BoxedConnection = Arc<dyn VoiceConnection>;
