use crate::common::types::{ChannelId, GuildId, UserId};

/// The member who issued a command, as resolved by the chat front end.
#[derive(Debug, Clone)]
pub struct MemberContext {
    pub user_id: UserId,
    /// Voice channel the member is currently in, if any.
    pub voice_channel: Option<ChannelId>,
    /// Holds voice operator privileges (administrator in the guild).
    pub is_operator: bool,
}

/// A command already parsed and attributed by the chat front end.
#[derive(Debug, Clone)]
pub struct CommandIntent {
    pub guild_id: GuildId,
    /// Text channel the command came from. Auto-advanced tracks are announced here.
    pub text_channel: ChannelId,
    /// Explicit target voice channel. Falls back to the member's channel.
    pub voice_channel: Option<ChannelId>,
    pub member: MemberContext,
    pub command: Command,
}

impl CommandIntent {
    /// The voice channel this command acts on.
    pub fn target_channel(&self) -> Option<ChannelId> {
        self.voice_channel.or(self.member.voice_channel)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join,
    Leave,
    Play(String),
    Queue(String),
    Skip,
    Stop,
    Pause,
    Resume,
    Clear,
}

impl Command {
    /// Parses a command name (or alias) plus its remaining text.
    /// Returns `None` for unknown names and for play/queue without an argument.
    pub fn parse(name: &str, rest: &str) -> Option<Self> {
        let rest = rest.trim();
        let command = match name.to_ascii_lowercase().as_str() {
            "join" | "connect" => Self::Join,
            "leave" | "disconnect" => Self::Leave,
            "play" | "p" if !rest.is_empty() => Self::Play(rest.to_string()),
            "queue" | "enqueue" | "q" if !rest.is_empty() => Self::Queue(rest.to_string()),
            "skip" | "next" => Self::Skip,
            "stop" => Self::Stop,
            "pause" => Self::Pause,
            "resume" | "unpause" => Self::Resume,
            "clear" => Self::Clear,
            _ => return None,
        };
        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Play(_) => "play",
            Self::Queue(_) => "queue",
            Self::Skip => "skip",
            Self::Stop => "stop",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Clear => "clear",
        }
    }

    /// Commands that affect everyone listening need voice operator rights.
    pub fn requires_operator(&self) -> bool {
        matches!(self, Self::Leave | Self::Stop | Self::Clear)
    }
}
