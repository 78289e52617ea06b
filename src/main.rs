use std::sync::Arc;

use async_trait::async_trait;
use dreamjockey::{
    common::{
        logger,
        types::{ChannelId, GuildId, UserId},
    },
    configs::Config,
    monitoring::IdleCuller,
    player::{PlayerService, StatusNotifier, StatusTarget},
    protocol::command::{Command, CommandIntent, MemberContext},
    sources::SourceManager,
    voice::LoopbackNode,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

const BOT_USER: UserId = UserId(1);
/// Every demo member sits in this voice channel of their guild.
const VOICE_CHANNEL: ChannelId = ChannelId(2);
const TEXT_CHANNEL: ChannelId = ChannelId(3);

struct LogNotifier;

#[async_trait]
impl StatusNotifier for LogNotifier {
    async fn announce(&self, guild_id: GuildId, target: StatusTarget, message: &str) {
        println!("[{} #{}] {}", guild_id, target.0, message);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config ({}), using defaults", e);
            Config::default()
        }
    };
    logger::init(&config);

    let node = Arc::new(LoopbackNode::new(BOT_USER));
    let player = PlayerService::new(
        node.clone(),
        Arc::new(SourceManager::with_defaults()),
        Arc::new(LogNotifier),
    );
    let culler = IdleCuller::new(player.clone(), node.clone(), &config);
    culler.start();

    info!("Reading `<guild> <user> <command> [args]` lines from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received ctrl-c");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            },
        };

        let Some((guild_id, user_id, name, rest)) = split_line(&line) else {
            if !line.trim().is_empty() {
                warn!("Malformed line: {}", line);
            }
            continue;
        };

        // `away` takes the member out of the channel so the culler can reclaim it
        if name == "away" {
            node.leave(guild_id, VOICE_CHANNEL, user_id);
            continue;
        }
        let Some(command) = Command::parse(name, rest) else {
            println!("Unknown command: {}", name);
            continue;
        };

        node.join(guild_id, VOICE_CHANNEL, user_id);
        let intent = CommandIntent {
            guild_id,
            text_channel: TEXT_CHANNEL,
            voice_channel: None,
            member: MemberContext {
                user_id,
                voice_channel: Some(VOICE_CHANNEL),
                is_operator: true,
            },
            command,
        };

        let result = player.execute(intent).await;
        println!(
            "[{}] {:?}: {}",
            guild_id,
            result.status,
            result.message().unwrap_or("done")
        );
    }

    culler.stop().await;
    player.shutdown().await;
    Ok(())
}

fn split_line(line: &str) -> Option<(GuildId, UserId, &str, &str)> {
    let mut parts = line.trim().splitn(4, ' ');
    let guild_id = parts.next()?.parse().ok()?;
    let user_id = parts.next()?.parse().ok()?;
    let name = parts.next()?;
    Some((guild_id, user_id, name, parts.next().unwrap_or("")))
}
