//! Replays recorded gateway events against an in-memory guild.

use std::sync::Arc;

use anyhow::{Context, bail};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::dispatcher::{Dispatcher, PlatformEvent};
use crate::engine::models::{
    BotIdentity, ChannelHandle, ChannelKind, LogEntry, LoggerSettings, Snowflake, WebhookHandle,
};
use crate::engine::permissions::{PermissionOverwrite, Permissions};
use crate::engine::state::LoggerPhase;
use crate::platform::memory::MemoryPlatform;

/// Bound on events queued ahead of the dispatcher.
const EVENT_QUEUE: usize = 256;

/// A guild snapshot to seed the in-memory platform with.
#[derive(Debug, Deserialize)]
pub struct GuildFixture {
    pub guild_id: Snowflake,
    pub bot: BotIdentity,
    /// Permission names, e.g. `"MANAGE_WEBHOOKS"`.
    #[serde(default)]
    pub bot_permissions: Vec<String>,
    #[serde(default)]
    pub bot_roles: Vec<Snowflake>,
    #[serde(default)]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub channels: Vec<FixtureChannel>,
    #[serde(default)]
    pub webhooks: Vec<WebhookHandle>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureChannel {
    pub id: Snowflake,
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: ChannelKind,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub overwrites: Vec<PermissionOverwrite>,
}

fn default_kind() -> ChannelKind {
    ChannelKind::Text
}

/// Result of a replay run.
#[derive(Debug)]
pub struct ReplayReport {
    pub phase: LoggerPhase,
    pub deliveries: Vec<(WebhookHandle, LogEntry)>,
}

impl GuildFixture {
    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        serde_json::from_str(contents).context("invalid guild fixture")
    }

    pub fn permissions(&self) -> anyhow::Result<Permissions> {
        let mut perms = Permissions::empty();
        for name in &self.bot_permissions {
            match Permissions::from_name(name) {
                Some(p) => perms |= p,
                None => bail!("unknown permission {name:?} in fixture"),
            }
        }
        Ok(perms)
    }

    pub fn build_platform(&self) -> anyhow::Result<MemoryPlatform> {
        let mut platform = MemoryPlatform::new(self.bot.clone());
        if let Some(path) = &self.avatar_path {
            let avatar =
                std::fs::read(path).with_context(|| format!("failed to read avatar {path}"))?;
            platform = platform.with_avatar(avatar);
        }

        platform.add_guild(self.guild_id, self.permissions()?);
        platform.set_bot_roles(self.guild_id, self.bot_roles.clone());
        for ch in &self.channels {
            platform.add_channel(ChannelHandle {
                id: ch.id,
                guild_id: self.guild_id,
                name: ch.name.clone(),
                kind: ch.kind,
                topic: ch.topic.clone(),
                overwrites: ch.overwrites.clone(),
            });
        }
        for webhook in &self.webhooks {
            platform.add_webhook(webhook.clone());
        }
        Ok(platform)
    }
}

/// Parse a JSON-lines event log. Blank lines and `#` comments are skipped.
pub fn parse_events(contents: &str) -> anyhow::Result<Vec<PlatformEvent>> {
    let mut events = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(line)
            .with_context(|| format!("invalid event on line {}", i + 1))?;
        events.push(event);
    }
    Ok(events)
}

/// Run one logger instance over `events` and collect what it delivered.
pub async fn replay(
    platform: Arc<MemoryPlatform>,
    settings: LoggerSettings,
    events: Vec<PlatformEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<ReplayReport> {
    let (tx, rx) = mpsc::channel(EVENT_QUEUE);
    let dispatcher = Dispatcher::new(platform.clone(), settings);
    let task = tokio::spawn(dispatcher.run(rx, cancel));

    platform.set_ready();

    let total = events.len();
    // Topic edits reach the platform's channel record when the dispatcher
    // handles them, not as they are queued.
    for event in events {
        if tx.send(event).await.is_err() {
            // Dispatcher stopped: disabled at bootstrap or cancelled.
            break;
        }
    }
    drop(tx);

    let phase = task.await.context("dispatcher task failed")?;
    let deliveries = platform.deliveries();
    info!(events = total, delivered = deliveries.len(), phase = phase.as_str(), "replay finished");

    Ok(ReplayReport { phase, deliveries })
}
