//! In-memory platform: a single bot account with a set of guilds, channels
//! and webhooks held in `DashMap`s. Backs the replay binary and the tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::watch;

use super::{CreateChannelParams, CreateWebhookParams, Platform};
use crate::engine::error::PlatformError;
use crate::engine::models::{
    BotIdentity, ChannelHandle, ChannelKind, LogEntry, Snowflake, TopicChange, WebhookHandle,
};
use crate::engine::permissions::{Permissions, compute_channel_permissions};

/// First ID handed out for channels and webhooks created at runtime.
const FIRST_GENERATED_ID: u64 = 900_000_000_000_000_000;

/// A mutating call observed by the platform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    CreateChannel { name: String, reason: String },
    CreateWebhook { channel_id: Snowflake, name: String, has_avatar: bool },
    RenameWebhook { webhook_id: Snowflake, name: String, reason: String },
    ExecuteWebhook { webhook_id: Snowflake },
}

struct GuildRecord {
    bot_permissions: Permissions,
    bot_role_ids: Vec<Snowflake>,
    owner_id: Snowflake,
}

pub struct MemoryPlatform {
    bot: BotIdentity,
    avatar: Option<Vec<u8>>,
    guilds: DashMap<Snowflake, GuildRecord>,
    channels: DashMap<Snowflake, ChannelHandle>,
    webhooks: DashMap<Snowflake, WebhookHandle>,
    next_id: AtomicU64,
    ready: watch::Sender<bool>,
    fail_webhook_ops: AtomicBool,
    fail_delivery: AtomicBool,
    calls: Mutex<Vec<PlatformCall>>,
    deliveries: Mutex<Vec<(WebhookHandle, LogEntry)>>,
}

impl MemoryPlatform {
    pub fn new(bot: BotIdentity) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            bot,
            avatar: None,
            guilds: DashMap::new(),
            channels: DashMap::new(),
            webhooks: DashMap::new(),
            next_id: AtomicU64::new(FIRST_GENERATED_ID),
            ready,
            fail_webhook_ops: AtomicBool::new(false),
            fail_delivery: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    // ── Seeding ─────────────────────────────────────────────────────

    pub fn with_avatar(mut self, avatar: Vec<u8>) -> Self {
        self.avatar = Some(avatar);
        self
    }

    /// Register a guild and the bot's guild-level permissions in it.
    pub fn add_guild(&self, guild_id: Snowflake, bot_permissions: Permissions) {
        self.guilds.insert(
            guild_id,
            GuildRecord {
                bot_permissions,
                bot_role_ids: Vec::new(),
                owner_id: Snowflake(0),
            },
        );
    }

    pub fn set_bot_roles(&self, guild_id: Snowflake, role_ids: Vec<Snowflake>) {
        if let Some(mut guild) = self.guilds.get_mut(&guild_id) {
            guild.bot_role_ids = role_ids;
        }
    }

    pub fn set_owner(&self, guild_id: Snowflake, owner_id: Snowflake) {
        if let Some(mut guild) = self.guilds.get_mut(&guild_id) {
            guild.owner_id = owner_id;
        }
    }

    pub fn add_channel(&self, channel: ChannelHandle) {
        self.channels.insert(channel.id, channel);
    }

    pub fn add_webhook(&self, webhook: WebhookHandle) {
        self.webhooks.insert(webhook.id, webhook);
    }

    /// Mark the connection ready, releasing any pending bootstrap.
    pub fn set_ready(&self) {
        self.ready.send_replace(true);
    }

    /// Rewrite a channel topic and return the notification the gateway
    /// would deliver for it.
    pub fn set_topic(&self, channel_id: Snowflake, topic: Option<&str>) -> Option<TopicChange> {
        let mut channel = self.channels.get_mut(&channel_id)?;
        let before = channel.topic.take();
        channel.topic = topic.map(Into::into);
        Some(TopicChange {
            guild_id: channel.guild_id,
            channel_id,
            before,
            after: channel.topic.clone(),
        })
    }

    pub fn fail_webhook_ops(&self, fail: bool) {
        self.fail_webhook_ops.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delivery(&self, fail: bool) {
        self.fail_delivery.store(fail, Ordering::SeqCst);
    }

    // ── Inspection ──────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn deliveries(&self) -> Vec<(WebhookHandle, LogEntry)> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn channel(&self, channel_id: Snowflake) -> Option<ChannelHandle> {
        self.channels.get(&channel_id).map(|c| c.clone())
    }

    pub fn webhooks_in(&self, channel_id: Snowflake) -> Vec<WebhookHandle> {
        let mut hooks: Vec<WebhookHandle> = self
            .webhooks
            .iter()
            .filter(|w| w.channel_id == channel_id)
            .map(|w| w.clone())
            .collect();
        hooks.sort_by_key(|w| w.id);
        hooks
    }

    // ── Internals ───────────────────────────────────────────────────

    fn record(&self, call: PlatformCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn next_id(&self) -> Snowflake {
        Snowflake(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn check_webhook_ops(&self) -> Result<(), PlatformError> {
        if self.fail_webhook_ops.load(Ordering::SeqCst) {
            return Err(PlatformError::Transport("webhook endpoint unavailable".into()));
        }
        Ok(())
    }

    fn guild_permissions_sync(&self, guild_id: Snowflake) -> Result<Permissions, PlatformError> {
        let guild = self.guilds.get(&guild_id).ok_or(PlatformError::NotFound {
            kind: "guild",
            id: guild_id,
        })?;
        if guild.owner_id == self.bot.user_id
            || guild.bot_permissions.contains(Permissions::ADMINISTRATOR)
        {
            return Ok(Permissions::all());
        }
        Ok(guild.bot_permissions)
    }
}

#[async_trait]
impl Platform for MemoryPlatform {
    async fn wait_until_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so this only ends once ready.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    async fn bot_identity(&self) -> Result<BotIdentity, PlatformError> {
        Ok(self.bot.clone())
    }

    async fn guild_permissions(&self, guild_id: Snowflake) -> Result<Permissions, PlatformError> {
        self.guild_permissions_sync(guild_id)
    }

    async fn list_channels(&self, guild_id: Snowflake) -> Result<Vec<ChannelHandle>, PlatformError> {
        let mut channels: Vec<ChannelHandle> = self
            .channels
            .iter()
            .filter(|c| c.guild_id == guild_id)
            .map(|c| c.clone())
            .collect();
        channels.sort_by_key(|c| c.id);
        Ok(channels)
    }

    async fn create_channel(
        &self,
        guild_id: Snowflake,
        params: CreateChannelParams<'_>,
    ) -> Result<ChannelHandle, PlatformError> {
        if !self
            .guild_permissions_sync(guild_id)?
            .contains(Permissions::MANAGE_CHANNELS)
        {
            return Err(PlatformError::MissingPermission("MANAGE_CHANNELS"));
        }

        let channel = ChannelHandle {
            id: self.next_id(),
            guild_id,
            name: params.name.to_string(),
            kind: ChannelKind::Text,
            topic: Some(params.topic.to_string()),
            overwrites: params.overwrites,
        };
        self.channels.insert(channel.id, channel.clone());
        self.record(PlatformCall::CreateChannel {
            name: params.name.to_string(),
            reason: params.reason.to_string(),
        });
        Ok(channel)
    }

    async fn channel_permissions(
        &self,
        channel: &ChannelHandle,
    ) -> Result<Permissions, PlatformError> {
        let guild_perms = self.guild_permissions_sync(channel.guild_id)?;
        let role_ids = self
            .guilds
            .get(&channel.guild_id)
            .map(|g| g.bot_role_ids.clone())
            .unwrap_or_default();
        // Overwrites are read from the live record; the handle may be stale.
        let overwrites = self
            .channels
            .get(&channel.id)
            .map(|c| c.overwrites.clone())
            .unwrap_or_else(|| channel.overwrites.clone());
        Ok(compute_channel_permissions(
            guild_perms,
            &overwrites,
            channel.guild_id,
            &role_ids,
            self.bot.user_id,
            false,
        ))
    }

    async fn list_webhooks(
        &self,
        channel_id: Snowflake,
    ) -> Result<Vec<WebhookHandle>, PlatformError> {
        self.check_webhook_ops()?;
        Ok(self.webhooks_in(channel_id))
    }

    async fn create_webhook(
        &self,
        params: CreateWebhookParams<'_>,
    ) -> Result<WebhookHandle, PlatformError> {
        self.check_webhook_ops()?;
        if !self.channels.contains_key(&params.channel_id) {
            return Err(PlatformError::NotFound {
                kind: "channel",
                id: params.channel_id,
            });
        }

        let webhook = WebhookHandle {
            id: self.next_id(),
            channel_id: params.channel_id,
            name: params.name.to_string(),
            avatar: params.avatar.clone(),
        };
        self.webhooks.insert(webhook.id, webhook.clone());
        self.record(PlatformCall::CreateWebhook {
            channel_id: params.channel_id,
            name: params.name.to_string(),
            has_avatar: params.avatar.is_some(),
        });
        Ok(webhook)
    }

    async fn rename_webhook(
        &self,
        webhook_id: Snowflake,
        name: &str,
        reason: &str,
    ) -> Result<WebhookHandle, PlatformError> {
        self.check_webhook_ops()?;
        let mut webhook = self.webhooks.get_mut(&webhook_id).ok_or(PlatformError::NotFound {
            kind: "webhook",
            id: webhook_id,
        })?;
        webhook.name = name.to_string();
        let renamed = webhook.clone();
        drop(webhook);

        self.record(PlatformCall::RenameWebhook {
            webhook_id,
            name: name.to_string(),
            reason: reason.to_string(),
        });
        Ok(renamed)
    }

    async fn execute_webhook(
        &self,
        webhook: &WebhookHandle,
        entry: &LogEntry,
    ) -> Result<(), PlatformError> {
        if self.fail_delivery.load(Ordering::SeqCst) {
            return Err(PlatformError::Transport("delivery rejected".into()));
        }
        let current = self
            .webhooks
            .get(&webhook.id)
            .map(|w| w.clone())
            .ok_or(PlatformError::NotFound {
                kind: "webhook",
                id: webhook.id,
            })?;

        self.record(PlatformCall::ExecuteWebhook {
            webhook_id: current.id,
        });
        // Record the handle as sent, so each entry keeps the name the logger
        // held when it was produced.
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((webhook.clone(), entry.clone()));
        Ok(())
    }

    async fn bot_avatar(&self) -> Result<Option<Vec<u8>>, PlatformError> {
        Ok(self.avatar.clone())
    }

    async fn apply_channel_update(&self, change: &TopicChange) {
        self.set_topic(change.channel_id, change.after.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::permissions::{DEFAULT_EVERYONE, log_channel_overwrites};

    const GUILD: Snowflake = Snowflake(1);
    const BOT: Snowflake = Snowflake(2);

    fn platform() -> MemoryPlatform {
        MemoryPlatform::new(BotIdentity {
            user_id: BOT,
            name: "logger".into(),
        })
    }

    #[tokio::test]
    async fn test_channel_permissions_follow_overwrites() {
        let p = platform();
        p.add_guild(GUILD, DEFAULT_EVERYONE | Permissions::MANAGE_WEBHOOKS);
        let channel = ChannelHandle {
            id: Snowflake(10),
            guild_id: GUILD,
            name: "reaction-logs".into(),
            kind: ChannelKind::Text,
            topic: None,
            overwrites: log_channel_overwrites(GUILD, BOT),
        };
        p.add_channel(channel.clone());

        let perms = p.channel_permissions(&channel).await.unwrap();
        assert!(perms.contains(Permissions::VIEW_CHANNEL));
        assert!(perms.contains(Permissions::MANAGE_WEBHOOKS));
    }

    #[tokio::test]
    async fn test_owner_has_everything() {
        let p = platform();
        p.add_guild(GUILD, Permissions::empty());
        p.set_owner(GUILD, BOT);
        assert_eq!(p.guild_permissions(GUILD).await.unwrap(), Permissions::all());
    }

    #[tokio::test]
    async fn test_unknown_guild() {
        let p = platform();
        let err = p.guild_permissions(Snowflake(77)).await.unwrap_err();
        assert!(matches!(err, PlatformError::NotFound { kind: "guild", .. }));
    }

    #[tokio::test]
    async fn test_set_topic_reports_before_and_after() {
        let p = platform();
        p.add_channel(ChannelHandle {
            id: Snowflake(10),
            guild_id: GUILD,
            name: "x".into(),
            kind: ChannelKind::Text,
            topic: Some("old".into()),
            overwrites: Vec::new(),
        });
        let change = p.set_topic(Snowflake(10), Some("new")).unwrap();
        assert_eq!(change.before.as_deref(), Some("old"));
        assert_eq!(change.after.as_deref(), Some("new"));
        assert!(p.set_topic(Snowflake(11), None).is_none());
    }

    #[tokio::test]
    async fn test_wait_until_ready_releases_after_set_ready() {
        let p = std::sync::Arc::new(platform());
        let waiter = {
            let p = p.clone();
            tokio::spawn(async move { p.wait_until_ready().await })
        };
        p.set_ready();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
