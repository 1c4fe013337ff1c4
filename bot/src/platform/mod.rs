//! The chat platform as seen by the logger.
//!
//! Gateway transport, REST calls and caching live behind [`Platform`]. The
//! engine only ever talks to this trait, so a logger instance can run against
//! a live connection or against [`memory::MemoryPlatform`].

pub mod memory;

use async_trait::async_trait;

use crate::engine::error::PlatformError;
use crate::engine::models::{
    BotIdentity, ChannelHandle, LogEntry, Snowflake, TopicChange, WebhookHandle,
};
use crate::engine::permissions::{PermissionOverwrite, Permissions};

/// Parameters for creating a guild text channel.
#[derive(Debug, Clone)]
pub struct CreateChannelParams<'a> {
    pub name: &'a str,
    pub topic: &'a str,
    pub overwrites: Vec<PermissionOverwrite>,
    pub reason: &'a str,
}

/// Parameters for creating a webhook.
#[derive(Debug, Clone)]
pub struct CreateWebhookParams<'a> {
    pub channel_id: Snowflake,
    pub name: &'a str,
    /// Image data URI (`data:image/png;base64,...`).
    pub avatar: Option<String>,
    pub reason: &'a str,
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Resolves once the gateway connection is ready. Awaited once per bootstrap.
    async fn wait_until_ready(&self);

    async fn bot_identity(&self) -> Result<BotIdentity, PlatformError>;

    /// The bot's guild-level permissions in `guild_id`.
    async fn guild_permissions(&self, guild_id: Snowflake) -> Result<Permissions, PlatformError>;

    async fn list_channels(&self, guild_id: Snowflake) -> Result<Vec<ChannelHandle>, PlatformError>;

    async fn create_channel(
        &self,
        guild_id: Snowflake,
        params: CreateChannelParams<'_>,
    ) -> Result<ChannelHandle, PlatformError>;

    /// The bot's effective permissions in a channel.
    async fn channel_permissions(&self, channel: &ChannelHandle)
    -> Result<Permissions, PlatformError>;

    async fn list_webhooks(&self, channel_id: Snowflake)
    -> Result<Vec<WebhookHandle>, PlatformError>;

    async fn create_webhook(
        &self,
        params: CreateWebhookParams<'_>,
    ) -> Result<WebhookHandle, PlatformError>;

    async fn rename_webhook(
        &self,
        webhook_id: Snowflake,
        name: &str,
        reason: &str,
    ) -> Result<WebhookHandle, PlatformError>;

    /// Post a log entry through a webhook.
    async fn execute_webhook(
        &self,
        webhook: &WebhookHandle,
        entry: &LogEntry,
    ) -> Result<(), PlatformError>;

    /// Raw bytes of the bot's avatar image, if it has one.
    async fn bot_avatar(&self) -> Result<Option<Vec<u8>>, PlatformError>;

    /// Fold a channel update into the platform's channel cache. Called by the
    /// dispatcher when it reaches the update, so reads made while handling
    /// earlier events still see the channel as it was then.
    async fn apply_channel_update(&self, _change: &TopicChange) {}
}
