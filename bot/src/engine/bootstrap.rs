use std::sync::Arc;

use tracing::{error, info};

use crate::platform::Platform;

use super::channel_resolver;
use super::error::{DisableReason, IdentityMismatchError, WebhookSyncError};
use super::models::{ChannelHandle, LoggerSettings, LoggerState};
use super::permissions::Permissions;
use super::state::{LoggerPhase, SharedLoggerState};
use super::topic_config;
use super::webhook_sync;

/// Bring a logger instance up: wait for the connection, resolve the log
/// channel, validate it, then sync the webhook from the channel topic.
///
/// Every failure is terminal. The returned phase (also published to
/// `shared`) is either `Active` or `Disabled`; there is no retry.
pub async fn bootstrap(
    platform: &dyn Platform,
    settings: &LoggerSettings,
    shared: &SharedLoggerState,
) -> LoggerPhase {
    platform.wait_until_ready().await;

    let phase = match try_bootstrap(platform, settings, shared).await {
        Ok(state) => {
            info!(
                guild_id = %settings.guild_id,
                channel_id = %state.channel.id,
                webhook = %state.webhook.name,
                ignored = state.ignored_ids.len(),
                "reaction logger active"
            );
            LoggerPhase::Active(Arc::new(state))
        }
        Err(reason) => {
            error!(guild_id = %settings.guild_id, reason = %reason, "reaction logger disabled");
            LoggerPhase::Disabled(reason)
        }
    };

    shared.publish(phase.clone()).await;
    phase
}

async fn try_bootstrap(
    platform: &dyn Platform,
    settings: &LoggerSettings,
    shared: &SharedLoggerState,
) -> Result<LoggerState, DisableReason> {
    shared.publish(LoggerPhase::Resolving).await;

    let bot = platform
        .bot_identity()
        .await
        .map_err(DisableReason::Identity)?;
    let channel = channel_resolver::resolve(platform, settings, &bot).await?;

    let perms = platform
        .channel_permissions(&channel)
        .await
        .map_err(WebhookSyncError::from)?;
    validate_channel(&channel, settings, perms)?;

    shared.publish(LoggerPhase::Syncing).await;

    let config = topic_config::parse(channel.topic_text());
    let webhook = webhook_sync::sync_webhook(
        platform,
        &channel,
        config.webhook_name.as_deref(),
        &settings.default_webhook_name,
    )
    .await?;

    Ok(LoggerState {
        channel,
        webhook,
        ignored_ids: config.ignored_ids,
    })
}

/// Preconditions, checked in order: right guild, text-capable, and the bot
/// may manage webhooks there.
pub fn validate_channel(
    channel: &ChannelHandle,
    settings: &LoggerSettings,
    perms: Permissions,
) -> Result<(), DisableReason> {
    if channel.guild_id != settings.guild_id {
        return Err(IdentityMismatchError::WrongGuild {
            channel_id: channel.id,
            expected: settings.guild_id,
            actual: channel.guild_id,
        }
        .into());
    }
    if !channel.kind.is_text_capable() {
        return Err(IdentityMismatchError::NotText {
            channel_id: channel.id,
            kind: channel.kind,
        }
        .into());
    }
    if !perms.contains(Permissions::MANAGE_WEBHOOKS) {
        return Err(WebhookSyncError::MissingManageWebhooks(channel.id).into());
    }
    Ok(())
}
