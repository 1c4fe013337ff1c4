use tracing::info;

use crate::platform::{CreateChannelParams, Platform};

use super::error::ProvisioningError;
use super::models::{BotIdentity, CREATE_REASON, ChannelHandle, LoggerSettings};
use super::permissions::{Permissions, log_channel_overwrites};
use super::topic_config;

/// Pick the log channel out of a guild's text channels: an exact name match
/// first, otherwise the first channel whose topic mentions the name.
pub fn find_log_channel<'a>(channels: &'a [ChannelHandle], name: &str) -> Option<&'a ChannelHandle> {
    let text = || channels.iter().filter(|c| c.kind.is_text_capable());
    text()
        .find(|c| c.name == name)
        .or_else(|| text().find(|c| c.topic_text().contains(name)))
}

/// Locate the log channel, creating it when none exists and the bot may
/// manage channels.
pub async fn resolve(
    platform: &dyn Platform,
    settings: &LoggerSettings,
    bot: &BotIdentity,
) -> Result<ChannelHandle, ProvisioningError> {
    let channels = platform.list_channels(settings.guild_id).await?;
    if let Some(channel) = find_log_channel(&channels, &settings.channel_name) {
        return Ok(channel.clone());
    }

    let perms = platform.guild_permissions(settings.guild_id).await?;
    if !perms.contains(Permissions::MANAGE_CHANNELS) && !perms.contains(Permissions::ADMINISTRATOR)
    {
        return Err(ProvisioningError::MissingManageChannels);
    }

    let topic = topic_config::default_topic(&settings.default_webhook_name);
    let channel = platform
        .create_channel(
            settings.guild_id,
            CreateChannelParams {
                name: &settings.channel_name,
                topic: &topic,
                overwrites: log_channel_overwrites(settings.guild_id, bot.user_id),
                reason: CREATE_REASON,
            },
        )
        .await?;

    info!(guild_id = %settings.guild_id, channel_id = %channel.id, "created log channel");
    Ok(channel)
}
