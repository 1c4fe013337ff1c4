use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

use crate::platform::{CreateWebhookParams, Platform};

use super::error::WebhookSyncError;
use super::models::{CREATE_REASON, ChannelHandle, RENAME_REASON, WebhookHandle};
use super::permissions::Permissions;

/// Find, create or rename the channel's log webhook so its name matches
/// `desired_name` (or `default_name` when the topic names none).
///
/// Idempotent: a second call with the same name finds the webhook by that
/// name and issues no further create or rename.
pub async fn sync_webhook(
    platform: &dyn Platform,
    channel: &ChannelHandle,
    desired_name: Option<&str>,
    default_name: &str,
) -> Result<WebhookHandle, WebhookSyncError> {
    let perms = platform.channel_permissions(channel).await?;
    if !perms.contains(Permissions::MANAGE_WEBHOOKS) {
        return Err(WebhookSyncError::MissingManageWebhooks(channel.id));
    }

    let desired_name = desired_name.filter(|n| !n.is_empty());
    let existing = platform.list_webhooks(channel.id).await?;

    let found = desired_name
        .and_then(|name| existing.iter().find(|w| w.name == name))
        .or_else(|| existing.iter().find(|w| w.name == default_name))
        .cloned();

    let webhook = match found {
        Some(webhook) => webhook,
        None => {
            let avatar = platform.bot_avatar().await?.map(|bytes| avatar_data_uri(&bytes));
            let webhook = platform
                .create_webhook(CreateWebhookParams {
                    channel_id: channel.id,
                    name: desired_name.unwrap_or(default_name),
                    avatar,
                    reason: CREATE_REASON,
                })
                .await?;
            info!(channel_id = %channel.id, webhook_id = %webhook.id, name = %webhook.name, "made webhook");
            webhook
        }
    };

    match desired_name {
        Some(name) => rename_webhook(platform, &webhook, name).await,
        None => Ok(webhook),
    }
}

/// Rename `webhook` to `name` unless it already carries that name.
pub async fn rename_webhook(
    platform: &dyn Platform,
    webhook: &WebhookHandle,
    name: &str,
) -> Result<WebhookHandle, WebhookSyncError> {
    if webhook.name == name {
        return Ok(webhook.clone());
    }

    let renamed = platform
        .rename_webhook(webhook.id, name, RENAME_REASON)
        .await?;
    info!(webhook_id = %webhook.id, from = %webhook.name, to = %renamed.name, "renamed webhook");
    Ok(renamed)
}

/// Encode avatar bytes as the data URI the webhook API expects.
pub fn avatar_data_uri(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", image_mime(bytes), STANDARD.encode(bytes))
}

fn image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/png"
    }
}
