use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::platform::Platform;

use super::models::{LoggerState, TopicChange};
use super::topic_config;
use super::webhook_sync;

/// Apply a topic edit to the live state.
///
/// Returns the input unchanged when there is no live state, when the change
/// targets another channel, or when the topic text did not change. Otherwise
/// the ignore set is replaced wholesale and, if the topic names a different
/// webhook, the existing webhook is renamed. A failed rename is logged and
/// the previous webhook kept; the new ignore set still applies.
pub async fn on_config_changed(
    platform: &dyn Platform,
    state: Option<&Arc<LoggerState>>,
    change: &TopicChange,
) -> Option<Arc<LoggerState>> {
    let state = state?;

    if change.guild_id != state.channel.guild_id || change.channel_id != state.channel.id {
        return Some(state.clone());
    }
    if change.before == change.after {
        debug!(channel_id = %change.channel_id, "channel updated without topic change");
        return Some(state.clone());
    }

    let config = topic_config::parse(change.after.as_deref().unwrap_or(""));

    let mut webhook = state.webhook.clone();
    if let Some(name) = config.webhook_name.as_deref()
        && name != webhook.name
    {
        match webhook_sync::rename_webhook(platform, &webhook, name).await {
            Ok(renamed) => webhook = renamed,
            Err(e) => {
                warn!(webhook_id = %webhook.id, error = %e, "failed to rename webhook after topic change");
            }
        }
    }

    let mut channel = state.channel.clone();
    channel.topic = change.after.clone();

    info!(
        channel_id = %channel.id,
        ignored = config.ignored_ids.len(),
        webhook = %webhook.name,
        "reloaded reaction log configuration"
    );

    Some(Arc::new(LoggerState {
        channel,
        webhook,
        ignored_ids: config.ignored_ids,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::{
        BotIdentity, ChannelHandle, ChannelKind, Identifier, RENAME_REASON, Snowflake,
        WebhookHandle,
    };
    use crate::engine::permissions::{DEFAULT_EVERYONE, Permissions};
    use crate::platform::memory::{MemoryPlatform, PlatformCall};

    const GUILD: Snowflake = Snowflake(1);
    const CHANNEL: Snowflake = Snowflake(10);
    const WEBHOOK: Snowflake = Snowflake(20);

    fn setup(topic: &str) -> (MemoryPlatform, Arc<LoggerState>) {
        let p = MemoryPlatform::new(BotIdentity {
            user_id: Snowflake(2),
            name: "logger".into(),
        });
        p.add_guild(GUILD, DEFAULT_EVERYONE | Permissions::MANAGE_WEBHOOKS);
        let channel = ChannelHandle {
            id: CHANNEL,
            guild_id: GUILD,
            name: "reaction-logs".into(),
            kind: ChannelKind::Text,
            topic: Some(topic.into()),
            overwrites: Vec::new(),
        };
        let webhook = WebhookHandle {
            id: WEBHOOK,
            channel_id: CHANNEL,
            name: "Reaction Logger".into(),
            avatar: None,
        };
        p.add_channel(channel.clone());
        p.add_webhook(webhook.clone());
        let config = topic_config::parse(topic);
        let state = Arc::new(LoggerState {
            channel,
            webhook,
            ignored_ids: config.ignored_ids,
        });
        (p, state)
    }

    #[tokio::test]
    async fn test_absent_state_stays_absent() {
        let (p, _) = setup("");
        let change = p.set_topic(CHANNEL, Some("111111111111111111")).unwrap();
        assert!(on_config_changed(&p, None, &change).await.is_none());
    }

    #[tokio::test]
    async fn test_other_channel_is_ignored() {
        let (p, state) = setup("- 111111111111111111");
        let change = TopicChange {
            guild_id: GUILD,
            channel_id: Snowflake(99),
            before: None,
            after: Some("222222222222222222".into()),
        };
        let next = on_config_changed(&p, Some(&state), &change).await.unwrap();
        assert!(Arc::ptr_eq(&next, &state));
    }

    #[tokio::test]
    async fn test_same_text_is_noop() {
        let (p, state) = setup("Webhook name: Other\n- 111111111111111111");
        let text = state.channel.topic.clone();
        let change = TopicChange {
            guild_id: GUILD,
            channel_id: CHANNEL,
            before: text.clone(),
            after: text,
        };
        let next = on_config_changed(&p, Some(&state), &change).await.unwrap();
        assert!(Arc::ptr_eq(&next, &state));
        assert!(p.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rename_follows_topic() {
        let (p, state) = setup("Webhook name: Reaction Logger\n");
        let change = p
            .set_topic(CHANNEL, Some("Webhook name: Audit Bot\n"))
            .unwrap();
        let next = on_config_changed(&p, Some(&state), &change).await.unwrap();
        assert_eq!(next.webhook.id, WEBHOOK);
        assert_eq!(next.webhook.name, "Audit Bot");
        assert_eq!(
            p.calls(),
            vec![PlatformCall::RenameWebhook {
                webhook_id: WEBHOOK,
                name: "Audit Bot".into(),
                reason: RENAME_REASON.into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_removed_name_line_does_not_rename() {
        let (p, state) = setup("Webhook name: Reaction Logger\n");
        let change = p.set_topic(CHANNEL, Some("- 333333333333333333")).unwrap();
        let next = on_config_changed(&p, Some(&state), &change).await.unwrap();
        assert_eq!(next.webhook, state.webhook);
        assert!(p.calls().is_empty());
        assert!(next.ignored_ids.contains(&Identifier(333333333333333333)));
    }

    #[tokio::test]
    async fn test_failed_rename_keeps_webhook_but_applies_ids() {
        let (p, state) = setup("- 111111111111111111");
        p.fail_webhook_ops(true);
        let change = p
            .set_topic(CHANNEL, Some("Webhook name: New\n- 222222222222222222"))
            .unwrap();
        let next = on_config_changed(&p, Some(&state), &change).await.unwrap();
        assert_eq!(next.webhook.name, "Reaction Logger");
        assert_eq!(
            next.ignored_ids,
            [Identifier(222222222222222222)].into_iter().collect()
        );
    }

    #[tokio::test]
    async fn test_cleared_topic_empties_ignore_set() {
        let (p, state) = setup("- 111111111111111111");
        let change = p.set_topic(CHANNEL, None).unwrap();
        let next = on_config_changed(&p, Some(&state), &change).await.unwrap();
        assert!(next.ignored_ids.is_empty());
        assert!(next.channel.topic.is_none());
    }
}
