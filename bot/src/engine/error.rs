use thiserror::Error;

use super::models::{ChannelKind, Snowflake};

/// Failure reported by the chat platform collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("missing permission: {0}")]
    MissingPermission(&'static str),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Snowflake },
    #[error("transport error: {0}")]
    Transport(String),
}

/// The log channel could not be located or created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
    #[error("I don't have permissions to manage channels")]
    MissingManageChannels,
    #[error("failed to provision log channel: {0}")]
    Platform(#[from] PlatformError),
}

/// The resolved channel is not one the logger may use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityMismatchError {
    #[error("Channel {channel_id} is in guild {actual}, expected guild {expected}")]
    WrongGuild {
        channel_id: Snowflake,
        expected: Snowflake,
        actual: Snowflake,
    },
    #[error("Channel {channel_id} is a {} channel, not a text channel", .kind.as_str())]
    NotText {
        channel_id: Snowflake,
        kind: ChannelKind,
    },
}

/// Listing, creating or renaming the log webhook failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookSyncError {
    #[error("I don't have permissions to manage webhooks in channel {0}")]
    MissingManageWebhooks(Snowflake),
    #[error("webhook sync failed: {0}")]
    Platform(#[from] PlatformError),
}

/// Emoji metadata could not be resolved. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("emoji metadata unavailable: {0}")]
pub struct EnrichmentFailure(pub String);

/// Why a logger instance went to the terminal `Disabled` state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisableReason {
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),
    #[error(transparent)]
    IdentityMismatch(#[from] IdentityMismatchError),
    #[error(transparent)]
    WebhookSync(#[from] WebhookSyncError),
    #[error("failed to read bot identity: {0}")]
    Identity(PlatformError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_are_distinct() {
        let reasons: Vec<DisableReason> = vec![
            ProvisioningError::MissingManageChannels.into(),
            IdentityMismatchError::WrongGuild {
                channel_id: Snowflake(1),
                expected: Snowflake(2),
                actual: Snowflake(3),
            }
            .into(),
            IdentityMismatchError::NotText {
                channel_id: Snowflake(1),
                kind: ChannelKind::Voice,
            }
            .into(),
            WebhookSyncError::MissingManageWebhooks(Snowflake(1)).into(),
        ];
        let messages: Vec<String> = reasons.iter().map(|r| r.to_string()).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(
            messages[2],
            "Channel 1 is a voice channel, not a text channel"
        );
    }

    #[test]
    fn test_platform_error_wraps_into_webhook_sync() {
        let err: WebhookSyncError = PlatformError::Transport("502".into()).into();
        assert_eq!(err.to_string(), "webhook sync failed: transport error: 502");
    }
}
