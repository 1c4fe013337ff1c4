use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use super::error::DisableReason;
use super::models::LoggerState;

/// Lifecycle of a logger instance.
///
/// `Uninitialized → Resolving → Syncing → Active | Disabled`. `Disabled` is
/// terminal until the process restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggerPhase {
    Uninitialized,
    Resolving,
    Syncing,
    Active(Arc<LoggerState>),
    Disabled(DisableReason),
}

impl LoggerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Resolving => "resolving",
            Self::Syncing => "syncing",
            Self::Active(_) => "active",
            Self::Disabled(_) => "disabled",
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled(_))
    }
}

/// Shared, hot-swappable logger phase.
///
/// Writers replace the whole value; readers clone out an `Arc<LoggerState>`
/// and keep using that snapshot, so a reconfiguration is observed entirely
/// or not at all.
#[derive(Clone)]
pub struct SharedLoggerState {
    phase: Arc<RwLock<LoggerPhase>>,
    generation: Arc<AtomicU64>,
}

impl SharedLoggerState {
    pub fn new() -> Self {
        Self {
            phase: Arc::new(RwLock::new(LoggerPhase::Uninitialized)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn phase(&self) -> LoggerPhase {
        self.phase.read().await.clone()
    }

    /// The live state, if the logger is active.
    pub async fn active(&self) -> Option<Arc<LoggerState>> {
        match &*self.phase.read().await {
            LoggerPhase::Active(state) => Some(state.clone()),
            _ => None,
        }
    }

    pub async fn publish(&self, phase: LoggerPhase) {
        *self.phase.write().await = phase;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Incremented on every publish.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Default for SharedLoggerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::ProvisioningError;
    use crate::engine::models::{ChannelHandle, ChannelKind, Identifier, Snowflake, WebhookHandle};

    fn state(ids: &[u128]) -> LoggerState {
        LoggerState {
            channel: ChannelHandle {
                id: Snowflake(10),
                guild_id: Snowflake(1),
                name: "reaction-logs".into(),
                kind: ChannelKind::Text,
                topic: None,
                overwrites: Vec::new(),
            },
            webhook: WebhookHandle {
                id: Snowflake(20),
                channel_id: Snowflake(10),
                name: "Reaction Logger".into(),
                avatar: None,
            },
            ignored_ids: ids.iter().copied().map(Identifier).collect(),
        }
    }

    #[tokio::test]
    async fn test_starts_uninitialized() {
        let shared = SharedLoggerState::new();
        assert_eq!(shared.phase().await, LoggerPhase::Uninitialized);
        assert!(shared.active().await.is_none());
        assert_eq!(shared.generation(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_survives_swap() {
        let shared = SharedLoggerState::new();
        shared.publish(LoggerPhase::Active(Arc::new(state(&[111])))).await;
        let snapshot = shared.active().await.unwrap();

        shared.publish(LoggerPhase::Active(Arc::new(state(&[222])))).await;

        assert!(snapshot.ignored_ids.contains(&Identifier(111)));
        let fresh = shared.active().await.unwrap();
        assert!(fresh.ignored_ids.contains(&Identifier(222)));
        assert!(!fresh.ignored_ids.contains(&Identifier(111)));
        assert_eq!(shared.generation(), 2);
    }

    #[tokio::test]
    async fn test_disabled_has_no_active_state() {
        let shared = SharedLoggerState::new();
        shared
            .publish(LoggerPhase::Disabled(
                ProvisioningError::MissingManageChannels.into(),
            ))
            .await;
        assert!(shared.active().await.is_none());
        assert!(shared.phase().await.is_disabled());
        assert_eq!(shared.phase().await.as_str(), "disabled");
    }
}
