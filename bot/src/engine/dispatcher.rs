use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::platform::Platform;

use super::bootstrap;
use super::filter;
use super::formatter::LogEntryFormatter;
use super::models::{LogEntry, LoggerSettings, ReactionEvent, TopicChange, WebhookHandle};
use super::reconfigure;
use super::state::{LoggerPhase, SharedLoggerState};

/// Gateway events the logger consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    ChannelUpdate(TopicChange),
    ReactionAdd(ReactionEvent),
}

impl PlatformEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChannelUpdate(_) => "channel_update",
            Self::ReactionAdd(_) => "reaction_add",
        }
    }
}

/// Outgoing work produced by handling one event.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchAction {
    None,
    Deliver {
        webhook: WebhookHandle,
        entry: LogEntry,
    },
}

/// Routes gateway events for one guild to the logger.
///
/// Events are handled one at a time in arrival order. Only the final webhook
/// send runs detached, so a stalled delivery never blocks the next event.
pub struct Dispatcher {
    platform: Arc<dyn Platform>,
    settings: LoggerSettings,
    formatter: LogEntryFormatter,
    shared: SharedLoggerState,
}

impl Dispatcher {
    pub fn new(platform: Arc<dyn Platform>, settings: LoggerSettings) -> Self {
        let formatter = LogEntryFormatter::new(&settings);
        Self {
            platform,
            settings,
            formatter,
            shared: SharedLoggerState::new(),
        }
    }

    pub fn with_formatter(mut self, formatter: LogEntryFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Handle onto the live phase, for observers outside the dispatch loop.
    pub fn shared(&self) -> SharedLoggerState {
        self.shared.clone()
    }

    pub async fn bootstrap(&self) -> LoggerPhase {
        bootstrap::bootstrap(self.platform.as_ref(), &self.settings, &self.shared).await
    }

    /// Dispatch table: one entry per event kind.
    pub async fn handle(&self, event: &PlatformEvent) -> DispatchAction {
        match event {
            PlatformEvent::ChannelUpdate(change) => {
                self.on_channel_update(change).await;
                DispatchAction::None
            }
            PlatformEvent::ReactionAdd(reaction) => self.on_reaction_add(reaction).await,
        }
    }

    async fn on_channel_update(&self, change: &TopicChange) {
        self.platform.apply_channel_update(change).await;
        let Some(current) = self.shared.active().await else {
            return;
        };
        let next =
            reconfigure::on_config_changed(self.platform.as_ref(), Some(&current), change).await;
        if let Some(next) = next
            && !Arc::ptr_eq(&next, &current)
        {
            self.shared.publish(LoggerPhase::Active(next)).await;
        }
    }

    async fn on_reaction_add(&self, reaction: &ReactionEvent) -> DispatchAction {
        let state = self.shared.active().await;
        if let Some(reason) = filter::drop_reason(reaction, state.as_deref(), self.settings.guild_id)
        {
            debug!(
                message_id = %reaction.message_id,
                user_id = %reaction.user.id,
                reason = reason.as_str(),
                "reaction not logged"
            );
            return DispatchAction::None;
        }

        // drop_reason only passes events through when the logger is active.
        let Some(state) = state else {
            return DispatchAction::None;
        };
        DispatchAction::Deliver {
            webhook: state.webhook.clone(),
            entry: self.formatter.format(reaction),
        }
    }

    /// Send a delivery in the background. Failures are logged, never retried.
    pub fn deliver(&self, action: DispatchAction, tasks: &mut JoinSet<()>) {
        let DispatchAction::Deliver { webhook, entry } = action else {
            return;
        };
        let platform = self.platform.clone();
        tasks.spawn(async move {
            if let Err(e) = platform.execute_webhook(&webhook, &entry).await {
                warn!(webhook_id = %webhook.id, error = %e, "failed to deliver reaction log");
            }
        });
    }

    /// Bootstrap, then consume events until the sender closes or `cancel`
    /// fires. Returns immediately if bootstrap disables the logger.
    pub async fn run(
        self,
        mut rx: mpsc::Receiver<PlatformEvent>,
        cancel: CancellationToken,
    ) -> LoggerPhase {
        let phase = tokio::select! {
            _ = cancel.cancelled() => return self.shared.phase().await,
            phase = self.bootstrap() => phase,
        };
        if phase.is_disabled() {
            return phase;
        }

        let mut deliveries = JoinSet::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("reaction logger shutting down");
                    break;
                }
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    debug!(kind = event.kind(), "dispatching event");
                    let action = self.handle(&event).await;
                    self.deliver(action, &mut deliveries);
                    while deliveries.try_join_next().is_some() {}
                }
            }
        }

        while deliveries.join_next().await.is_some() {}
        self.shared.phase().await
    }
}
