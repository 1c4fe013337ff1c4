use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::error::EnrichmentFailure;
use super::models::{
    LogEntry, LogFooter, LoggerSettings, ReactionEmoji, ReactionEvent, Snowflake, channel_mention,
};

/// Looks up the image for a custom emoji.
pub trait EmojiResolver: Send + Sync {
    fn image_url(&self, id: Option<Snowflake>, animated: bool) -> Result<String, EnrichmentFailure>;
}

/// Builds CDN URLs from the emoji ID: `<base>/<id>.png`, or `.gif` when animated.
pub struct CdnEmojiResolver {
    base: String,
}

impl CdnEmojiResolver {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl EmojiResolver for CdnEmojiResolver {
    fn image_url(&self, id: Option<Snowflake>, animated: bool) -> Result<String, EnrichmentFailure> {
        let id = id.ok_or_else(|| EnrichmentFailure("custom emoji has no id".into()))?;
        let ext = if animated { "gif" } else { "png" };
        Ok(format!("{}/{}.{}", self.base.trim_end_matches('/'), id, ext))
    }
}

/// Renders kept reaction events into log entries. Never fails: missing emoji
/// metadata only degrades the emoji line.
#[derive(Clone)]
pub struct LogEntryFormatter {
    jump_url_base: String,
    color: u32,
    resolver: Arc<dyn EmojiResolver>,
}

impl LogEntryFormatter {
    pub fn new(settings: &LoggerSettings) -> Self {
        Self {
            jump_url_base: settings.jump_url_base.trim_end_matches('/').to_string(),
            color: settings.embed_color,
            resolver: Arc::new(CdnEmojiResolver::new(settings.emoji_cdn_base.clone())),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn EmojiResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn format(&self, event: &ReactionEvent) -> LogEntry {
        self.format_at(event, Utc::now())
    }

    pub fn format_at(&self, event: &ReactionEvent, now: DateTime<Utc>) -> LogEntry {
        let mut lines = vec![format!(
            "**Message:** [Jump!]({}) {}",
            self.jump_url(event),
            channel_mention(event.channel_id)
        )];

        let mut thumbnail_url = None;
        match &event.emoji {
            ReactionEmoji::Custom { id, name, animated } => {
                let text = format!("`:{}:`", name.as_deref().unwrap_or("unknown"));
                match self.resolver.image_url(*id, *animated) {
                    Ok(url) => {
                        lines.push(format!("**Emoji name:** {text}"));
                        thumbnail_url = Some(url);
                    }
                    Err(e) => {
                        debug!(error = %e, "rendering emoji without thumbnail");
                        lines.push(format!("**Emoji name:** {text} (emoji can't be found)"));
                    }
                }
            }
            ReactionEmoji::Unicode { value } => {
                lines.push(format!("**Emoji:** {value}"));
            }
        }

        LogEntry {
            title: format!("Reaction added by {}", event.user),
            description_lines: lines,
            thumbnail_url,
            footer: LogFooter {
                user_id: event.user.id,
                channel_id: event.channel_id,
                message_id: event.message_id,
            },
            timestamp: now,
            color: self.color,
        }
    }

    /// Direct-message reactions have no guild; the platform uses `@me` there.
    fn jump_url(&self, event: &ReactionEvent) -> String {
        let guild = event
            .guild_id
            .map(|g| g.to_string())
            .unwrap_or_else(|| "@me".into());
        format!(
            "{}/{}/{}/{}",
            self.jump_url_base, guild, event.channel_id, event.message_id
        )
    }
}
