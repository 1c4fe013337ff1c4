use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::permissions::PermissionOverwrite;

/// Name of the log channel and the marker searched for in channel topics.
pub const DEFAULT_CHANNEL_NAME: &str = "reaction-logs";

/// Display name used for the webhook when the topic does not name one.
pub const DEFAULT_WEBHOOK_NAME: &str = "Reaction Logger";

/// Audit-log reason attached to channel and webhook creation.
pub const CREATE_REASON: &str = "Reaction Logger!";

/// Audit-log reason attached to webhook renames.
pub const RENAME_REASON: &str = "Reaction Logger (renamed)!";

pub const DEFAULT_EMBED_COLOR: u32 = 0xffd1df;
pub const DEFAULT_JUMP_URL_BASE: &str = "https://discord.com/channels";
pub const DEFAULT_EMOJI_CDN_BASE: &str = "https://cdn.discordapp.com/emojis";

/// Platform-assigned numeric ID (guild, channel, member, message, webhook).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Snowflake(pub u64);

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 15-21 digit token pulled out of a channel topic.
///
/// Wider than [`Snowflake`] because 21-digit runs overflow `u64`; such a token
/// is still kept in the ignore set, it just never matches a live ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(pub u128);

impl From<Snowflake> for Identifier {
    fn from(id: Snowflake) -> Self {
        Self(id.0 as u128)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of guild channel. Only text-capable kinds can host the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    News,
    Voice,
    Stage,
    Category,
    Forum,
}

impl ChannelKind {
    pub fn is_text_capable(self) -> bool {
        matches!(self, Self::Text | Self::News)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::News => "news",
            Self::Voice => "voice",
            Self::Stage => "stage",
            Self::Category => "category",
            Self::Forum => "forum",
        }
    }
}

/// Snapshot of a guild channel as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelHandle {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub name: String,
    pub kind: ChannelKind,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub overwrites: Vec<PermissionOverwrite>,
}

impl ChannelHandle {
    pub fn topic_text(&self) -> &str {
        self.topic.as_deref().unwrap_or("")
    }
}

pub fn channel_mention(id: Snowflake) -> String {
    format!("<#{id}>")
}

/// A webhook attached to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookHandle {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Who the bot is in this guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub user_id: Snowflake,
    pub name: String,
}

/// The member who added a reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionUser {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl fmt::Display for ReactionUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.discriminator.as_deref() {
            Some(d) if !d.is_empty() && d != "0" => write!(f, "{}#{}", self.name, d),
            _ => f.write_str(&self.name),
        }
    }
}

/// Emoji payload of a reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactionEmoji {
    /// Guild-hosted emoji. The gateway may omit the ID or name when the emoji
    /// has since been deleted.
    Custom {
        id: Option<Snowflake>,
        name: Option<String>,
        #[serde(default)]
        animated: bool,
    },
    /// A plain unicode emoji.
    Unicode { value: String },
}

impl ReactionEmoji {
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

/// A reaction-add notification from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    /// `None` for reactions in direct messages.
    pub guild_id: Option<Snowflake>,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    pub user: ReactionUser,
    pub emoji: ReactionEmoji,
}

/// A channel-update notification carrying the topic before and after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicChange {
    pub guild_id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
}

/// Raw IDs shown in the footer of every log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFooter {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
}

impl LogFooter {
    pub fn text(&self) -> String {
        format!(
            "User ID: {}\nChannel ID: {}\nMessage ID: {}",
            self.user_id, self.channel_id, self.message_id
        )
    }
}

/// A rendered log message, sent once through the webhook and dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub title: String,
    pub description_lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub footer: LogFooter,
    pub timestamp: DateTime<Utc>,
    pub color: u32,
}

impl LogEntry {
    pub fn description(&self) -> String {
        let mut out = String::new();
        for line in &self.description_lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Live state of an active logger. Replaced wholesale, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerState {
    pub channel: ChannelHandle,
    pub webhook: WebhookHandle,
    pub ignored_ids: HashSet<Identifier>,
}

impl LoggerState {
    pub fn is_ignored(&self, id: Snowflake) -> bool {
        self.ignored_ids.contains(&Identifier::from(id))
    }
}

/// Per-guild settings for one logger instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerSettings {
    pub guild_id: Snowflake,
    pub channel_name: String,
    pub default_webhook_name: String,
    pub embed_color: u32,
    pub jump_url_base: String,
    pub emoji_cdn_base: String,
}

impl LoggerSettings {
    pub fn new(guild_id: Snowflake) -> Self {
        Self {
            guild_id,
            channel_name: DEFAULT_CHANNEL_NAME.into(),
            default_webhook_name: DEFAULT_WEBHOOK_NAME.into(),
            embed_color: DEFAULT_EMBED_COLOR,
            jump_url_base: DEFAULT_JUMP_URL_BASE.into(),
            emoji_cdn_base: DEFAULT_EMOJI_CDN_BASE.into(),
        }
    }
}
