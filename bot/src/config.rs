use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::engine::models::{
    DEFAULT_CHANNEL_NAME, DEFAULT_EMBED_COLOR, DEFAULT_EMOJI_CDN_BASE, DEFAULT_JUMP_URL_BASE,
    DEFAULT_WEBHOOK_NAME, LoggerSettings, Snowflake,
};

/// Top-level configuration, loaded from reactionlog.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BotConfig {
    pub guild: GuildSection,
    pub logger: LoggerSection,
    pub log: LogSection,
    pub replay: ReplaySection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GuildSection {
    /// The guild this logger instance serves.
    pub id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggerSection {
    pub channel_name: String,
    pub default_webhook_name: String,
    pub embed_color: u32,
    pub jump_url_base: String,
    pub emoji_cdn_base: String,
}

impl Default for LoggerSection {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.into(),
            default_webhook_name: DEFAULT_WEBHOOK_NAME.into(),
            embed_color: DEFAULT_EMBED_COLOR,
            jump_url_base: DEFAULT_JUMP_URL_BASE.into(),
            emoji_cdn_base: DEFAULT_EMOJI_CDN_BASE.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Default tracing filter when RUST_LOG is unset.
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ReplaySection {
    /// JSON guild fixture seeding the in-memory platform.
    pub fixture: Option<String>,
    /// JSON-lines file of gateway events.
    pub events: Option<String>,
}

impl BotConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {path}"))?;
            Self::from_toml(&contents)
                .with_context(|| format!("failed to parse config file {path}"))?
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("REACTIONLOG_GUILD_ID")
            && let Ok(id) = v.parse()
        {
            self.guild.id = id;
        }
        if let Ok(v) = std::env::var("REACTIONLOG_CHANNEL_NAME") {
            self.logger.channel_name = v;
        }
        if let Ok(v) = std::env::var("REACTIONLOG_WEBHOOK_NAME") {
            self.logger.default_webhook_name = v;
        }
        if let Ok(v) = std::env::var("REACTIONLOG_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Ok(v) = std::env::var("REACTIONLOG_FIXTURE") {
            self.replay.fixture = Some(v);
        }
        if let Ok(v) = std::env::var("REACTIONLOG_EVENTS") {
            self.replay.events = Some(v);
        }
    }

    /// Convert into the per-guild settings the engine runs with.
    pub fn to_logger_settings(&self) -> LoggerSettings {
        LoggerSettings {
            guild_id: Snowflake(self.guild.id),
            channel_name: self.logger.channel_name.clone(),
            default_webhook_name: self.logger.default_webhook_name.clone(),
            embed_color: self.logger.embed_color,
            jump_url_base: self.logger.jump_url_base.clone(),
            emoji_cdn_base: self.logger.emoji_cdn_base.clone(),
        }
    }
}
