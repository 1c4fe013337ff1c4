//! Parsing of the log channel topic.
//!
//! The topic is free text edited by moderators. Two things are machine-read:
//! every standalone run of 15-21 digits (an ID to ignore) and the first
//! `Webhook name: <text>` line that carries a value. Section headers are for humans only.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::models::{DEFAULT_CHANNEL_NAME, Identifier};

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]{15,21})\b").expect("valid id pattern"));

static WEBHOOK_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)webhook name:[ \t]*(\S[^\r\n]*)").expect("valid webhook name pattern")
});

/// Configuration decoded from a channel topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicConfig {
    pub ignored_ids: HashSet<Identifier>,
    pub webhook_name: Option<String>,
}

/// Parse a topic. Total: text without matches yields an empty config.
pub fn parse(raw: &str) -> TopicConfig {
    TopicConfig {
        ignored_ids: extract_ids(raw),
        webhook_name: extract_webhook_name(raw),
    }
}

fn extract_ids(raw: &str) -> HashSet<Identifier> {
    ID_RE
        .captures_iter(raw)
        .filter_map(|c| c[1].parse::<u128>().ok())
        .map(Identifier)
        .collect()
}

/// First `Webhook name:` line with a value wins; blank ones are skipped.
fn extract_webhook_name(raw: &str) -> Option<String> {
    let caps = WEBHOOK_NAME_RE.captures(raw)?;
    let name = caps[1].trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Topic written into a newly created log channel.
pub fn default_topic(webhook_name: &str) -> String {
    format!(
        "{DEFAULT_CHANNEL_NAME} (don't edit this first line)\n\
         Webhook name: {webhook_name}\n\n\
         Ignored Channels:\n\
         - 122055941540671003 (example)\n\
         -\n\n\
         Ignored Members:\n\
         - 062234385923023350 (example)\n\
         -\n\n\
         Ignored Messages:\n\
         - 100698437992827166 (example)\n\
         -\n\n"
    )
}
