use super::models::{LoggerState, ReactionEvent, Snowflake};

/// Why a reaction event was not logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Inactive,
    OtherGuild,
    BotUser,
    IgnoredChannel,
    IgnoredMessage,
    IgnoredUser,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "logger inactive",
            Self::OtherGuild => "other guild",
            Self::BotUser => "bot user",
            Self::IgnoredChannel => "ignored channel",
            Self::IgnoredMessage => "ignored message",
            Self::IgnoredUser => "ignored user",
        }
    }
}

/// Decide whether `event` is dropped, and why. `None` means log it.
pub fn drop_reason(
    event: &ReactionEvent,
    state: Option<&LoggerState>,
    guild_id: Snowflake,
) -> Option<DropReason> {
    let Some(state) = state else {
        return Some(DropReason::Inactive);
    };
    if event.guild_id != Some(guild_id) {
        return Some(DropReason::OtherGuild);
    }
    if event.user.bot {
        return Some(DropReason::BotUser);
    }
    if state.is_ignored(event.channel_id) {
        return Some(DropReason::IgnoredChannel);
    }
    if state.is_ignored(event.message_id) {
        return Some(DropReason::IgnoredMessage);
    }
    if state.is_ignored(event.user.id) {
        return Some(DropReason::IgnoredUser);
    }
    None
}

pub fn should_log(event: &ReactionEvent, state: Option<&LoggerState>, guild_id: Snowflake) -> bool {
    drop_reason(event, state, guild_id).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::{
        ChannelHandle, ChannelKind, Identifier, ReactionEmoji, ReactionUser, WebhookHandle,
    };

    const GUILD: Snowflake = Snowflake(1);
    const CHANNEL: Snowflake = Snowflake(111111111111111111);
    const MESSAGE: Snowflake = Snowflake(222222222222222222);
    const USER: Snowflake = Snowflake(333333333333333333);

    fn state(ignored: &[u64]) -> LoggerState {
        LoggerState {
            channel: ChannelHandle {
                id: Snowflake(10),
                guild_id: GUILD,
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
            ignored_ids: ignored.iter().map(|id| Identifier(*id as u128)).collect(),
        }
    }

    fn event(bot: bool) -> ReactionEvent {
        ReactionEvent {
            guild_id: Some(GUILD),
            channel_id: CHANNEL,
            message_id: MESSAGE,
            user: ReactionUser {
                id: USER,
                name: "alice".into(),
                discriminator: None,
                bot,
            },
            emoji: ReactionEmoji::Unicode {
                value: "👍".into(),
            },
        }
    }

    #[test]
    fn test_keeps_plain_event() {
        assert!(should_log(&event(false), Some(&state(&[])), GUILD));
    }

    #[test]
    fn test_inactive_drops_everything() {
        assert_eq!(
            drop_reason(&event(false), None, GUILD),
            Some(DropReason::Inactive)
        );
    }

    #[test]
    fn test_other_guild_and_direct_messages() {
        let s = state(&[]);
        let mut ev = event(false);
        ev.guild_id = Some(Snowflake(2));
        assert_eq!(drop_reason(&ev, Some(&s), GUILD), Some(DropReason::OtherGuild));
        ev.guild_id = None;
        assert_eq!(drop_reason(&ev, Some(&s), GUILD), Some(DropReason::OtherGuild));
    }

    #[test]
    fn test_bot_always_dropped() {
        for ignored in [&[][..], &[CHANNEL.0][..], &[999][..]] {
            assert!(!should_log(&event(true), Some(&state(ignored)), GUILD));
        }
    }

    #[test]
    fn test_each_ignored_id_individually() {
        let cases = [
            (CHANNEL, DropReason::IgnoredChannel),
            (MESSAGE, DropReason::IgnoredMessage),
            (USER, DropReason::IgnoredUser),
        ];
        for (id, reason) in cases {
            let s = state(&[id.0]);
            assert_eq!(drop_reason(&event(false), Some(&s), GUILD), Some(reason));
        }
    }

    #[test]
    fn test_unrelated_ignored_id_keeps_event() {
        let s = state(&[444444444444444444]);
        assert!(should_log(&event(false), Some(&s), GUILD));
    }

    #[test]
    fn test_flat_set_crosses_categories() {
        // A user ID listed under "Ignored Channels" still mutes that user.
        let s = state(&[USER.0]);
        assert!(!should_log(&event(false), Some(&s), GUILD));
    }
}
