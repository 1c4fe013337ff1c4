use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::models::Snowflake;

bitflags! {
    /// Permission bitfield, laid out like the platform's own bit positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        // ── General ──
        const CREATE_INVITES        = 1 << 0;
        const KICK_MEMBERS          = 1 << 1;
        const BAN_MEMBERS           = 1 << 2;
        const ADMINISTRATOR         = 1 << 3;
        const MANAGE_CHANNELS       = 1 << 4;
        const MANAGE_GUILD          = 1 << 5;
        const VIEW_CHANNEL          = 1 << 10;

        // ── Channel text ──
        const ADD_REACTIONS         = 1 << 6;
        const SEND_MESSAGES         = 1 << 11;
        const MANAGE_MESSAGES       = 1 << 13;
        const EMBED_LINKS           = 1 << 14;
        const ATTACH_FILES          = 1 << 15;
        const READ_MESSAGE_HISTORY  = 1 << 16;
        const MENTION_EVERYONE      = 1 << 17;

        // ── Management ──
        const MANAGE_ROLES          = 1 << 28;
        const MANAGE_WEBHOOKS       = 1 << 29;
    }
}

/// Default permissions for the @everyone role.
pub const DEFAULT_EVERYONE: Permissions = Permissions::VIEW_CHANNEL
    .union(Permissions::SEND_MESSAGES)
    .union(Permissions::EMBED_LINKS)
    .union(Permissions::ATTACH_FILES)
    .union(Permissions::ADD_REACTIONS)
    .union(Permissions::READ_MESSAGE_HISTORY)
    .union(Permissions::CREATE_INVITES);

/// Whom a channel overwrite applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum OverwriteTarget {
    Role(Snowflake),
    Member(Snowflake),
}

/// A channel permission overwrite (allow/deny pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub target: OverwriteTarget,
    #[serde(with = "bits", default = "Permissions::empty")]
    pub allow: Permissions,
    #[serde(with = "bits", default = "Permissions::empty")]
    pub deny: Permissions,
}

impl PermissionOverwrite {
    pub fn allow(target: OverwriteTarget, allow: Permissions) -> Self {
        Self {
            target,
            allow,
            deny: Permissions::empty(),
        }
    }

    pub fn deny(target: OverwriteTarget, deny: Permissions) -> Self {
        Self {
            target,
            allow: Permissions::empty(),
            deny,
        }
    }
}

/// Overwrites for a freshly created log channel: hidden from @everyone,
/// readable by the bot. The @everyone role shares the guild's ID.
pub fn log_channel_overwrites(guild_id: Snowflake, bot_id: Snowflake) -> Vec<PermissionOverwrite> {
    vec![
        PermissionOverwrite::allow(OverwriteTarget::Member(bot_id), Permissions::VIEW_CHANNEL),
        PermissionOverwrite::deny(OverwriteTarget::Role(guild_id), Permissions::VIEW_CHANNEL),
    ]
}

/// Compute a member's effective permissions in a channel.
///
/// Algorithm (mirrors Discord):
///   1. Guild owner gets all permissions unconditionally.
///   2. If the guild-level permissions contain ADMINISTRATOR, return all.
///   3. Apply the `@everyone` role overwrite (allow OR, deny AND NOT).
///   4. OR all of the member's role allows, AND NOT all role denies.
///   5. Apply the member-specific overwrite.
pub fn compute_channel_permissions(
    guild_permissions: Permissions,
    overwrites: &[PermissionOverwrite],
    everyone_role_id: Snowflake,
    member_role_ids: &[Snowflake],
    member_id: Snowflake,
    is_owner: bool,
) -> Permissions {
    if is_owner || guild_permissions.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }

    let mut perms = guild_permissions;
    if overwrites.is_empty() {
        return perms;
    }

    for ov in overwrites {
        if ov.target == OverwriteTarget::Role(everyone_role_id) {
            perms |= ov.allow;
            perms &= !ov.deny;
        }
    }

    let mut role_allow = Permissions::empty();
    let mut role_deny = Permissions::empty();
    for ov in overwrites {
        if let OverwriteTarget::Role(role_id) = ov.target
            && role_id != everyone_role_id
            && member_role_ids.contains(&role_id)
        {
            role_allow |= ov.allow;
            role_deny |= ov.deny;
        }
    }
    perms |= role_allow;
    perms &= !role_deny;

    for ov in overwrites {
        if ov.target == OverwriteTarget::Member(member_id) {
            perms |= ov.allow;
            perms &= !ov.deny;
        }
    }

    perms
}

/// Serialize permission sets as raw bits.
pub mod bits {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Permissions;

    pub fn serialize<S: Serializer>(perms: &Permissions, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(perms.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Permissions, D::Error> {
        let raw = u64::deserialize(d)?;
        Ok(Permissions::from_bits_truncate(raw))
    }
}
