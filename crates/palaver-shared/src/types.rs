use serde::{Deserialize, Serialize};

use crate::constants::SYSTEM_USER_ID;

/// Row id of a registered user. Id 0 is reserved for the System author.
pub type UserId = i64;

/// Row id of a group.
pub type GroupId = i64;

/// Row id of a message.
pub type MessageId = i64;

/// Millisecond Unix timestamp used for sync cursors.
pub type Timestamp = i64;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Privilege level of one membership within one group.
///
/// Variant order matters: `Member < Admin < Owner`, so `>=` comparisons
/// express "at least this role".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Role::Member),
            "admin" => Some(Role::Admin),
            "owner" => Some(Role::Owner),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Discriminator stored in the unified `messages` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    General,
    Group,
    Private,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::General => "general",
            ChannelKind::Group => "group",
            ChannelKind::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "general" => Some(ChannelKind::General),
            "group" => Some(ChannelKind::Group),
            "private" => Some(ChannelKind::Private),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical scope a message belongs to.
///
/// A private channel is identified by the *unordered* pair of participants;
/// [`Channel::private`] normalizes the pair so `(a, b)` and `(b, a)` compare
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    General,
    Group(GroupId),
    Private { a: UserId, b: UserId },
}

impl Channel {
    /// Build a private channel from two participants in either order.
    pub fn private(x: UserId, y: UserId) -> Self {
        Channel::Private {
            a: x.min(y),
            b: x.max(y),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            Channel::General => ChannelKind::General,
            Channel::Group(_) => ChannelKind::Group,
            Channel::Private { .. } => ChannelKind::Private,
        }
    }

    /// Whether `user` may read this channel. General is open to everyone;
    /// group access is checked separately against the membership table.
    pub fn is_participant(&self, user: UserId) -> bool {
        match self {
            Channel::General => true,
            Channel::Group(_) => true,
            Channel::Private { a, b } => user == *a || user == *b,
        }
    }
}

/// Whether `author` resolves to the System sentinel.
pub fn is_system_author(author: UserId) -> bool {
    author == SYSTEM_USER_ID
}
