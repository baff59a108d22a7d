//! Domain model structs persisted in (or assembled from) the SQLite
//! database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the
//! HTTP layer.

use serde::{Deserialize, Serialize};

use palaver_shared::{ChannelKind, GroupId, MessageId, Role, Timestamp, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.  The password digest never leaves the store.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub handle: String,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Group / membership
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub creator_id: UserId,
    pub created_at: Timestamp,
}

/// One row of `ListUserGroups`: a group plus the caller's role in it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroupSummary {
    pub id: GroupId,
    pub name: String,
    pub role: Role,
}

/// One row of `ListGroupMembers`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Member {
    pub handle: String,
    pub role: Role,
    pub joined_at: Timestamp,
}

/// Result of `CheckGroupAccess`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct GroupAccess {
    pub has_access: bool,
    pub group_exists: bool,
}

/// Result of `leave_group`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub group_deleted: bool,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A message as returned to polling clients: author resolved to a display
/// name, attachments grouped under the message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub kind: ChannelKind,
    pub author_id: UserId,
    /// Resolved handle; the System sentinel resolves to "System".
    pub author: String,
    pub body: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub attachments: Vec<Attachment>,
}

/// An attachment reference: content-addressed bytes plus display metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub content_hash: String,
    pub mime_type: String,
    pub file_name: String,
}

/// One page of `fetch_since`.  `cursor` is the maximum timestamp observed,
/// or the input cursor when the page is empty; it never regresses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncPage {
    pub messages: Vec<Message>,
    pub cursor: Timestamp,
}

/// One row of `fetch_edited_since`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EditedMessage {
    pub id: MessageId,
    pub body: String,
    pub updated_at: Timestamp,
}

/// One distinct private-chat partner, most recent activity first.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PrivateChat {
    pub handle: String,
    pub last_activity: Timestamp,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchHit {
    pub id: MessageId,
    pub author: String,
    pub body: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchPage {
    pub results: Vec<SearchHit>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}
