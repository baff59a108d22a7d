//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `users`, `groups`, `group_members`,
//! `messages` (one table for all three channel kinds, discriminated by
//! `kind`), and `attachments`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
-- Id 0 is reserved for the System author of group notices; no row
-- exists for it, author names are resolved with a LEFT JOIN.
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    handle        TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    INTEGER NOT NULL              -- ms Unix time
);

-- ----------------------------------------------------------------
-- Groups
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS groups (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL UNIQUE,
    creator_id INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

-- ----------------------------------------------------------------
-- Group memberships
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS group_members (
    group_id  INTEGER NOT NULL,
    user_id   INTEGER NOT NULL,
    role      TEXT NOT NULL CHECK (role IN ('owner', 'admin', 'member')),
    joined_at INTEGER NOT NULL,

    PRIMARY KEY (group_id, user_id),
    FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Messages (unified across channel kinds)
-- ----------------------------------------------------------------
-- general: group_id and receiver_id are NULL
-- group:   group_id set
-- private: receiver_id set; the channel is the unordered
--          (author_id, receiver_id) pair, queried in both directions
CREATE TABLE IF NOT EXISTS messages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    kind        TEXT NOT NULL CHECK (kind IN ('general', 'group', 'private')),
    group_id    INTEGER,
    author_id   INTEGER NOT NULL,               -- 0 = System
    receiver_id INTEGER,
    body        TEXT NOT NULL,
    created_at  INTEGER NOT NULL,               -- ms Unix time
    updated_at  INTEGER NOT NULL                -- = created_at until edited
);

CREATE INDEX IF NOT EXISTS idx_messages_kind_created
    ON messages(kind, created_at);

CREATE INDEX IF NOT EXISTS idx_messages_group_created
    ON messages(group_id, created_at);

CREATE INDEX IF NOT EXISTS idx_messages_private_pair
    ON messages(author_id, receiver_id, created_at);

-- ----------------------------------------------------------------
-- Attachment associations
-- ----------------------------------------------------------------
-- Bytes live in the content-addressed vault on disk; the same
-- content_hash may be linked to many messages and display names.
CREATE TABLE IF NOT EXISTS attachments (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    kind         TEXT NOT NULL,
    message_id   INTEGER NOT NULL,
    content_hash TEXT NOT NULL,
    mime_type    TEXT NOT NULL,
    file_name    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_attachments_message
    ON attachments(kind, message_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
