//! The unified message lifecycle across the three channel kinds, plus the
//! sync-cursor read model polling clients converge on.
//!
//! One `messages` table holds general, group and private traffic,
//! discriminated by `kind`; all fetch/edit/delete logic is written once
//! against a [`Channel`] value instead of being triplicated per kind.
//!
//! Authorization matrix for edit/delete:
//! - general / private: only the original author
//! - group: the author, or any member holding `owner` or `admin`
//!
//! Posting into a group deliberately does not re-check membership at write
//! time; access is enforced on read.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use palaver_shared::constants::MAX_BODY_SIZE;
use palaver_shared::{Channel, ChannelKind, MessageId, Role, Timestamp, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::groups::{group_exists, handle_of, role_of};
use crate::models::{
    Attachment, EditedMessage, Message, PrivateChat, SearchHit, SearchPage, SyncPage,
};

impl Database {
    /// Append a message to a channel.  Returns the new message id.
    ///
    /// Rejects an empty body with no attachments ("nothing to save"); the
    /// HTTP layer may choose to treat that case as a no-op success.
    pub fn append(
        &mut self,
        channel: Channel,
        author: UserId,
        body: &str,
        attachments: &[Attachment],
    ) -> Result<MessageId> {
        if body.is_empty() && attachments.is_empty() {
            return Err(StoreError::validation("nothing to save"));
        }
        if body.len() > MAX_BODY_SIZE {
            return Err(StoreError::validation("message body too large"));
        }

        let now = self.next_timestamp();
        let tx = self.conn_mut().transaction()?;

        let id = match channel {
            Channel::General => {
                tx.execute(
                    "INSERT INTO messages (kind, author_id, body, created_at, updated_at)
                     VALUES ('general', ?1, ?2, ?3, ?3)",
                    params![author, body, now],
                )?;
                tx.last_insert_rowid()
            }
            Channel::Group(gid) => {
                if !group_exists(&tx, gid)? {
                    return Err(StoreError::NotFound("group"));
                }
                // Membership is intentionally not checked here.
                tx.execute(
                    "INSERT INTO messages (kind, group_id, author_id, body, created_at, updated_at)
                     VALUES ('group', ?1, ?2, ?3, ?4, ?4)",
                    params![gid, author, body, now],
                )?;
                tx.last_insert_rowid()
            }
            Channel::Private { a, b } => {
                if !channel.is_participant(author) {
                    return Err(StoreError::authorization(
                        "not a participant of this private channel",
                    ));
                }
                let receiver = if author == a { b } else { a };
                if handle_of(&tx, receiver)?.is_none() {
                    return Err(StoreError::NotFound("user"));
                }
                tx.execute(
                    "INSERT INTO messages (kind, author_id, receiver_id, body, created_at, updated_at)
                     VALUES ('private', ?1, ?2, ?3, ?4, ?4)",
                    params![author, receiver, body, now],
                )?;
                tx.last_insert_rowid()
            }
        };

        for att in attachments {
            tx.execute(
                "INSERT INTO attachments (kind, message_id, content_hash, mime_type, file_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    channel.kind().as_str(),
                    id,
                    att.content_hash,
                    att.mime_type,
                    att.file_name
                ],
            )?;
        }

        tx.commit()?;

        tracing::debug!(id, kind = %channel.kind(), "message appended");
        Ok(id)
    }

    /// All messages in the channel created strictly after `cursor`,
    /// ascending by `(created_at, id)`, attachments grouped per message.
    ///
    /// The returned cursor is the maximum timestamp observed, or the input
    /// cursor when there are no results; it never regresses.
    pub fn fetch_since(&self, channel: Channel, cursor: Timestamp) -> Result<SyncPage> {
        let mut values: Vec<Value> = Vec::new();
        let clause = channel_clause(&channel, &mut values);
        values.push(cursor.into());

        let sql = format!(
            "SELECT m.id, m.kind, m.author_id,
                    CASE WHEN m.author_id = 0 THEN 'System'
                         ELSE COALESCE(u.handle, 'System') END AS author,
                    m.body, m.created_at, m.updated_at,
                    a.content_hash, a.mime_type, a.file_name
             FROM messages m
             LEFT JOIN users u ON u.id = m.author_id
             LEFT JOIN attachments a ON a.message_id = m.id AND a.kind = m.kind
             WHERE {clause} AND m.created_at > ?
             ORDER BY m.created_at, m.id"
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;

        // One row per (message, attachment); fold attachments under their
        // message, preserving query order.
        let mut messages: Vec<Message> = Vec::new();
        while let Some(row) = rows.next()? {
            let id: MessageId = row.get(0)?;
            if messages.last().map(|m| m.id) != Some(id) {
                let kind: String = row.get(1)?;
                messages.push(Message {
                    id,
                    kind: ChannelKind::parse(&kind).unwrap_or(ChannelKind::General),
                    author_id: row.get(2)?,
                    author: row.get(3)?,
                    body: row.get(4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                    attachments: Vec::new(),
                });
            }
            let content_hash: Option<String> = row.get(7)?;
            if let (Some(content_hash), Some(message)) = (content_hash, messages.last_mut()) {
                message.attachments.push(Attachment {
                    content_hash,
                    mime_type: row.get(8)?,
                    file_name: row.get(9)?,
                });
            }
        }

        let new_cursor = messages
            .iter()
            .map(|m| m.created_at)
            .max()
            .unwrap_or(cursor);

        Ok(SyncPage {
            messages,
            cursor: new_cursor,
        })
    }

    /// Messages whose *modification* timestamp exceeds the cursor,
    /// regardless of creation time -- how a polling client discovers
    /// in-place edits to messages it already cached.
    pub fn fetch_edited_since(
        &self,
        channel: Channel,
        cursor: Timestamp,
    ) -> Result<Vec<EditedMessage>> {
        let mut values: Vec<Value> = Vec::new();
        let clause = channel_clause(&channel, &mut values);
        values.push(cursor.into());

        let sql = format!(
            "SELECT m.id, m.body, m.updated_at
             FROM messages m
             WHERE {clause} AND m.updated_at > ?
             ORDER BY m.updated_at, m.id"
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok(EditedMessage {
                id: row.get(0)?,
                body: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;

        let mut edited = Vec::new();
        for row in rows {
            edited.push(row?);
        }
        Ok(edited)
    }

    /// Given a client-held set of message ids, return the subset still
    /// present in the channel.  Ids absent from the result were deleted.
    pub fn reconcile_existence(
        &self,
        channel: Channel,
        candidate_ids: &[MessageId],
    ) -> Result<Vec<MessageId>> {
        if candidate_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut values: Vec<Value> = Vec::new();
        let clause = channel_clause(&channel, &mut values);
        let placeholders = vec!["?"; candidate_ids.len()].join(", ");
        for id in candidate_ids {
            values.push((*id).into());
        }

        let sql = format!(
            "SELECT m.id FROM messages m
             WHERE {clause} AND m.id IN ({placeholders})
             ORDER BY m.id"
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| row.get(0))?;

        let mut existing = Vec::new();
        for row in rows {
            existing.push(row?);
        }
        Ok(existing)
    }

    /// Edit a message in place.  Only `updated_at` moves; the message never
    /// changes channel and no new row is created.
    pub fn edit(
        &mut self,
        channel: Channel,
        id: MessageId,
        actor: UserId,
        new_body: &str,
    ) -> Result<()> {
        if new_body.is_empty() {
            return Err(StoreError::validation("message text must not be empty"));
        }
        if new_body.len() > MAX_BODY_SIZE {
            return Err(StoreError::validation("message body too large"));
        }

        let now = self.next_timestamp();
        let tx = self.conn_mut().transaction()?;

        authorize_mutation(&tx, &channel, id, actor)?;

        tx.execute(
            "UPDATE messages SET body = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_body, now, id],
        )?;

        tx.commit()?;

        tracing::debug!(id, actor, "message edited");
        Ok(())
    }

    /// Hard-delete a message and cascade its attachment rows.
    pub fn delete(&mut self, channel: Channel, id: MessageId, actor: UserId) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        authorize_mutation(&tx, &channel, id, actor)?;

        tx.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
        tx.execute(
            "DELETE FROM attachments WHERE kind = ?1 AND message_id = ?2",
            params![channel.kind().as_str(), id],
        )?;

        tx.commit()?;

        tracing::debug!(id, actor, "message deleted");
        Ok(())
    }

    /// Distinct private-chat partners of `user`, most recent activity first.
    pub fn list_private_chats(&self, user: UserId) -> Result<Vec<PrivateChat>> {
        let mut stmt = self.conn().prepare(
            "SELECT CASE WHEN m.author_id = ?1 THEN ru.handle ELSE au.handle END AS partner,
                    MAX(m.created_at) AS last_activity
             FROM messages m
             JOIN users au ON au.id = m.author_id
             JOIN users ru ON ru.id = m.receiver_id
             WHERE m.kind = 'private' AND (m.author_id = ?1 OR m.receiver_id = ?1)
             GROUP BY partner
             ORDER BY last_activity DESC",
        )?;

        let rows = stmt.query_map(params![user], |row| {
            Ok(PrivateChat {
                handle: row.get(0)?,
                last_activity: row.get(1)?,
            })
        })?;

        let mut chats = Vec::new();
        for row in rows {
            chats.push(row?);
        }
        Ok(chats)
    }

    /// Substring search within one channel, newest first, paginated.
    pub fn search(
        &self,
        channel: Channel,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage> {
        let query = query.trim();
        if query.is_empty() {
            return Err(StoreError::validation("search query is required"));
        }

        let page = page.max(1);
        let per_page = per_page.clamp(1, 50);
        // Widen before multiplying: a client-supplied page near u32::MAX
        // must not overflow the offset computation.
        let offset = (page as i64 - 1) * per_page as i64;
        let pattern = format!("%{query}%");

        let mut values: Vec<Value> = Vec::new();
        let clause = channel_clause(&channel, &mut values);

        let count_sql = format!(
            "SELECT COUNT(*) FROM messages m WHERE {clause} AND m.body LIKE ?"
        );
        let mut count_values = values.clone();
        count_values.push(pattern.clone().into());
        let total: u64 = self
            .conn()
            .query_row(&count_sql, params_from_iter(count_values), |row| row.get(0))?;

        let sql = format!(
            "SELECT m.id,
                    CASE WHEN m.author_id = 0 THEN 'System'
                         ELSE COALESCE(u.handle, 'System') END AS author,
                    m.body, m.created_at
             FROM messages m
             LEFT JOIN users u ON u.id = m.author_id
             WHERE {clause} AND m.body LIKE ?
             ORDER BY m.created_at DESC
             LIMIT ? OFFSET ?"
        );
        values.push(pattern.into());
        values.push((per_page as i64).into());
        values.push(offset.into());

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok(SearchHit {
                id: row.get(0)?,
                author: row.get(1)?,
                body: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(SearchPage {
            results,
            total,
            page,
            per_page,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build the WHERE fragment scoping a query to one channel, pushing its
/// bind values in order.  All queries use positional `?` placeholders, so
/// channel values must be pushed before any trailing parameters.
fn channel_clause(channel: &Channel, values: &mut Vec<Value>) -> String {
    match channel {
        Channel::General => "m.kind = 'general'".to_string(),
        Channel::Group(gid) => {
            values.push((*gid).into());
            "m.kind = 'group' AND m.group_id = ?".to_string()
        }
        Channel::Private { a, b } => {
            values.push((*a).into());
            values.push((*b).into());
            values.push((*b).into());
            values.push((*a).into());
            "m.kind = 'private' AND ((m.author_id = ? AND m.receiver_id = ?) \
             OR (m.author_id = ? AND m.receiver_id = ?))"
                .to_string()
        }
    }
}

/// Check-then-mutate guard for edit/delete, executed inside the caller's
/// transaction.  Returns `NotFound` when the id does not exist in the
/// target channel.
fn authorize_mutation(
    conn: &Connection,
    channel: &Channel,
    id: MessageId,
    actor: UserId,
) -> Result<()> {
    let mut values: Vec<Value> = Vec::new();
    let clause = channel_clause(channel, &mut values);
    values.push(id.into());

    let sql = format!("SELECT m.author_id FROM messages m WHERE {clause} AND m.id = ?");
    let author: Option<UserId> = conn
        .query_row(&sql, params_from_iter(values), |row| row.get(0))
        .optional()?;

    let author = author.ok_or(StoreError::NotFound("message"))?;

    match channel {
        Channel::General | Channel::Private { .. } => {
            if author != actor {
                return Err(StoreError::authorization(
                    "only the author can modify this message",
                ));
            }
        }
        Channel::Group(gid) => match role_of(conn, *gid, actor)? {
            None => {
                return Err(StoreError::authorization("not a member of this group"));
            }
            Some(Role::Owner) | Some(Role::Admin) => {}
            Some(Role::Member) => {
                if author != actor {
                    return Err(StoreError::authorization(
                        "only the author can modify this message",
                    ));
                }
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::error::StoreError;

    fn setup() -> (Database, UserId, UserId, UserId) {
        let db = Database::open_in_memory().unwrap();
        let u1 = db.create_user("u1", "d").unwrap();
        let u2 = db.create_user("u2", "d").unwrap();
        let u3 = db.create_user("u3", "d").unwrap();
        (db, u1, u2, u3)
    }

    #[test]
    fn append_fetch_round_trip() {
        let (mut db, u1, _, _) = setup();
        db.append(Channel::General, u1, "hello world", &[]).unwrap();

        let page = db.fetch_since(Channel::General, 0).unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].body, "hello world");
        assert_eq!(page.messages[0].author, "u1");
        assert!(page.cursor > 0);
    }

    #[test]
    fn nothing_to_save_rejected() {
        let (mut db, u1, _, _) = setup();
        let err = db.append(Channel::General, u1, "", &[]).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn attachment_only_message_allowed() {
        let (mut db, u1, _, _) = setup();
        let att = Attachment {
            content_hash: "ab".repeat(32),
            mime_type: "image/png".into(),
            file_name: "cat.png".into(),
        };
        let id = db
            .append(Channel::General, u1, "", std::slice::from_ref(&att))
            .unwrap();

        let page = db.fetch_since(Channel::General, 0).unwrap();
        assert_eq!(page.messages[0].id, id);
        assert_eq!(page.messages[0].attachments, vec![att]);
    }

    #[test]
    fn fetch_since_is_idempotent_and_ordered() {
        let (mut db, u1, u2, _) = setup();
        db.append(Channel::General, u1, "one", &[]).unwrap();
        db.append(Channel::General, u2, "two", &[]).unwrap();
        db.append(Channel::General, u1, "three", &[]).unwrap();

        let first = db.fetch_since(Channel::General, 0).unwrap();
        let second = db.fetch_since(Channel::General, 0).unwrap();
        assert_eq!(first, second);

        let stamps: Vec<_> = first.messages.iter().map(|m| (m.created_at, m.id)).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn cursor_never_regresses() {
        let (mut db, u1, _, _) = setup();
        db.append(Channel::General, u1, "one", &[]).unwrap();

        let page = db.fetch_since(Channel::General, 0).unwrap();
        let empty = db.fetch_since(Channel::General, page.cursor).unwrap();
        assert!(empty.messages.is_empty());
        assert_eq!(empty.cursor, page.cursor);
    }

    #[test]
    fn group_append_requires_existing_group() {
        let (mut db, u1, _, _) = setup();
        let err = db.append(Channel::Group(999), u1, "hi", &[]).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("group")));
    }

    #[test]
    fn group_append_does_not_check_membership() {
        // Posting does not re-validate membership at write time.
        let (mut db, u1, u2, _) = setup();
        let gid = db.create_group("Team", u1).unwrap();

        db.append(Channel::Group(gid), u2, "outsider post", &[])
            .unwrap();
    }

    #[test]
    fn group_edit_authorization_matrix() {
        // Scenario B: a plain member cannot edit another's message; the
        // owner can edit any message, which bumps updated_at.
        let (mut db, u1, u2, _) = setup();
        let gid = db.create_group("Team", u1).unwrap();
        db.add_member(u1, gid, u2, Role::Member).unwrap();

        let id = db.append(Channel::Group(gid), u1, "original", &[]).unwrap();
        let before = db.fetch_since(Channel::Group(gid), 0).unwrap();
        let old_ts = before
            .messages
            .iter()
            .find(|m| m.id == id)
            .unwrap()
            .updated_at;

        let err = db.edit(Channel::Group(gid), id, u2, "x").unwrap_err();
        assert!(matches!(err, StoreError::Authorization(_)));

        db.edit(Channel::Group(gid), id, u1, "fixed").unwrap();

        let edited = db.fetch_edited_since(Channel::Group(gid), old_ts).unwrap();
        assert!(edited.iter().any(|e| e.id == id && e.body == "fixed"));
        assert!(edited.iter().all(|e| e.updated_at > old_ts));
    }

    #[test]
    fn admin_edits_any_group_message() {
        let (mut db, u1, u2, u3) = setup();
        let gid = db.create_group("Team", u1).unwrap();
        db.add_member(u1, gid, u2, Role::Admin).unwrap();
        db.add_member(u1, gid, u3, Role::Member).unwrap();

        let id = db.append(Channel::Group(gid), u3, "typo", &[]).unwrap();
        db.edit(Channel::Group(gid), id, u2, "fixed").unwrap();
    }

    #[test]
    fn member_edits_own_group_message() {
        let (mut db, u1, u2, _) = setup();
        let gid = db.create_group("Team", u1).unwrap();
        db.add_member(u1, gid, u2, Role::Member).unwrap();

        let id = db.append(Channel::Group(gid), u2, "mine", &[]).unwrap();
        db.edit(Channel::Group(gid), id, u2, "still mine").unwrap();
    }

    #[test]
    fn non_member_cannot_edit_group_message() {
        let (mut db, u1, _, u3) = setup();
        let gid = db.create_group("Team", u1).unwrap();
        let id = db.append(Channel::Group(gid), u1, "post", &[]).unwrap();

        let err = db.edit(Channel::Group(gid), id, u3, "x").unwrap_err();
        assert!(matches!(err, StoreError::Authorization(_)));
    }

    #[test]
    fn general_edit_is_author_only() {
        let (mut db, u1, u2, _) = setup();
        let id = db.append(Channel::General, u1, "post", &[]).unwrap();

        let err = db.edit(Channel::General, id, u2, "x").unwrap_err();
        assert!(matches!(err, StoreError::Authorization(_)));
        db.edit(Channel::General, id, u1, "updated").unwrap();
    }

    #[test]
    fn edit_empty_body_rejected() {
        let (mut db, u1, _, _) = setup();
        let id = db.append(Channel::General, u1, "post", &[]).unwrap();

        let err = db.edit(Channel::General, id, u1, "").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn edit_preserves_created_at() {
        let (mut db, u1, _, _) = setup();
        let id = db.append(Channel::General, u1, "post", &[]).unwrap();
        let created = db.fetch_since(Channel::General, 0).unwrap().messages[0].created_at;

        db.edit(Channel::General, id, u1, "edited").unwrap();

        let msg = &db.fetch_since(Channel::General, 0).unwrap().messages[0];
        assert_eq!(msg.created_at, created);
        assert!(msg.updated_at > created);
    }

    #[test]
    fn delete_nonexistent_is_not_found() {
        // Scenario E: never an unhandled fault.
        let (mut db, u1, _, _) = setup();
        let err = db.delete(Channel::General, 12345, u1).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("message")));
    }

    #[test]
    fn delete_cascades_attachments() {
        let (mut db, u1, _, _) = setup();
        let att = Attachment {
            content_hash: "cd".repeat(32),
            mime_type: "text/plain".into(),
            file_name: "notes.txt".into(),
        };
        let id = db
            .append(Channel::General, u1, "with file", &[att])
            .unwrap();

        db.delete(Channel::General, id, u1).unwrap();

        assert!(db
            .attachments_for(ChannelKind::General, id)
            .unwrap()
            .is_empty());
        let page = db.fetch_since(Channel::General, 0).unwrap();
        assert!(page.messages.is_empty());
    }

    #[test]
    fn reconcile_reports_survivors() {
        let (mut db, u1, _, _) = setup();
        let id1 = db.append(Channel::General, u1, "one", &[]).unwrap();
        let id2 = db.append(Channel::General, u1, "two", &[]).unwrap();

        db.delete(Channel::General, id1, u1).unwrap();

        let existing = db
            .reconcile_existence(Channel::General, &[id1, id2, 999])
            .unwrap();
        assert_eq!(existing, vec![id2]);
    }

    #[test]
    fn reconcile_empty_input() {
        let (db, _, _, _) = setup();
        assert!(db.reconcile_existence(Channel::General, &[]).unwrap().is_empty());
    }

    #[test]
    fn private_channel_round_trip() {
        // Scenario C: both participants see the message; a third party's
        // own private channels never contain it.
        let (mut db, u1, u2, u3) = setup();
        db.append(Channel::private(u1, u2), u1, "hi", &[]).unwrap();

        let for_u1 = db.fetch_since(Channel::private(u1, u2), 0).unwrap();
        let for_u2 = db.fetch_since(Channel::private(u2, u1), 0).unwrap();
        assert_eq!(for_u1.messages.len(), 1);
        assert_eq!(for_u1.messages[0].body, "hi");
        assert_eq!(for_u1, for_u2);

        let for_u3 = db.fetch_since(Channel::private(u3, u1), 0).unwrap();
        assert!(for_u3.messages.is_empty());
    }

    #[test]
    fn private_append_requires_known_receiver() {
        let (mut db, u1, _, _) = setup();
        let err = db
            .append(Channel::private(u1, 999), u1, "hi", &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("user")));
    }

    #[test]
    fn private_append_requires_participant_author() {
        let (mut db, u1, u2, u3) = setup();
        let err = db
            .append(Channel::private(u1, u2), u3, "hi", &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::Authorization(_)));
    }

    #[test]
    fn private_chats_ordered_by_activity() {
        let (mut db, u1, u2, u3) = setup();
        db.append(Channel::private(u1, u2), u1, "first", &[]).unwrap();
        db.append(Channel::private(u1, u3), u3, "second", &[]).unwrap();

        let chats = db.list_private_chats(u1).unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].handle, "u3");
        assert_eq!(chats[1].handle, "u2");
    }

    #[test]
    fn search_scoped_and_paginated() {
        let (mut db, u1, _, _) = setup();
        for i in 0..5 {
            db.append(Channel::General, u1, &format!("needle {i}"), &[])
                .unwrap();
        }
        db.append(Channel::General, u1, "hay", &[]).unwrap();

        let page1 = db.search(Channel::General, "needle", 1, 2).unwrap();
        assert_eq!(page1.total, 5);
        assert_eq!(page1.results.len(), 2);
        // Newest first.
        assert_eq!(page1.results[0].body, "needle 4");

        let page3 = db.search(Channel::General, "needle", 3, 2).unwrap();
        assert_eq!(page3.results.len(), 1);
    }

    #[test]
    fn search_page_far_past_the_end_is_empty() {
        let (mut db, u1, _, _) = setup();
        db.append(Channel::General, u1, "needle", &[]).unwrap();

        let page = db.search(Channel::General, "needle", u32::MAX, 50).unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn search_requires_query() {
        let (db, _, _, _) = setup();
        let err = db.search(Channel::General, "   ", 1, 20).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn system_notices_appear_in_group_feed() {
        let (mut db, u1, u2, _) = setup();
        let gid = db.create_group("Team", u1).unwrap();
        db.add_member(u1, gid, u2, Role::Member).unwrap();

        let page = db.fetch_since(Channel::Group(gid), 0).unwrap();
        assert!(page
            .messages
            .iter()
            .any(|m| m.author == "System" && m.body.contains("u2")));
    }
}
