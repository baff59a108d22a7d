//! Attachment association rows.
//!
//! The bytes themselves live in the content-addressed vault on disk; the
//! store only records which messages reference which content hash, and
//! under what display name.  Insertion happens inside `append`'s
//! transaction; this module covers the read side.

use rusqlite::params;

use palaver_shared::{ChannelKind, MessageId};

use crate::database::Database;
use crate::error::Result;
use crate::models::Attachment;

impl Database {
    /// Attachment references linked to one message.
    pub fn attachments_for(&self, kind: ChannelKind, message_id: MessageId) -> Result<Vec<Attachment>> {
        let mut stmt = self.conn().prepare(
            "SELECT content_hash, mime_type, file_name
             FROM attachments
             WHERE kind = ?1 AND message_id = ?2
             ORDER BY id",
        )?;

        let rows = stmt.query_map(params![kind.as_str(), message_id], |row| {
            Ok(Attachment {
                content_hash: row.get(0)?,
                mime_type: row.get(1)?,
                file_name: row.get(2)?,
            })
        })?;

        let mut attachments = Vec::new();
        for row in rows {
            attachments.push(row?);
        }
        Ok(attachments)
    }

    /// Whether any message still references this content hash.  Used to
    /// decide if vault bytes may be reclaimed.
    pub fn content_hash_referenced(&self, content_hash: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM attachments WHERE content_hash = ?1",
            params![content_hash],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
