//! Account rows: registration lookups and credential retrieval.
//!
//! Password hashing itself lives in the server crate; the store only ever
//! sees opaque digests.

use rusqlite::{params, OptionalExtension};

use palaver_shared::UserId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

impl Database {
    /// Insert a new user.  The handle must be unique.
    pub fn create_user(&self, handle: &str, password_hash: &str) -> Result<UserId> {
        if handle.trim().is_empty() {
            return Err(StoreError::validation("handle must not be empty"));
        }

        let created_at = self.next_timestamp();
        let inserted = self.conn().execute(
            "INSERT INTO users (handle, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![handle, password_hash, created_at],
        );

        match inserted {
            Ok(_) => Ok(self.conn().last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::conflict("handle is already taken"))
            }
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Resolve a handle to a user id.
    pub fn user_id_by_handle(&self, handle: &str) -> Result<Option<UserId>> {
        let id = self
            .conn()
            .query_row(
                "SELECT id FROM users WHERE handle = ?1",
                params![handle],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn user_by_id(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, handle, created_at FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        handle: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("user"),
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch `(id, password_hash)` for login verification.
    pub fn credentials_by_handle(&self, handle: &str) -> Result<Option<(UserId, String)>> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, password_hash FROM users WHERE handle = ?1",
                params![handle],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    /// Every registered handle, alphabetical.  The general channel has no
    /// membership table; its roster is simply the user list.
    pub fn list_users(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT handle FROM users ORDER BY handle")?;

        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut handles = Vec::new();
        for row in rows {
            handles.push(row?);
        }
        Ok(handles)
    }

    /// Substring search over handles, excluding the caller.
    pub fn search_users(&self, query: &str, exclude: UserId) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT handle FROM users
             WHERE handle LIKE ?1 AND id != ?2
             ORDER BY handle
             LIMIT 10",
        )?;

        let rows = stmt.query_map(params![format!("%{query}%"), exclude], |row| row.get(0))?;

        let mut handles = Vec::new();
        for row in rows {
            handles.push(row?);
        }
        Ok(handles)
    }
}

/// Whether a rusqlite error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(info, _)
            if info.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use crate::database::Database;
    use crate::error::StoreError;

    #[test]
    fn create_and_resolve() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user("alice", "digest").unwrap();

        assert_eq!(db.user_id_by_handle("alice").unwrap(), Some(id));
        assert_eq!(db.user_id_by_handle("bob").unwrap(), None);
        assert_eq!(db.user_by_id(id).unwrap().handle, "alice");
    }

    #[test]
    fn duplicate_handle_conflicts() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("alice", "digest").unwrap();

        let err = db.create_user("alice", "digest2").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn empty_handle_rejected() {
        let db = Database::open_in_memory().unwrap();
        let err = db.create_user("  ", "digest").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn list_users_is_alphabetical() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("carol", "d").unwrap();
        db.create_user("alice", "d").unwrap();
        db.create_user("bob", "d").unwrap();

        assert_eq!(
            db.list_users().unwrap(),
            vec!["alice".to_string(), "bob".into(), "carol".into()]
        );
    }

    #[test]
    fn search_excludes_caller() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("alice", "d").unwrap();
        db.create_user("alina", "d").unwrap();
        db.create_user("bob", "d").unwrap();

        let found = db.search_users("ali", alice).unwrap();
        assert_eq!(found, vec!["alina".to_string()]);
    }
}
