//! Group membership and the role state machine.
//!
//! Role lattice: `owner > admin > member`, plus the implicit non-member
//! state.  Every mutating operation runs as a single transaction that
//! re-reads the actor's current role, validates the transition, and applies
//! it, so a role revoked concurrently can never authorize a stale change.
//!
//! A live group always has exactly one `owner` row; the only path that
//! destroys a group is its owner leaving.

use rusqlite::{params, Connection, OptionalExtension};

use palaver_shared::constants::SYSTEM_USER_ID;
use palaver_shared::{GroupId, Role, Timestamp, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{GroupAccess, GroupSummary, LeaveOutcome, Member};
use crate::users::is_unique_violation;

impl Database {
    /// Create a group; the creator becomes its owner in the same
    /// transaction.
    pub fn create_group(&mut self, name: &str, creator: UserId) -> Result<GroupId> {
        if name.trim().is_empty() {
            return Err(StoreError::validation("group name must not be empty"));
        }

        let now = self.next_timestamp();
        let tx = self.conn_mut().transaction()?;

        let inserted = tx.execute(
            "INSERT INTO groups (name, creator_id, created_at) VALUES (?1, ?2, ?3)",
            params![name, creator, now],
        );
        if let Err(e) = inserted {
            return if is_unique_violation(&e) {
                Err(StoreError::conflict("group name is already taken"))
            } else {
                Err(StoreError::Sqlite(e))
            };
        }
        let group_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO group_members (group_id, user_id, role, joined_at)
             VALUES (?1, ?2, 'owner', ?3)",
            params![group_id, creator, now],
        )?;

        tx.commit()?;

        tracing::info!(group_id, creator, "group created");
        Ok(group_id)
    }

    /// Add `target` to the group.  Requires an `owner` or `admin` actor;
    /// granting `owner` on entry is an ownership transfer and is reserved
    /// to the current owner.
    pub fn add_member(
        &mut self,
        actor: UserId,
        group: GroupId,
        target: UserId,
        role: Role,
    ) -> Result<()> {
        if actor == target {
            return Err(StoreError::validation("cannot add yourself to a group"));
        }

        let now = self.next_timestamp();
        let tx = self.conn_mut().transaction()?;

        let actor_role = require(&tx, actor, group, Role::Admin)?;

        let target_handle = handle_of(&tx, target)?.ok_or(StoreError::NotFound("user"))?;

        if role_of(&tx, group, target)?.is_some() {
            return Err(StoreError::conflict("user is already a member"));
        }

        if role == Role::Owner {
            if actor_role != Role::Owner {
                return Err(StoreError::authorization(
                    "only the owner can add a member as owner",
                ));
            }
            // Keep the single-owner invariant: the current owner steps down.
            tx.execute(
                "UPDATE group_members SET role = 'admin'
                 WHERE group_id = ?1 AND role = 'owner'",
                params![group],
            )?;
        }

        tx.execute(
            "INSERT INTO group_members (group_id, user_id, role, joined_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![group, target, role.as_str(), now],
        )?;

        insert_notice(
            &tx,
            group,
            &format!("{target_handle} was added to the group"),
            now,
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Remove `target` from the group.  Admins may only remove plain
    /// members; the owner may remove anyone but themselves (self-removal
    /// goes through [`Database::leave_group`]).
    pub fn remove_member(&mut self, actor: UserId, group: GroupId, target: UserId) -> Result<()> {
        let now = self.next_timestamp();
        let tx = self.conn_mut().transaction()?;

        let actor_role = require(&tx, actor, group, Role::Admin)?;

        if actor == target {
            return Err(StoreError::validation(
                "use leave to remove yourself from a group",
            ));
        }

        let target_role =
            role_of(&tx, group, target)?.ok_or(StoreError::NotFound("membership"))?;

        match target_role {
            Role::Owner => {
                return Err(StoreError::authorization("the owner cannot be removed"));
            }
            Role::Admin if actor_role != Role::Owner => {
                return Err(StoreError::authorization(
                    "admins can only remove plain members",
                ));
            }
            _ => {}
        }

        let target_handle = handle_of(&tx, target)?.ok_or(StoreError::NotFound("user"))?;

        tx.execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group, target],
        )?;

        insert_notice(
            &tx,
            group,
            &format!("{target_handle} was removed from the group"),
            now,
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Change `target`'s role.  Any transition touching `owner` is reserved
    /// to the current owner; granting `owner` transfers ownership and
    /// demotes the previous owner to `admin` in the same transaction, so the
    /// group never momentarily has zero or two owners.
    pub fn change_role(
        &mut self,
        actor: UserId,
        group: GroupId,
        target: UserId,
        new_role: Role,
    ) -> Result<()> {
        let now = self.next_timestamp();
        let tx = self.conn_mut().transaction()?;

        let actor_role = require(&tx, actor, group, Role::Admin)?;

        if actor == target {
            return Err(StoreError::validation("cannot change your own role"));
        }

        let target_role =
            role_of(&tx, group, target)?.ok_or(StoreError::NotFound("membership"))?;

        if target_role == new_role {
            return Err(StoreError::conflict("user already has that role"));
        }

        let touches_owner = new_role == Role::Owner || target_role == Role::Owner;
        if touches_owner && actor_role != Role::Owner {
            return Err(StoreError::authorization(
                "only the owner can transfer ownership",
            ));
        }

        let target_handle = handle_of(&tx, target)?.ok_or(StoreError::NotFound("user"))?;

        if new_role == Role::Owner {
            // Ownership transfer: previous owner steps down to admin.
            tx.execute(
                "UPDATE group_members SET role = 'admin'
                 WHERE group_id = ?1 AND role = 'owner'",
                params![group],
            )?;
            tx.execute(
                "UPDATE group_members SET role = 'owner'
                 WHERE group_id = ?1 AND user_id = ?2",
                params![group, target],
            )?;
            insert_notice(
                &tx,
                group,
                &format!("{target_handle} is now the owner"),
                now,
            )?;
        } else {
            tx.execute(
                "UPDATE group_members SET role = ?1
                 WHERE group_id = ?2 AND user_id = ?3",
                params![new_role.as_str(), group, target],
            )?;
            insert_notice(
                &tx,
                group,
                &format!("{target_handle} is now a {new_role}"),
                now,
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Rename the group.  Requires `owner` or `admin`; the new name must be
    /// globally unique.
    pub fn rename_group(&mut self, actor: UserId, group: GroupId, new_name: &str) -> Result<()> {
        if new_name.trim().is_empty() {
            return Err(StoreError::validation("group name must not be empty"));
        }

        let now = self.next_timestamp();
        let tx = self.conn_mut().transaction()?;

        require(&tx, actor, group, Role::Admin)?;

        let taken: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM groups WHERE name = ?1 AND id != ?2",
                params![new_name, group],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(StoreError::conflict("group name is already taken"));
        }

        tx.execute(
            "UPDATE groups SET name = ?1 WHERE id = ?2",
            params![new_name, group],
        )?;

        insert_notice(&tx, group, &format!("Group renamed to '{new_name}'"), now)?;

        tx.commit()?;
        Ok(())
    }

    /// Leave the group.  When the owner leaves, the whole group is deleted
    /// (all memberships plus the group record) -- the only path by which a
    /// group is destroyed.  A system notice is emitted either way.
    pub fn leave_group(&mut self, actor: UserId, group: GroupId) -> Result<LeaveOutcome> {
        let now = self.next_timestamp();
        let tx = self.conn_mut().transaction()?;

        if !group_exists(&tx, group)? {
            return Err(StoreError::NotFound("group"));
        }

        let role = role_of(&tx, group, actor)?.ok_or(StoreError::NotFound("membership"))?;
        let handle = handle_of(&tx, actor)?.ok_or(StoreError::NotFound("user"))?;

        let group_deleted = if role == Role::Owner {
            tx.execute(
                "DELETE FROM group_members WHERE group_id = ?1",
                params![group],
            )?;
            tx.execute("DELETE FROM groups WHERE id = ?1", params![group])?;
            insert_notice(&tx, group, &format!("Group deleted by owner {handle}"), now)?;
            true
        } else {
            tx.execute(
                "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                params![group, actor],
            )?;
            insert_notice(&tx, group, &format!("{handle} left the group"), now)?;
            false
        };

        tx.commit()?;

        tracing::info!(group, actor, group_deleted, "left group");
        Ok(LeaveOutcome { group_deleted })
    }

    // ------------------------------------------------------------------
    // Read model
    // ------------------------------------------------------------------

    /// Groups the user belongs to, with their role, ordered by name.
    pub fn list_user_groups(&self, user: UserId) -> Result<Vec<GroupSummary>> {
        let mut stmt = self.conn().prepare(
            "SELECT g.id, g.name, gm.role
             FROM groups g
             JOIN group_members gm ON g.id = gm.group_id
             WHERE gm.user_id = ?1
             ORDER BY g.name",
        )?;

        let rows = stmt.query_map(params![user], |row| {
            let role: String = row.get(2)?;
            Ok(GroupSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                role: parse_role(&role, 2)?,
            })
        })?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }
        Ok(groups)
    }

    /// Members of a group: owner first, then admins, then members, each
    /// block ordered by join time.
    pub fn group_members(&self, group: GroupId) -> Result<Vec<Member>> {
        if !group_exists(self.conn(), group)? {
            return Err(StoreError::NotFound("group"));
        }

        let mut stmt = self.conn().prepare(
            "SELECT u.handle, gm.role, gm.joined_at
             FROM group_members gm
             JOIN users u ON gm.user_id = u.id
             WHERE gm.group_id = ?1
             ORDER BY
                CASE gm.role
                    WHEN 'owner' THEN 1
                    WHEN 'admin' THEN 2
                    ELSE 3
                END,
                gm.joined_at",
        )?;

        let rows = stmt.query_map(params![group], |row| {
            let role: String = row.get(1)?;
            Ok(Member {
                handle: row.get(0)?,
                role: parse_role(&role, 1)?,
                joined_at: row.get(2)?,
            })
        })?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    /// Whether the group exists and whether `user` is a member of it.
    pub fn check_access(&self, group: GroupId, user: UserId) -> Result<GroupAccess> {
        let group_exists = group_exists(self.conn(), group)?;
        let has_access = group_exists && role_of(self.conn(), group, user)?.is_some();
        Ok(GroupAccess {
            has_access,
            group_exists,
        })
    }

    /// Current role of `user` in `group`, if any.
    pub fn member_role(&self, group: GroupId, user: UserId) -> Result<Option<Role>> {
        role_of(self.conn(), group, user)
    }
}

// ---------------------------------------------------------------------------
// Helpers (shared with messages.rs within the crate)
// ---------------------------------------------------------------------------

pub(crate) fn group_exists(conn: &Connection, group: GroupId) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM groups WHERE id = ?1",
            params![group],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn role_of(conn: &Connection, group: GroupId, user: UserId) -> Result<Option<Role>> {
    let role: Option<String> = conn
        .query_row(
            "SELECT role FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group, user],
            |row| row.get(0),
        )
        .optional()?;

    match role {
        Some(s) => Role::parse(&s)
            .map(Some)
            .ok_or_else(|| StoreError::validation(format!("unknown role '{s}' in database"))),
        None => Ok(None),
    }
}

/// Central permission guard: the group must exist, the actor must be a
/// member, and their role must be at least `min_role`.  Returns the actor's
/// role for follow-up decisions.  Always called inside the transaction that
/// applies the change.
pub(crate) fn require(
    conn: &Connection,
    actor: UserId,
    group: GroupId,
    min_role: Role,
) -> Result<Role> {
    if !group_exists(conn, group)? {
        return Err(StoreError::NotFound("group"));
    }

    let role = role_of(conn, group, actor)?
        .ok_or_else(|| StoreError::authorization("not a member of this group"))?;

    if role < min_role {
        return Err(StoreError::authorization(format!(
            "requires {} or better",
            min_role
        )));
    }
    Ok(role)
}

pub(crate) fn handle_of(conn: &Connection, user: UserId) -> Result<Option<String>> {
    let handle: Option<String> = conn
        .query_row(
            "SELECT handle FROM users WHERE id = ?1",
            params![user],
            |row| row.get(0),
        )
        .optional()?;
    Ok(handle)
}

/// Insert a system notice into the group's channel (author id 0).
pub(crate) fn insert_notice(
    conn: &Connection,
    group: GroupId,
    text: &str,
    now: Timestamp,
) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (kind, group_id, author_id, body, created_at, updated_at)
         VALUES ('group', ?1, ?2, ?3, ?4, ?4)",
        params![group, SYSTEM_USER_ID, text, now],
    )?;
    Ok(())
}

fn parse_role(s: &str, column: usize) -> rusqlite::Result<Role> {
    Role::parse(s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            format!("unknown role '{s}'").into(),
        )
    })
}
