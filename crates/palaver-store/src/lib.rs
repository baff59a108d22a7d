//! # palaver-store
//!
//! SQLite persistence for the Palaver messaging backend.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed operations for every domain
//! concern: user accounts, group membership and roles, the unified message
//! table shared by the general / group / private channels, and attachment
//! association rows.  Every mutating group or message operation re-reads
//! the actor's current role inside the same transaction that applies the
//! change.

pub mod attachments;
pub mod clock;
pub mod database;
pub mod groups;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
