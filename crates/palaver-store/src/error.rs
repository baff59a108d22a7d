use thiserror::Error;

/// Errors produced by the store layer.
///
/// `Validation`, `Authorization`, `NotFound` and `Conflict` are expected
/// outcomes surfaced verbatim to the caller; everything else is an internal
/// failure the HTTP layer logs and hides behind an opaque response.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request is malformed or violates a basic rule.
    #[error("{0}")]
    Validation(String),

    /// The actor lacks the role or ownership the operation requires.
    #[error("{0}")]
    Authorization(String),

    /// The change collides with existing state (duplicate name, duplicate
    /// membership, role already held).
    #[error("{0}")]
    Conflict(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        StoreError::Authorization(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        StoreError::Conflict(msg.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
