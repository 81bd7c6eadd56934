//! Common error types for Conference Central

use thiserror::Error;

/// Common result type for Conference Central operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Conference Central services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding of a stored column or cache value failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// State-dependent precondition violated (double registration, no seats)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller does not own the entity it tries to mutate
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed or constraint-violating conference query
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Store contention persisted past the retry budget; safe to retry later
    #[error("Transient failure: {0}")]
    Transient(String),
}

impl Error {
    /// True for store-level lock contention that aborts a transaction
    ///
    /// SQLite reports these as SQLITE_BUSY (5, incl. extended BUSY_SNAPSHOT 517)
    /// or SQLITE_LOCKED (6).
    pub fn is_contention(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => {
                let code_matches = matches!(
                    db_err.code().as_deref(),
                    Some("5") | Some("6") | Some("261") | Some("517") | Some("262")
                );
                code_matches || db_err.message().contains("database is locked")
            }
            _ => false,
        }
    }
}
