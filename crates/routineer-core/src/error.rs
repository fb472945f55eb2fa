//! Core error types for routineer-core.
//!
//! The hierarchy separates recoverable validation failures (surfaced to
//! the caller, no state change) from storage failures. Checkpoint
//! writes are fire-and-forget and never surface here; they are logged
//! at the call site and retried on the next checkpoint.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for routineer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Errors bubbled up from an external store implementation
    #[error("Store error: {0}")]
    Store(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Recoverable validation errors. No state transition occurs when one
/// of these is returned.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The requested timer operation is not legal in the current state
    #[error("Cannot {action} an execution that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    /// Finish was requested but the routine requires an attachment
    #[error("Cannot finish execution {record_id}: at least one attachment is required")]
    AttachmentRequired { record_id: String },

    /// Planned duration must be at least one minute
    #[error("Invalid planned duration: {minutes} minutes (must be >= 1)")]
    InvalidDuration { minutes: i64 },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Storage adapter errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Row lookup by id came back empty
    #[error("No such record: {0}")]
    NotFound(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
