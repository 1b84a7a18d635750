//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Object not found.
    #[error("object not found: {0}")]
    NotFound(String),

    /// An object with the same remote id already exists in the container.
    #[error("object {remote_id} already exists in {container}")]
    Duplicate { container: String, remote_id: String },

    /// Workflow transition rejected.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Invalid data read back from the store.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A previous holder of the store lock panicked.
    #[error("store lock poisoned")]
    Poisoned,
}
