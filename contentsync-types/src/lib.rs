//! Core type definitions for contentsync.
//!
//! This crate defines the plugin-agnostic types shared by the store, the
//! reconciliation engine, and the command-line front end:
//! - Object and remote identifiers
//! - Modification timestamps as they appear in source records
//! - Field values, including relation values with target-identity semantics
//! - Source records

mod ids;
mod record;
mod timestamp;
mod value;

pub use ids::{ObjectUid, RemoteId};
pub use record::Record;
pub use timestamp::ModificationDate;
pub use value::{BlobValue, FieldMap, FieldValue, RelationValue};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid blob: {0}")]
    InvalidBlob(String),
}
