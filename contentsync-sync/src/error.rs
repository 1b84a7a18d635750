//! Error types for the reconciliation layer.

use contentsync_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;

/// Result type for run-level operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while obtaining source data.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Invalid source configuration.
    #[error("invalid source configuration: {0}")]
    Config(String),

    /// Local source file missing or not a regular file.
    #[error("source file not found in: {}", .0.display())]
    NotFound(PathBuf),

    /// Remote source answered with a non-success status.
    #[error("error getting data from {url}: {status}")]
    Fetch { url: String, status: u16 },

    /// Transport failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Payload could not be turned into records.
    #[error("malformed source data: {0}")]
    Malformed(String),

    /// IO error reading a local source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a record mapper for a single record.
#[derive(Debug, Error)]
pub enum MapperError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("{0}")]
    Other(String),
}

/// Run-level error taxonomy.
///
/// Record-level variants never abort a run; they are logged against the
/// record and the run moves on.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(SourceError),

    #[error("source malformed: {0}")]
    SourceMalformed(SourceError),

    #[error("lookup failed for {record}: {source}")]
    RecordLookupFailed { record: String, source: MapperError },

    #[error("create failed for {record}: {source}")]
    RecordCreateFailed { record: String, source: MapperError },

    #[error("update failed for {record}: {source}")]
    RecordUpdateFailed { record: String, source: MapperError },

    #[error("delete failed for {record}: {source}")]
    RecordDeleteFailed { record: String, source: MapperError },

    #[error("unable to write report: {0}")]
    ReportWriteFailed(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<SourceError> for SyncError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Malformed(_) => SyncError::SourceMalformed(err),
            other => SyncError::SourceUnavailable(other),
        }
    }
}

