//! Reconciliation engine for contentsync.
//!
//! Brings a destination [`ContentStore`](contentsync_store::ContentStore) in
//! line with a remote data source. For each source record the engine decides
//! whether to create, update, skip, or delete the corresponding object, then
//! reports what it did.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Source**: fetches raw data from a file or URL ([`SourceProvider`])
//! - **Mapper**: maps records of one content type onto store objects
//!   ([`RecordMapper`], [`DocumentMapper`])
//! - **Session**: counters and survivor set of a single run
//! - **Reporter**: linkified log lines and the persisted report
//!   ([`RunReporter`], [`ReportSink`])
//! - **Engine**: drives the run ([`SyncEngine`])
//!
//! ## Run phases
//!
//! 1. **Fetch**: read the source and convert it into records
//! 2. **Iterate**: per record, look up the object and create, update,
//!    skip, or delete it
//! 3. **Delete pass**: remove synced objects that vanished from the source
//! 4. **Report**: compose the summary and persist the report
//! 5. **End**: commit, or roll back on a dry run
//!
//! # Example
//!
//! ```
//! use contentsync_store::MemoryStore;
//! use contentsync_sync::{
//!     DefaultSourceProvider, DocumentMapper, EngineConfig, HttpConfig, ResilientClient, SyncEngine,
//! };
//! use std::sync::Arc;
//!
//! let client = ResilientClient::new(&HttpConfig::default())?;
//! let engine = SyncEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(DocumentMapper::default()),
//!     Arc::new(DefaultSourceProvider::new(client)),
//! );
//! assert!(!engine.config().dry_run);
//! # Ok::<(), contentsync_sync::SourceError>(())
//! ```

mod engine;
mod error;
pub mod mapper;
pub mod report;
pub mod session;
pub mod source;

pub use engine::{Decision, EngineConfig, RunSummary, SyncEngine};
pub use error::{MapperError, MapperResult, SourceError, SourceResult, SyncError, SyncResult};
pub use mapper::{DocumentMapper, DocumentMapperConfig, RecordMapper};
pub use report::{
    EventKind, FileReportSink, LogLine, ReportDocument, ReportSink, ReportSummary, RunReporter,
    StoreReportSink,
};
pub use session::{OutcomeTally, RecordOutcome, RunPhase, SyncCounters, SyncSession};
pub use source::{
    DefaultSourceProvider, HttpConfig, ResilientClient, RetryPolicy, SourceLocation, SourcePayload,
    SourceProvider,
};
