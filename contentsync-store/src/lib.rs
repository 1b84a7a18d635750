//! Destination content store for contentsync.
//!
//! The reconciliation engine never touches persistence directly; it goes
//! through the [`ContentStore`] trait. Two implementations are provided:
//!
//! - [`MemoryStore`]: a process-local store with commit/rollback snapshots,
//!   used by tests and by dry runs without a database
//! - [`SqliteStore`]: objects persisted as JSON field blobs in SQLite, with
//!   an implicit transaction per commit boundary
//!
//! Objects are addressed by `(container, remote_id)` for reconciliation and
//! by [`ObjectUid`](contentsync_types::ObjectUid) everywhere else.

mod error;
mod memory;
mod object;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use object::{NewObject, TargetObject};
pub use sqlite::SqliteStore;
pub use store::ContentStore;
