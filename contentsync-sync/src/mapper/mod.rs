//! Record mappers.
//!
//! A mapper knows how one content type maps between source records and
//! store objects. The engine is agnostic to the concrete type: it only calls
//! the operations of [`RecordMapper`].

mod document;
pub mod update;

use crate::error::{MapperResult, SourceResult};
use crate::source::{SourcePayload, records_from_payload};
use chrono::{DateTime, Utc};
use contentsync_store::{ContentStore, TargetObject};
use contentsync_types::{Record, RemoteId};
use std::collections::HashSet;

pub use document::{DocumentMapper, DocumentMapperConfig};

/// Maps source records onto store objects for one content type.
///
/// `find_item`, `create_item`, and `update_item` are required. Errors they
/// return are isolated to the record at hand; the run continues.
pub trait RecordMapper: Send + Sync {
    /// Identity of a record, used for lookups and logs.
    fn record_id(&self, record: &Record) -> Option<RemoteId>;

    /// Locates the object corresponding to `record`. Must not modify the
    /// store.
    fn find_item(&self, store: &dyn ContentStore, record: &Record) -> MapperResult<Option<TargetObject>>;

    /// Creates the object(s) for a record with no existing counterpart.
    /// An empty result means the record could not be created.
    fn create_item(&self, store: &dyn ContentStore, record: &Record) -> MapperResult<Vec<TargetObject>>;

    /// Applies a record to its existing object. An empty result means the
    /// record was skipped. See [`update::apply_update`] for the standard
    /// policy.
    fn update_item(
        &self,
        store: &dyn ContentStore,
        object: &TargetObject,
        record: &Record,
    ) -> MapperResult<Vec<TargetObject>>;

    /// Removes objects that are no longer present at the source.
    ///
    /// Called once after every record has been processed. `survivors` holds
    /// the remote ids of objects confirmed present during the run and of
    /// objects the run created. Any other previously synced object is an
    /// orphan, even if a record for it failed.
    fn delete_items(
        &self,
        store: &dyn ContentStore,
        records: &[Record],
        survivors: &HashSet<RemoteId>,
    ) -> MapperResult<Vec<TargetObject>> {
        let _ = (store, records, survivors);
        Ok(Vec::new())
    }

    /// True when the record signals that its object no longer exists
    /// upstream.
    fn is_withdrawn(&self, record: &Record) -> bool {
        record.is_blank()
    }

    /// Deletes a single object for a withdrawn record.
    fn delete_item(&self, store: &dyn ContentStore, object: &TargetObject) -> MapperResult<()> {
        store.delete(object.uid)?;
        Ok(())
    }

    /// Turns the raw source payload into the record sequence.
    fn convert_source_data(&self, payload: SourcePayload) -> SourceResult<Vec<Record>> {
        records_from_payload(payload)
    }

    /// Title of the run report.
    fn report_title(&self, started_at: DateTime<Utc>) -> String {
        format!("Report sync {}", started_at.format("%d-%m-%Y %H:%M:%S"))
    }
}
