use crate::{NewObject, StoreResult, TargetObject};
use contentsync_types::{FieldValue, ModificationDate, ObjectUid, RemoteId};

/// Abstract destination store.
///
/// Writes are staged until [`commit`](ContentStore::commit); a
/// [`rollback`](ContentStore::rollback) discards everything staged since the
/// last commit. Methods take `&self`: implementations synchronize internally
/// so a store can be shared behind an `Arc`.
pub trait ContentStore: Send + Sync {
    /// Looks up the object with `remote_id` in `container`.
    fn find(&self, container: &str, remote_id: &RemoteId) -> StoreResult<Option<TargetObject>>;

    /// Looks up an object with `remote_id` in any container. Used to resolve
    /// references between records.
    fn find_by_remote_id(&self, remote_id: &RemoteId) -> StoreResult<Option<TargetObject>>;

    /// Loads an object by uid.
    fn get(&self, uid: ObjectUid) -> StoreResult<Option<TargetObject>>;

    /// Creates an object. Fails with `Duplicate` if `(container, remote_id)`
    /// is taken.
    fn create(&self, object: NewObject) -> StoreResult<TargetObject>;

    /// Sets (or with `None`, clears) a single field.
    fn set_field(&self, uid: ObjectUid, name: &str, value: Option<FieldValue>) -> StoreResult<()>;

    /// Overwrites the object's modification date.
    fn set_modification_date(&self, uid: ObjectUid, date: Option<ModificationDate>) -> StoreResult<()>;

    /// Deletes an object.
    fn delete(&self, uid: ObjectUid) -> StoreResult<()>;

    /// Refreshes the object's catalog entry.
    fn reindex(&self, uid: ObjectUid) -> StoreResult<()>;

    /// Current workflow state.
    fn get_state(&self, uid: ObjectUid) -> StoreResult<Option<String>>;

    /// Moves the object to workflow state `state`.
    fn transition(&self, uid: ObjectUid, state: &str) -> StoreResult<()>;

    /// Marks the object as managed by reconciliation.
    fn mark_synced(&self, uid: ObjectUid) -> StoreResult<()>;

    /// All synced objects in `container`, ordered by uid.
    fn synced_objects(&self, container: &str) -> StoreResult<Vec<TargetObject>>;

    /// Makes staged writes durable.
    fn commit(&self) -> StoreResult<()>;

    /// Discards staged writes.
    fn rollback(&self) -> StoreResult<()>;
}
