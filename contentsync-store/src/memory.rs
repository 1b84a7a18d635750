//! In-memory content store.

use crate::{ContentStore, NewObject, StoreError, StoreResult, TargetObject};
use chrono::Utc;
use contentsync_types::{FieldValue, ModificationDate, ObjectUid, RemoteId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    committed: BTreeMap<ObjectUid, TargetObject>,
    working: BTreeMap<ObjectUid, TargetObject>,
    reindex_counts: HashMap<ObjectUid, usize>,
    commits: usize,
}

/// A store that keeps objects in memory.
///
/// Holds two snapshots: the committed one and the working one that all
/// reads and writes go through. `commit` promotes the working snapshot,
/// `rollback` discards it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Every object in the working snapshot, ordered by uid.
    pub fn objects(&self) -> StoreResult<Vec<TargetObject>> {
        Ok(self.lock()?.working.values().cloned().collect())
    }

    /// Number of objects in the working snapshot.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.lock()?.working.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// How many times `uid` has been re-indexed.
    pub fn reindex_count(&self, uid: ObjectUid) -> usize {
        self.lock()
            .map(|state| state.reindex_counts.get(&uid).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.lock().map(|state| state.commits).unwrap_or(0)
    }

    fn with_object<T>(
        &self,
        uid: ObjectUid,
        f: impl FnOnce(&mut TargetObject) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut state = self.lock()?;
        let object = state
            .working
            .get_mut(&uid)
            .ok_or_else(|| StoreError::NotFound(uid.to_string()))?;
        f(object)
    }
}

impl ContentStore for MemoryStore {
    fn find(&self, container: &str, remote_id: &RemoteId) -> StoreResult<Option<TargetObject>> {
        let state = self.lock()?;
        Ok(state
            .working
            .values()
            .find(|o| o.container == container && &o.remote_id == remote_id)
            .cloned())
    }

    fn find_by_remote_id(&self, remote_id: &RemoteId) -> StoreResult<Option<TargetObject>> {
        let state = self.lock()?;
        Ok(state.working.values().find(|o| &o.remote_id == remote_id).cloned())
    }

    fn get(&self, uid: ObjectUid) -> StoreResult<Option<TargetObject>> {
        Ok(self.lock()?.working.get(&uid).cloned())
    }

    fn create(&self, object: NewObject) -> StoreResult<TargetObject> {
        let mut state = self.lock()?;
        let taken = state
            .working
            .values()
            .any(|o| o.container == object.container && o.remote_id == object.remote_id);
        if taken {
            return Err(StoreError::Duplicate {
                container: object.container,
                remote_id: object.remote_id.to_string(),
            });
        }
        let created = object.into_object();
        state.working.insert(created.uid, created.clone());
        Ok(created)
    }

    fn set_field(&self, uid: ObjectUid, name: &str, value: Option<FieldValue>) -> StoreResult<()> {
        self.with_object(uid, |object| {
            match value {
                Some(value) => object.fields.insert(name.to_string(), value),
                None => object.fields.remove(name),
            };
            Ok(())
        })
    }

    fn set_modification_date(&self, uid: ObjectUid, date: Option<ModificationDate>) -> StoreResult<()> {
        self.with_object(uid, |object| {
            object.modification_date = date;
            Ok(())
        })
    }

    fn delete(&self, uid: ObjectUid) -> StoreResult<()> {
        let mut state = self.lock()?;
        state
            .working
            .remove(&uid)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(uid.to_string()))
    }

    fn reindex(&self, uid: ObjectUid) -> StoreResult<()> {
        let mut state = self.lock()?;
        let object = state
            .working
            .get_mut(&uid)
            .ok_or_else(|| StoreError::NotFound(uid.to_string()))?;
        object.indexed_at = Some(Utc::now());
        *state.reindex_counts.entry(uid).or_default() += 1;
        Ok(())
    }

    fn get_state(&self, uid: ObjectUid) -> StoreResult<Option<String>> {
        self.with_object(uid, |object| Ok(object.review_state.clone()))
    }

    fn transition(&self, uid: ObjectUid, state: &str) -> StoreResult<()> {
        if state.trim().is_empty() {
            return Err(StoreError::InvalidTransition("empty target state".to_string()));
        }
        self.with_object(uid, |object| {
            object.review_state = Some(state.to_string());
            Ok(())
        })
    }

    fn mark_synced(&self, uid: ObjectUid) -> StoreResult<()> {
        self.with_object(uid, |object| {
            object.synced = true;
            Ok(())
        })
    }

    fn synced_objects(&self, container: &str) -> StoreResult<Vec<TargetObject>> {
        let state = self.lock()?;
        Ok(state
            .working
            .values()
            .filter(|o| o.synced && o.container == container)
            .cloned()
            .collect())
    }

    fn commit(&self) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.committed = state.working.clone();
        state.commits += 1;
        Ok(())
    }

    fn rollback(&self) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.working = state.committed.clone();
        Ok(())
    }
}
