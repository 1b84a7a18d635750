//! Standard update policy.
//!
//! An object is only touched when the record is fresher than the object (or
//! a forced update is requested), and then only the fields whose values
//! actually differ are written. Relation values compare by target, so
//! re-extracting the same reference does not count as a change. An incoming
//! `None` clears the field.

use crate::error::{MapperError, MapperResult};
use contentsync_store::{ContentStore, TargetObject};
use contentsync_types::{FieldValue, ModificationDate};
use std::collections::BTreeMap;
use tracing::debug;

/// Incoming field values for an update. `None` clears the field.
pub type FieldUpdates = BTreeMap<String, Option<FieldValue>>;

/// Whether a record with `record_date` should be applied to an object last
/// modified at `object_date`.
///
/// `force` always wins. Otherwise the record must be strictly newer; an
/// object without a date is always stale and a record without one never
/// supersedes anything.
pub fn needs_update(
    object_date: Option<&ModificationDate>,
    record_date: Option<&ModificationDate>,
    force: bool,
) -> bool {
    if force {
        return true;
    }
    match (record_date, object_date) {
        (Some(record), Some(object)) => record.is_newer_than(object),
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Whether writing `new` over `old` would change the object.
pub fn field_changed(old: Option<&FieldValue>, new: Option<&FieldValue>) -> bool {
    match (old, new) {
        (Some(old), Some(new)) => !old.is_equivalent(new),
        (None, None) => false,
        _ => true,
    }
}

/// Names of the incoming fields that differ from the object's values.
/// Fields the object has but `updates` lacks are left alone.
pub fn changed_fields(object: &TargetObject, updates: &FieldUpdates) -> Vec<String> {
    updates
        .iter()
        .filter(|(name, value)| field_changed(object.field(name), value.as_ref()))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Applies `updates` to `object` under the standard policy.
///
/// Returns the updated object, or nothing when the update was skipped
/// (record not fresher, or no field changed). On success the object's
/// modification date is aligned with the record's.
pub fn apply_update(
    store: &dyn ContentStore,
    object: &TargetObject,
    updates: &FieldUpdates,
    record_date: Option<ModificationDate>,
    force: bool,
) -> MapperResult<Vec<TargetObject>> {
    if !needs_update(object.modification_date.as_ref(), record_date.as_ref(), force) {
        return Ok(Vec::new());
    }

    let changed = changed_fields(object, updates);
    if changed.is_empty() {
        debug!("No field changed on {}", object.path());
        return Ok(Vec::new());
    }

    for name in &changed {
        store.set_field(object.uid, name, updates.get(name).cloned().flatten())?;
    }
    if record_date.is_some() {
        store.set_modification_date(object.uid, record_date)?;
    }
    debug!("Updated {} fields: {:?}", object.path(), changed);

    let updated = store
        .get(object.uid)?
        .ok_or_else(|| MapperError::Other(format!("{} vanished during update", object.path())))?;
    Ok(vec![updated])
}
