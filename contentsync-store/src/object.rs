use chrono::{DateTime, Utc};
use contentsync_types::{FieldMap, FieldValue, ModificationDate, ObjectUid, RemoteId};
use serde::{Deserialize, Serialize};

/// An object persisted in the destination store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetObject {
    pub uid: ObjectUid,
    pub remote_id: RemoteId,
    /// Path of the folder-like container holding the object.
    pub container: String,
    pub object_type: String,
    pub fields: FieldMap,
    pub modification_date: Option<ModificationDate>,
    /// Current workflow state, if the object type has a workflow.
    pub review_state: Option<String>,
    /// Set on objects managed by reconciliation; only these are candidates
    /// for the orphan deletion pass.
    pub synced: bool,
    /// Last time the object was re-indexed.
    pub indexed_at: Option<DateTime<Utc>>,
}

impl TargetObject {
    /// Field lookup.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// A path-like locator used in logs and reports.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.container.trim_matches('/'), self.remote_id)
    }
}

/// Parameters for creating an object.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObject {
    pub remote_id: RemoteId,
    pub container: String,
    pub object_type: String,
    pub fields: FieldMap,
    pub modification_date: Option<ModificationDate>,
}

impl NewObject {
    pub fn new(
        container: impl Into<String>,
        object_type: impl Into<String>,
        remote_id: RemoteId,
    ) -> Self {
        Self {
            remote_id,
            container: container.into(),
            object_type: object_type.into(),
            fields: FieldMap::new(),
            modification_date: None,
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: FieldMap) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_modification_date(mut self, date: Option<ModificationDate>) -> Self {
        self.modification_date = date;
        self
    }

    /// Materializes the object with a fresh uid.
    pub(crate) fn into_object(self) -> TargetObject {
        TargetObject {
            uid: ObjectUid::new(),
            remote_id: self.remote_id,
            container: self.container,
            object_type: self.object_type,
            fields: self.fields,
            modification_date: self.modification_date,
            review_state: None,
            synced: false,
            indexed_at: None,
        }
    }
}
