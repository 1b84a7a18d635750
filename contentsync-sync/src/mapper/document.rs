//! Generic mapper for JSON documents.

use super::RecordMapper;
use super::update::{FieldUpdates, apply_update};
use crate::error::{MapperError, MapperResult};
use contentsync_store::{ContentStore, NewObject, TargetObject};
use contentsync_types::{BlobValue, FieldMap, FieldValue, Record, RelationValue, RemoteId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Configuration for [`DocumentMapper`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMapperConfig {
    /// Container that holds the synced objects.
    pub container: String,
    pub object_type: String,
    /// Record field carrying the identity.
    pub id_field: String,
    /// Record field carrying the modification time.
    pub modification_field: String,
    /// Fields to copy. Empty means every field.
    pub fields: Vec<String>,
    /// Fields whose values are remote ids of other objects.
    pub relation_fields: Vec<String>,
    /// Workflow state new objects are moved to.
    pub review_state: Option<String>,
    /// Apply updates even when the record is not newer.
    pub force_update: bool,
}

impl Default for DocumentMapperConfig {
    fn default() -> Self {
        Self {
            container: "content".to_string(),
            object_type: "Document".to_string(),
            id_field: "id".to_string(),
            modification_field: "modification_date".to_string(),
            fields: Vec::new(),
            relation_fields: Vec::new(),
            review_state: None,
            force_update: false,
        }
    }
}

/// Maps flat JSON records onto objects of one type in one container.
#[derive(Debug, Clone, Default)]
pub struct DocumentMapper {
    config: DocumentMapperConfig,
}

impl DocumentMapper {
    pub fn new(config: DocumentMapperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DocumentMapperConfig {
        &self.config
    }

    /// Body entries of a record eligible for extraction, in key order,
    /// including `null` ones.
    fn body_entries<'r>(&self, record: &'r Record) -> Vec<(&'r str, &'r serde_json::Value)> {
        let Some(map) = record.data().as_object() else {
            return Vec::new();
        };
        map.iter()
            .filter(|(name, _)| {
                **name != self.config.id_field
                    && **name != self.config.modification_field
                    && (self.config.fields.is_empty() || self.config.fields.contains(*name))
            })
            .map(|(name, value)| (name.as_str(), value))
            .collect()
    }

    /// Body fields that carry a value.
    fn body_fields<'r>(&self, record: &'r Record) -> Vec<(&'r str, &'r serde_json::Value)> {
        self.body_entries(record)
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect()
    }

    /// Converts the record body into field values, resolving relations.
    pub fn extract_fields(&self, store: &dyn ContentStore, record: &Record) -> MapperResult<FieldMap> {
        let mut fields = FieldMap::new();
        for (name, value) in self.body_fields(record) {
            if let Some(value) = self.convert(store, name, value)? {
                fields.insert(name.to_string(), value);
            }
        }
        Ok(fields)
    }

    /// Like [`extract_fields`](Self::extract_fields), but `null` entries are
    /// kept as clears.
    pub fn extract_updates(&self, store: &dyn ContentStore, record: &Record) -> MapperResult<FieldUpdates> {
        let mut updates = FieldUpdates::new();
        for (name, value) in self.body_entries(record) {
            if value.is_null() {
                updates.insert(name.to_string(), None);
            } else if let Some(value) = self.convert(store, name, value)? {
                updates.insert(name.to_string(), Some(value));
            }
        }
        Ok(updates)
    }

    fn convert(
        &self,
        store: &dyn ContentStore,
        name: &str,
        value: &serde_json::Value,
    ) -> MapperResult<Option<FieldValue>> {
        if self.config.relation_fields.iter().any(|f| f == name) {
            return self.resolve_relation(store, name, value);
        }
        match BlobValue::from_upload(value) {
            Ok(Some(blob)) => Ok(Some(FieldValue::Blob(blob))),
            Ok(None) => Ok(FieldValue::from_json(value)),
            Err(e) => {
                warn!("Dropping field {}: {}", name, e);
                Ok(None)
            }
        }
    }

    fn resolve_relation(
        &self,
        store: &dyn ContentStore,
        name: &str,
        value: &serde_json::Value,
    ) -> MapperResult<Option<FieldValue>> {
        let Some(target_id) = RemoteId::from_json(value) else {
            warn!("Relation field {} holds no usable id: {}", name, value);
            return Ok(None);
        };
        match store.find_by_remote_id(&target_id)? {
            Some(target) => Ok(Some(RelationValue::new(target.uid).into())),
            None => {
                warn!("Relation {} -> {} cannot be resolved", name, target_id);
                Ok(None)
            }
        }
    }

    fn require_id(&self, record: &Record) -> MapperResult<RemoteId> {
        self.record_id(record).ok_or_else(|| {
            MapperError::InvalidRecord(format!("record has no {}", self.config.id_field))
        })
    }
}

impl RecordMapper for DocumentMapper {
    fn record_id(&self, record: &Record) -> Option<RemoteId> {
        record.remote_id(&self.config.id_field)
    }

    fn find_item(&self, store: &dyn ContentStore, record: &Record) -> MapperResult<Option<TargetObject>> {
        let remote_id = self.require_id(record)?;
        Ok(store.find(&self.config.container, &remote_id)?)
    }

    fn create_item(&self, store: &dyn ContentStore, record: &Record) -> MapperResult<Vec<TargetObject>> {
        let remote_id = self.require_id(record)?;
        if self.is_withdrawn(record) {
            debug!("Nothing to create for {}", remote_id);
            return Ok(Vec::new());
        }

        let fields = self.extract_fields(store, record)?;
        let object = store.create(
            NewObject::new(&self.config.container, &self.config.object_type, remote_id)
                .with_fields(fields)
                .with_modification_date(record.modification_date(&self.config.modification_field)),
        )?;

        if let Some(state) = &self.config.review_state {
            if store.get_state(object.uid)?.as_deref() != Some(state.as_str()) {
                store.transition(object.uid, state)?;
            }
        }
        store.mark_synced(object.uid)?;
        store.reindex(object.uid)?;

        let created = store.get(object.uid)?.unwrap_or(object);
        Ok(vec![created])
    }

    fn update_item(
        &self,
        store: &dyn ContentStore,
        object: &TargetObject,
        record: &Record,
    ) -> MapperResult<Vec<TargetObject>> {
        let updates = self.extract_updates(store, record)?;
        apply_update(
            store,
            object,
            &updates,
            record.modification_date(&self.config.modification_field),
            self.config.force_update,
        )
    }

    fn delete_items(
        &self,
        store: &dyn ContentStore,
        _records: &[Record],
        survivors: &HashSet<RemoteId>,
    ) -> MapperResult<Vec<TargetObject>> {
        let mut deleted = Vec::new();
        for object in store.synced_objects(&self.config.container)? {
            if survivors.contains(&object.remote_id) {
                continue;
            }
            match store.delete(object.uid) {
                Ok(()) => {
                    info!("Removed {} (gone from source)", object.path());
                    deleted.push(object);
                }
                Err(e) => warn!("Failed to delete {}: {}", object.path(), e),
            }
        }
        Ok(deleted)
    }

    fn is_withdrawn(&self, record: &Record) -> bool {
        record.is_blank()
            || (self.body_fields(record).is_empty()
                && record.modification_date(&self.config.modification_field).is_none())
    }
}
