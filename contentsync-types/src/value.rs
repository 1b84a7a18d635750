//! Field values carried by records and target objects.
//!
//! Values are compared two ways. `==` is structural and includes the wrapper
//! identity of relation values. [`FieldValue::is_equivalent`] is what change
//! detection uses: relations compare only by the object they point at, so a
//! freshly built wrapper around an unchanged target is not a change.

use crate::{Error, ModificationDate, ObjectUid, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Named field values, ordered by field name.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Timestamp(ModificationDate),
    /// Structured sub-object or list, kept as JSON.
    Json(serde_json::Value),
    Blob(BlobValue),
    Relation(RelationValue),
}

impl FieldValue {
    /// Converts a plain JSON value. Returns `None` for `null`, which means
    /// "no value" rather than a value of its own.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            other => Some(Self::Json(other.clone())),
        }
    }

    /// Change-detection equality.
    ///
    /// Identical to `==` except for relations, which are equivalent when they
    /// point at the same target regardless of wrapper identity.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Relation(a), Self::Relation(b)) => a.same_target(b),
            _ => self == other,
        }
    }

    /// Returns the text content if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the relation if this is a relation value.
    pub fn as_relation(&self) -> Option<&RelationValue> {
        match self {
            Self::Relation(r) => Some(r),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<ModificationDate> for FieldValue {
    fn from(date: ModificationDate) -> Self {
        Self::Timestamp(date)
    }
}

impl From<RelationValue> for FieldValue {
    fn from(relation: RelationValue) -> Self {
        Self::Relation(relation)
    }
}

/// A reference from one object to another.
///
/// Every construction mints a new `wrapper_id`, mirroring how a content
/// platform builds a new relation object each time a reference is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationValue {
    /// The object this relation points at.
    pub to_id: ObjectUid,
    /// Identity of this particular relation wrapper.
    pub wrapper_id: Uuid,
}

impl RelationValue {
    /// Creates a relation to `to_id` with a fresh wrapper id.
    #[must_use]
    pub fn new(to_id: ObjectUid) -> Self {
        Self {
            to_id,
            wrapper_id: Uuid::new_v4(),
        }
    }

    /// True if both relations point at the same object.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        self.to_id == other.to_id
    }
}

/// Binary content such as an image or attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobValue {
    pub filename: String,
    pub content_type: String,
    #[serde(serialize_with = "encode_base64", deserialize_with = "decode_base64")]
    pub data: Vec<u8>,
}

impl BlobValue {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Reads a file upload in the REST shape
    /// `{"data", "encoding", "filename", "content-type"}`.
    ///
    /// Returns `Ok(None)` when `value` is not shaped like an upload. Data
    /// with `"encoding": "base64"` is decoded; any other encoding is taken
    /// as text.
    pub fn from_upload(value: &serde_json::Value) -> Result<Option<Self>> {
        let Some(map) = value.as_object() else {
            return Ok(None);
        };
        let (Some(data), Some(encoding)) = (
            map.get("data").and_then(|v| v.as_str()),
            map.get("encoding").and_then(|v| v.as_str()),
        ) else {
            return Ok(None);
        };

        let data = if encoding.eq_ignore_ascii_case("base64") {
            STANDARD
                .decode(data)
                .map_err(|e| Error::InvalidBlob(e.to_string()))?
        } else {
            data.as_bytes().to_vec()
        };
        let text = |key: &str| map.get(key).and_then(|v| v.as_str());
        Ok(Some(Self::new(
            text("filename").unwrap_or_default(),
            text("content-type").unwrap_or("application/octet-stream"),
            data,
        )))
    }
}

fn encode_base64<S: Serializer>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

fn decode_base64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}
