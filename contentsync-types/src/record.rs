use crate::{ModificationDate, RemoteId};
use serde::{Deserialize, Serialize};

/// One unit of data from a source sequence.
///
/// The body is arbitrary JSON whose structure is defined by the source.
/// Mappers decide which field carries the identity and which the
/// modification time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    data: serde_json::Value,
}

impl Record {
    pub fn new(data: serde_json::Value) -> Self {
        Self { data }
    }

    /// The raw JSON body.
    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Top-level field lookup.
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.data.get(field)
    }

    /// Extract a string value using a JSON pointer (e.g., "/title").
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.data.pointer(pointer).and_then(|v| v.as_str())
    }

    /// Extract a numeric value using a JSON pointer.
    pub fn get_number(&self, pointer: &str) -> Option<f64> {
        self.data.pointer(pointer).and_then(|v| v.as_f64())
    }

    /// Reads the record identity from `field`.
    pub fn remote_id(&self, field: &str) -> Option<RemoteId> {
        self.get(field).and_then(RemoteId::from_json)
    }

    /// Reads the modification time from `field`.
    pub fn modification_date(&self, field: &str) -> Option<ModificationDate> {
        self.get(field).and_then(ModificationDate::from_json)
    }

    /// A blank record has no body at all: `null`, `{}`, or `""`.
    pub fn is_blank(&self) -> bool {
        match &self.data {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            serde_json::Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Record {
    fn from(data: serde_json::Value) -> Self {
        Self::new(data)
    }
}
