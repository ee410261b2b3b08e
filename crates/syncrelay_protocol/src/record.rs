//! Raw record normalization.
//!
//! Clients send rows with either upper-case (`CODE`) or lower-case (`code`)
//! keys. Normalization resolves each field with a fixed rule:
//!
//! - the upper-case value wins when it is present, not `null` and not `""`
//! - otherwise the lower-case value is used as-is
//! - neither key present yields `None`
//!
//! Non-string scalars keep their JSON text (`42`, `true`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row as sent by a client, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

/// The four record fields after casing has been resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordFields {
    /// Record code.
    pub code: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Branch label.
    pub branch: Option<String>,
}

impl RawRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a key, returning the record for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Resolves one field from its upper-case and lower-case keys.
    pub fn field(&self, upper: &str, lower: &str) -> Option<String> {
        match self.0.get(upper) {
            Some(value) if !is_blank(value) => text(value),
            _ => self.0.get(lower).and_then(text),
        }
    }

    /// Resolves all four fields.
    pub fn normalize(&self) -> RecordFields {
        RecordFields {
            code: self.field("CODE", "code"),
            name: self.field("NAME", "name"),
            address: self.field("ADDRESS", "address"),
            branch: self.field("BRANCH", "branch"),
        }
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
