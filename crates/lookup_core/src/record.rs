//! Decoded lookup payloads.
//!
//! Remote APIs are loose about which fields they send, so a record is kept as
//! the raw JSON object and every accessor falls back to a neutral default when
//! a field or a whole category is missing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const BLACKLIST: &str = "blacklist";
pub const ANNOYLIST: &str = "annoylist";
pub const SAFELIST: &str = "safelist";
pub const STATISTICS: &str = "statistics";
pub const NAME_CHANGE: &str = "name_change";

/// The moderation data returned for one player.
///
/// An empty record means "nothing known"; it is what every failed lookup
/// produces and it is never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupRecord(Map<String, Value>);

impl LookupRecord {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps a JSON value. Anything other than an object yields an empty record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Top-level fields, for flat payloads such as blacklist entries.
    pub fn root(&self) -> Category<'_> {
        Category(Some(&self.0))
    }

    /// A nested category such as `blacklist` or `statistics`.
    pub fn category(&self, name: &str) -> Category<'_> {
        Category(self.0.get(name).and_then(Value::as_object))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for LookupRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Read-only view over one JSON object of a record. Absent means empty.
#[derive(Debug, Clone, Copy)]
pub struct Category<'a>(Option<&'a Map<String, Value>>);

impl<'a> Category<'a> {
    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.0.and_then(|map| map.get(field))
    }

    /// Boolean field; missing or non-boolean reads as `false`.
    pub fn flag(&self, field: &str) -> bool {
        self.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    /// String field, or `default` when missing or not a string.
    pub fn text(&self, field: &str, default: &str) -> String {
        self.get(field)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// Integer field; floats are truncated, anything else reads as `0`.
    pub fn int(&self, field: &str) -> i64 {
        match self.get(field) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// List of strings; `None` when the field is missing or not a list.
    pub fn strings(&self, field: &str) -> Option<Vec<String>> {
        self.get(field).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
    }
}
