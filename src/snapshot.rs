use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Field every valid status payload carries
pub const STATUS_FIELD: &str = "Status";

/// One complete, normalized set of printer fields produced by a poll cycle.
///
/// Snapshots are immutable once built; the coordinator publishes them behind
/// an `Arc` and replaces them wholesale on the next successful cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    fields: Map<String, Value>,
    fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot from normalized fields. Returns `None` when the
    /// mandatory `Status` field is missing.
    pub fn from_fields(fields: Map<String, Value>) -> Option<Self> {
        Self::from_fields_at(fields, Utc::now())
    }

    pub fn from_fields_at(fields: Map<String, Value>, fetched_at: DateTime<Utc>) -> Option<Self> {
        if !fields.contains_key(STATUS_FIELD) {
            return None;
        }
        Some(Self { fields, fetched_at })
    }

    /// The printer status string (or whatever value the printer sent)
    pub fn status(&self) -> &Value {
        // from_fields guarantees presence
        self.fields.get(STATUS_FIELD).unwrap_or(&Value::Null)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Numeric view of a field; booleans and strings are not coerced.
    pub fn f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Truthiness the way the printer's flags are meant: absent, null, false,
    /// zero and empty strings are all "off".
    pub fn flag(&self, key: &str) -> bool {
        match self.fields.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(Value::Null) | None => false,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
