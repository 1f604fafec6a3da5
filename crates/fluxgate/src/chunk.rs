// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Time-series record types.
//!
//! A [`Chunk`] is one record ready for write: measurement name, optional
//! tags and timestamp, and an insertion-ordered field mapping. The backend
//! enforces per-field value typing at first write, so field values are
//! modeled explicitly rather than as raw JSON.

use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A value stored in a backend field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit floating point.
    Float(f64),
    /// 64-bit signed integer.
    Integer(i64),
    /// Boolean value.
    Boolean(bool),
    /// UTF-8 string.
    Text(String),
}

impl FieldValue {
    /// Convert a scalar JSON value into a field value.
    ///
    /// Numbers always become [`FieldValue::Float`]: producers disagree on
    /// whether a reading like `1` is integral, and the backend pins a field
    /// to the type of its first write. Returns `None` for null, arrays and
    /// objects.
    pub fn from_json(value: &Value) -> Option<FieldValue> {
        match value {
            Value::Number(n) => n.as_f64().map(FieldValue::Float),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Bool(b) => Some(FieldValue::Boolean(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Render as the natural JSON scalar for a wire body.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Float(v) => json!(v),
            FieldValue::Integer(v) => json!(v),
            FieldValue::Boolean(v) => json!(v),
            FieldValue::Text(v) => json!(v),
        }
    }
}

/// Insertion-ordered field name to value mapping.
///
/// This is the one canonical shape decoded bus payloads take before they
/// reach the forwarding core. Re-inserting an existing key replaces the
/// value in place (last write wins, original position kept).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    entries: Vec<(String, FieldValue)>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut FieldValue)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Render as a JSON object, preserving insertion order.
    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            object.insert(key.clone(), value.to_json());
        }
        Value::Object(object)
    }
}

impl FromIterator<(String, FieldValue)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut fields = FieldSet::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

/// One time-series record in the current wire shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Backend series name.
    pub measurement: String,
    /// Indexed, low-cardinality filter keys. Absent unless set by a caller.
    pub tags: Option<BTreeMap<String, String>>,
    /// Timestamp in nanoseconds since the Unix epoch. When absent the
    /// backend assigns ingestion time.
    pub time: Option<i64>,
    /// Field name to value mapping.
    pub fields: FieldSet,
}

impl Chunk {
    pub fn new(measurement: impl Into<String>, fields: FieldSet) -> Self {
        Self { measurement: measurement.into(), tags: None, time: None, fields }
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_time(mut self, time_ns: i64) -> Self {
        self.time = Some(time_ns);
        self
    }
}

/// One record in the legacy columnar wire shape.
///
/// The legacy protocol carries no tags and addresses values positionally:
/// `points[0][i]` belongs to `columns[i]`. Exactly one point row is
/// supported by the conversion in [`crate::schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyChunk {
    pub name: String,
    pub columns: Vec<String>,
    pub points: Vec<Vec<FieldValue>>,
}
