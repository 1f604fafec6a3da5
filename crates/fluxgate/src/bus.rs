// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bus message boundary.
//!
//! Payload shape is classified here, at the transport boundary, into a
//! tagged [`Payload`]; the forwarding core only ever sees the canonical
//! ordered [`FieldSet`] produced by [`Payload::decode`].
//!
//! The crate consumes a bus, it never implements one. Transports hand
//! messages over through [`MessageBus::subscribe`]; [`MemoryBus`] is the
//! in-process implementation used by tests and embedders.

use crate::chunk::{FieldSet, FieldValue};
use crate::error::ForwardError;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// A decoded bus payload in one of the two recognized encodings.
///
/// Both variants carry key/value pairs in delivery order: `Mapping` comes
/// from a JSON object, `Pairs` from an ordered `[key, value]` pair list.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Mapping(Vec<(String, Value)>),
    Pairs(Vec<(String, Value)>),
}

impl Payload {
    /// Classify a JSON value into a payload.
    ///
    /// Objects become `Mapping` (field order preserved), arrays of
    /// two-element `[string, value]` pairs become `Pairs`. Anything else is
    /// a decode error.
    pub fn from_json(value: Value) -> Result<Self, ForwardError> {
        match value {
            Value::Object(map) => Ok(Payload::Mapping(map.into_iter().collect())),
            Value::Array(items) => {
                let mut pairs = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Array(pair) if pair.len() == 2 => {
                            let mut parts = pair.into_iter();
                            match (parts.next(), parts.next()) {
                                (Some(Value::String(key)), Some(value)) => {
                                    pairs.push((key, value));
                                }
                                _ => {
                                    return Err(ForwardError::Decode(
                                        "pair key must be a string".into(),
                                    ))
                                }
                            }
                        }
                        other => {
                            return Err(ForwardError::Decode(format!(
                                "payload array items must be [key, value] pairs, got {other}"
                            )))
                        }
                    }
                }
                Ok(Payload::Pairs(pairs))
            }
            other => Err(ForwardError::Decode(format!(
                "payload must be a mapping or a pair sequence, got {other}"
            ))),
        }
    }

    /// Parse raw bytes as JSON and classify them.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ForwardError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ForwardError::Decode(format!("payload is not valid JSON: {e}")))?;
        Self::from_json(value)
    }

    /// Normalize into the canonical ordered field mapping.
    ///
    /// JSON numbers become floats, strings text, booleans booleans; a
    /// nested array or object value is a decode error. Duplicate keys are
    /// last-write-wins.
    pub fn decode(self) -> Result<FieldSet, ForwardError> {
        let pairs = match self {
            Payload::Mapping(pairs) | Payload::Pairs(pairs) => pairs,
        };

        let mut fields = FieldSet::new();
        for (key, value) in pairs {
            let field = FieldValue::from_json(&value).ok_or_else(|| {
                ForwardError::Decode(format!("field {key:?} carries a non-scalar value"))
            })?;
            fields.insert(key, field);
        }
        Ok(fields)
    }
}

/// One delivered bus message.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Payload,
}

/// Subscription callback: `(topic, payload)`.
pub type BusHandler = Arc<dyn Fn(&str, Payload) + Send + Sync>;

/// The publish/subscribe transport surface this crate consumes.
pub trait MessageBus {
    /// Register `handler` for topics matching `pattern`
    /// (MQTT-style: `+` one level, `#` remainder).
    fn subscribe(&self, pattern: &str, handler: BusHandler);
}

/// MQTT-style topic pattern match.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_levels = pattern.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (pattern_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(expected), Some(level)) if expected == level => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// In-process bus for tests and embedding.
#[derive(Default)]
pub struct MemoryBus {
    subscriptions: Mutex<Vec<(String, BusHandler)>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a payload to every matching subscription, in subscription
    /// order.
    pub fn publish(&self, topic: &str, payload: Payload) {
        let subscriptions = self.subscriptions.lock();
        for (pattern, handler) in subscriptions.iter() {
            if topic_matches(pattern, topic) {
                handler(topic, payload.clone());
            }
        }
    }

    /// Classify a JSON value at the transport boundary and deliver it.
    ///
    /// An unrecognized shape is logged and dropped here; subscribers never
    /// see it.
    pub fn publish_json(&self, topic: &str, value: Value) {
        match Payload::from_json(value) {
            Ok(payload) => self.publish(topic, payload),
            Err(err) => {
                tracing::warn!(topic, error = %err, "dropping undecodable bus payload");
            }
        }
    }
}

impl MessageBus for MemoryBus {
    fn subscribe(&self, pattern: &str, handler: BusHandler) {
        self.subscriptions.lock().push((pattern.to_string(), handler));
    }
}
