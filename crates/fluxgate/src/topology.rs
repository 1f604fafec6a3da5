// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic-to-storage-location resolution.
//!
//! The forwarding core has no built-in resolution logic: a
//! [`TopologyResolver`] strategy is injected at forwarder construction.
//! Resolvers are expected to run [`sanitize_identifier`] over any
//! topic-derived string before returning a location.

use crate::chunk::FieldSet;
use crate::error::ForwardError;

/// Resolved `(database, series)` pair identifying where a message is
/// persisted. Both identifiers must be identifier-safe (no `/`, `.`, `-`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    pub database: String,
    pub series: String,
}

impl StorageLocation {
    pub fn new(database: impl Into<String>, series: impl Into<String>) -> Self {
        Self { database: database.into(), series: series.into() }
    }
}

/// Maps a decoded bus message and its topic to a storage location.
pub trait TopologyResolver: Send + Sync {
    fn resolve(&self, topic: &str, message: &FieldSet) -> Result<StorageLocation, ForwardError>;
}

impl<F> TopologyResolver for F
where
    F: Fn(&str, &FieldSet) -> Result<StorageLocation, ForwardError> + Send + Sync,
{
    fn resolve(&self, topic: &str, message: &FieldSet) -> Result<StorageLocation, ForwardError> {
        self(topic, message)
    }
}

/// Replace characters the backend treats specially in identifiers.
pub fn sanitize_identifier(value: &str) -> String {
    value.replace(['/', '.', '-'], "_")
}

/// Bundled resolver mapping `<realm>/<rest>` topics to
/// database = `realm`, series = `rest`, both sanitized.
///
/// `"site1/sensorA"` resolves to database `site1`, series `sensorA`;
/// deeper topics fold the remainder into the series name.
pub struct TopicPathResolver;

impl TopologyResolver for TopicPathResolver {
    fn resolve(&self, topic: &str, _message: &FieldSet) -> Result<StorageLocation, ForwardError> {
        let (realm, rest) = topic.split_once('/').ok_or_else(|| {
            ForwardError::Resolution(format!("topic {topic:?} has no realm/series structure"))
        })?;
        if realm.is_empty() || rest.is_empty() {
            return Err(ForwardError::Resolution(format!(
                "topic {topic:?} has an empty realm or series segment"
            )));
        }
        Ok(StorageLocation::new(
            sanitize_identifier(realm),
            sanitize_identifier(rest),
        ))
    }
}
