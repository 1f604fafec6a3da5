// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML configuration for the forwarding service.

use crate::error::ForwardError;
use crate::protocol::DialectVersion;
use serde::Deserialize;
use std::path::Path;

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Storage backend connection settings.
    pub storage: StorageSettings,
    /// Logical realms consuming distinct topic subtrees.
    #[serde(default)]
    pub realms: Vec<RealmSettings>,
    /// Store pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Storage backend connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Backend protocol version: `"0.8"` or `"0.9"`.
    pub version: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// One logical realm: a topic subtree persisted into one database.
#[derive(Debug, Clone, Deserialize)]
pub struct RealmSettings {
    pub name: String,
    /// Target database for this realm.
    pub database: String,
    /// Bus subscription pattern (MQTT-style).
    pub subscribe: String,
}

/// Store pipeline tuning.
///
/// `workers = 0` stores inline in the bus callback instead of handing the
/// job to the worker pool; the backend round trip then blocks message
/// handling, which is only appropriate for tests and low-rate embedders.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Bounded store queue capacity; a full queue drops the job.
    pub queue_capacity: usize,
    /// Worker threads draining the store queue.
    pub workers: usize,
    /// Per-request HTTP timeout.
    pub write_timeout_ms: u64,
    /// Additional attempts after a failed store.
    pub retry_max: u32,
    /// Base backoff between attempts, doubled per retry.
    pub retry_backoff_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 512,
            workers: 2,
            write_timeout_ms: 5000,
            retry_max: 2,
            retry_backoff_ms: 250,
        }
    }
}

fn default_port() -> u16 {
    8086
}

impl RelayConfig {
    /// Parse configuration from a YAML string and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self, ForwardError> {
        let config: RelayConfig = serde_yaml::from_str(yaml)
            .map_err(|e| ForwardError::Configuration(format!("yaml parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ForwardError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ForwardError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Look up a realm by name.
    pub fn realm(&self, name: &str) -> Option<&RealmSettings> {
        self.realms.iter().find(|realm| realm.name == name)
    }

    fn validate(&self) -> Result<(), ForwardError> {
        // Unsupported versions fail here, before any adapter exists.
        self.storage.version.parse::<DialectVersion>()?;
        for realm in &self.realms {
            if realm.database.is_empty() {
                return Err(ForwardError::Configuration(format!(
                    "realm {:?} has an empty database name",
                    realm.name
                )));
            }
        }
        Ok(())
    }
}
