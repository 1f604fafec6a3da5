// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Adapter registry keyed by `(host, port, database)`.
//!
//! Store calls share one adapter per target database instead of paying an
//! idempotent create-database round trip per message. Connect runs under
//! the per-entry lock, so concurrent first use of a database performs a
//! single round trip.

use crate::adapter::StorageAdapter;
use crate::chunk::FieldSet;
use crate::config::{RelayConfig, StorageSettings};
use crate::error::ForwardError;
use crate::topology::StorageLocation;
use crate::transport::{BackendTransport, HttpTransport};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

type Key = (String, u16, String);

/// Shared registry of storage adapters.
pub struct AdapterPool {
    settings: StorageSettings,
    transport: Arc<dyn BackendTransport>,
    adapters: Mutex<HashMap<Key, Arc<Mutex<StorageAdapter>>>>,
}

impl AdapterPool {
    /// Build a pool over an explicit transport.
    ///
    /// The protocol version is validated once here; an unsupported version
    /// is fatal.
    pub fn new(
        settings: StorageSettings,
        transport: Arc<dyn BackendTransport>,
    ) -> Result<Self, ForwardError> {
        settings.version.parse::<crate::protocol::DialectVersion>()?;
        Ok(Self { settings, transport, adapters: Mutex::new(HashMap::new()) })
    }

    /// Build a pool with an HTTP transport configured from `config`.
    pub fn from_config(config: &RelayConfig) -> Result<Arc<Self>, ForwardError> {
        let transport = Arc::new(HttpTransport::new(Duration::from_millis(
            config.pipeline.write_timeout_ms,
        ))?);
        Ok(Arc::new(Self::new(config.storage.clone(), transport)?))
    }

    /// Get or create the shared adapter for `database`.
    pub fn adapter(&self, database: &str) -> Result<Arc<Mutex<StorageAdapter>>, ForwardError> {
        let key = (
            self.settings.host.clone(),
            self.settings.port,
            database.to_string(),
        );

        let mut adapters = self.adapters.lock();
        if let Some(entry) = adapters.get(&key) {
            return Ok(Arc::clone(entry));
        }

        let adapter = StorageAdapter::new(&self.settings, database, Arc::clone(&self.transport))?;
        let entry = Arc::new(Mutex::new(adapter));
        adapters.insert(key, Arc::clone(&entry));
        Ok(entry)
    }

    /// Connect (idempotent) and write one record at `location`.
    ///
    /// Returns the backend acknowledgement as a boolean; all failure detail
    /// goes to the log, matching the adapter's error surface.
    pub fn store(&self, location: &StorageLocation, fields: FieldSet) -> bool {
        let entry = match self.adapter(&location.database) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::error!(database = %location.database, error = %err, "adapter unavailable");
                return false;
            }
        };

        let mut adapter = entry.lock();
        if !adapter.connect() {
            return false;
        }
        adapter.write(&location.series, fields)
    }

    /// Number of distinct adapters created so far.
    pub fn len(&self) -> usize {
        self.adapters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.lock().is_empty()
    }
}
