// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Storage adapter: connection lifecycle and write paths.
//!
//! One adapter owns one backend connection. `connect` performs the
//! idempotent create-database round trip; a "database already exists"
//! conflict counts as success. Connection-level failures surface as
//! booleans plus log entries, never as panics or raised errors — callers
//! check return values at this layer.

use crate::chunk::{Chunk, FieldSet, FieldValue, LegacyChunk};
use crate::config::StorageSettings;
use crate::error::ForwardError;
use crate::protocol::{dialect_for, Credentials, DialectVersion, WireDialect};
use crate::schema::{coerce_field_types, legacy_to_current};
use crate::transport::{BackendTransport, Endpoint};
use std::sync::Arc;

/// Connection state owned exclusively by one adapter.
///
/// `connected` becomes true only after a successful (or already-exists)
/// create-database round trip and never transitions back; a failed
/// connection is retried by calling [`StorageAdapter::connect`] again or by
/// constructing a fresh adapter.
#[derive(Debug, Clone)]
pub struct Connection {
    pub endpoint: Endpoint,
    pub database: String,
    pub version: DialectVersion,
    credentials: Credentials,
    connected: bool,
}

/// Adapter for one backend database.
pub struct StorageAdapter {
    connection: Connection,
    dialect: Box<dyn WireDialect>,
    transport: Arc<dyn BackendTransport>,
}

impl StorageAdapter {
    /// Build an adapter for `database`.
    ///
    /// The protocol version is parsed once here; an unsupported version is
    /// a fatal configuration error, not retried.
    pub fn new(
        settings: &StorageSettings,
        database: &str,
        transport: Arc<dyn BackendTransport>,
    ) -> Result<Self, ForwardError> {
        let version: DialectVersion = settings.version.parse()?;
        let connection = Connection {
            endpoint: Endpoint::new(settings.host.clone(), settings.port),
            database: database.to_string(),
            version,
            credentials: Credentials {
                username: settings.username.clone(),
                password: settings.password.clone(),
            },
            connected: false,
        };
        Ok(Self { connection, dialect: dialect_for(version), transport })
    }

    pub fn is_connected(&self) -> bool {
        self.connection.connected
    }

    pub fn database(&self) -> &str {
        &self.connection.database
    }

    /// Ensure the target database exists. No-op success when already
    /// connected.
    ///
    /// Returns false on a network-level failure or a backend rejection
    /// other than "database already exists"; the outcome is logged either
    /// way.
    pub fn connect(&mut self) -> bool {
        if self.connection.connected {
            return true;
        }

        tracing::info!(
            backend = %self.connection.endpoint,
            database = %self.connection.database,
            version = %self.connection.version,
            "storage target"
        );

        let request = self
            .dialect
            .create_database(&self.connection.database, &self.connection.credentials);

        match self.transport.execute(&self.connection.endpoint, &request) {
            Err(err) => {
                tracing::error!(
                    backend = %self.connection.endpoint,
                    error = %err,
                    "backend network error during connect"
                );
                false
            }
            Ok(response) => {
                if response.is_success() || self.dialect.is_already_exists(&response) {
                    self.connection.connected = true;
                    true
                } else {
                    tracing::error!(
                        database = %self.connection.database,
                        status = response.status,
                        body = %response.body,
                        "create database rejected"
                    );
                    false
                }
            }
        }
    }

    /// Write one record built from `series` and `fields`.
    pub fn write(&mut self, series: &str, fields: FieldSet) -> bool {
        self.write_chunk(Chunk::new(series, fields))
    }

    /// Write one record from column/value vectors (legacy-shaped producers).
    pub fn write_points(&mut self, series: &str, columns: Vec<String>, points: Vec<FieldValue>) -> bool {
        let record = LegacyChunk {
            name: series.to_string(),
            columns,
            points: vec![points],
        };
        match legacy_to_current(&record) {
            Ok(chunk) => self.write_chunk(chunk),
            Err(err) => {
                tracing::error!(series, error = %err, "malformed columnar record");
                false
            }
        }
    }

    /// Write one record, returning the backend acknowledgement.
    ///
    /// Applies field-type coercion first, then dispatches through the
    /// dialect chosen at construction with nanosecond time precision.
    /// A transport failure is logged and reported as false; there is no
    /// retry at this layer.
    pub fn write_chunk(&mut self, mut chunk: Chunk) -> bool {
        coerce_field_types(&mut chunk.fields);

        let request = self.dialect.write(
            &self.connection.database,
            &self.connection.credentials,
            &chunk,
        );

        match self.transport.execute(&self.connection.endpoint, &request) {
            Err(err) => {
                tracing::error!(
                    backend = %self.connection.endpoint,
                    measurement = %chunk.measurement,
                    error = %err,
                    "backend network error during write"
                );
                false
            }
            Ok(response) if response.is_success() => {
                tracing::debug!(
                    database = %self.connection.database,
                    measurement = %chunk.measurement,
                    fields = chunk.fields.len(),
                    "measurement stored"
                );
                true
            }
            Ok(response) => {
                tracing::error!(
                    database = %self.connection.database,
                    measurement = %chunk.measurement,
                    status = response.status,
                    body = %response.body,
                    "storing measurement failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::BackendResponse;
    use crate::transport::MockTransport;
    use serde_json::json;

    fn settings(version: &str) -> StorageSettings {
        StorageSettings {
            version: version.into(),
            host: "localhost".into(),
            port: 8086,
            username: "root".into(),
            password: "root".into(),
        }
    }

    fn adapter(version: &str, transport: &Arc<MockTransport>) -> StorageAdapter {
        let shared: Arc<dyn BackendTransport> = transport.clone();
        StorageAdapter::new(&settings(version), "site1", shared).unwrap()
    }

    #[test]
    fn test_unsupported_version_is_fatal_at_construction() {
        let transport: Arc<dyn BackendTransport> = Arc::new(MockTransport::new());
        let err = StorageAdapter::new(&settings("1.1"), "site1", transport).err().unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_connect_succeeds_and_second_call_is_noop() {
        for version in ["0.8", "0.9"] {
            let transport = Arc::new(MockTransport::new());
            let mut adapter = adapter(version, &transport);

            assert!(!adapter.is_connected());
            assert!(adapter.connect());
            assert!(adapter.is_connected());
            assert_eq!(transport.request_count(), 1);

            // Already connected: no second create-database round trip.
            assert!(adapter.connect());
            assert_eq!(transport.request_count(), 1);
        }
    }

    #[test]
    fn test_already_exists_conflict_counts_as_success() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(BackendResponse { status: 409, body: "database site1 exists".into() });
        let mut adapter = adapter("0.8", &transport);
        assert!(adapter.connect());
        assert!(adapter.is_connected());

        let transport = Arc::new(MockTransport::new());
        transport.push_response(BackendResponse {
            status: 500,
            body: r#"{"error":"database already exists"}"#.into(),
        });
        let mut adapter = self::adapter("0.9", &transport);
        assert!(adapter.connect());
        assert!(adapter.is_connected());
    }

    #[test]
    fn test_connect_network_failure_leaves_disconnected() {
        let transport = Arc::new(MockTransport::new());
        transport.push_error(ForwardError::Connectivity("connection refused".into()));
        let mut adapter = adapter("0.9", &transport);

        assert!(!adapter.connect());
        assert!(!adapter.is_connected());

        // A later attempt may succeed without constructing a new adapter.
        assert!(adapter.connect());
        assert!(adapter.is_connected());
    }

    #[test]
    fn test_connect_backend_rejection_leaves_disconnected() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(BackendResponse { status: 401, body: "authorization failed".into() });
        let mut adapter = adapter("0.9", &transport);

        assert!(!adapter.connect());
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_write_coerces_numeric_text_before_dispatch() {
        let transport = Arc::new(MockTransport::new());
        let mut adapter = adapter("0.9", &transport);

        let mut fields = FieldSet::new();
        fields.insert("temperature", FieldValue::Text("21.5".into()));
        fields.insert("humidity", FieldValue::Float(40.0));
        assert!(adapter.write("sensorA", fields));

        let (_, request) = transport.requests().pop().unwrap();
        assert_eq!(
            request.body.unwrap()["points"][0]["fields"],
            json!({"temperature": 21.5, "humidity": 40.0})
        );
    }

    #[test]
    fn test_write_failure_is_logged_not_raised() {
        let transport = Arc::new(MockTransport::new());
        transport.push_error(ForwardError::Connectivity("broken pipe".into()));
        let mut adapter = adapter("0.9", &transport);

        let mut fields = FieldSet::new();
        fields.insert("value", FieldValue::Float(0.42));
        assert!(!adapter.write("telemetry", fields.clone()));

        // Backend rejection is also a plain false.
        let transport = Arc::new(MockTransport::new());
        transport.push_response(BackendResponse { status: 400, body: "field type conflict".into() });
        let mut adapter = self::adapter("0.9", &transport);
        assert!(!adapter.write("telemetry", fields));
    }

    #[test]
    fn test_write_points_builds_columnar_record() {
        let transport = Arc::new(MockTransport::new());
        let mut adapter = adapter("0.8", &transport);

        assert!(adapter.write_points(
            "telemetry",
            vec!["value".into()],
            vec![FieldValue::Float(0.42)],
        ));

        let (_, request) = transport.requests().pop().unwrap();
        assert_eq!(request.path, "/db/site1/series");
        assert_eq!(
            request.body.unwrap(),
            json!([{"name": "telemetry", "columns": ["value"], "points": [[0.42]]}])
        );
    }

    #[test]
    fn test_write_points_arity_mismatch_returns_false() {
        let transport = Arc::new(MockTransport::new());
        let mut adapter = adapter("0.9", &transport);

        assert!(!adapter.write_points(
            "telemetry",
            vec!["a".into(), "b".into()],
            vec![FieldValue::Float(1.0)],
        ));
        assert_eq!(transport.request_count(), 0);
    }
}
