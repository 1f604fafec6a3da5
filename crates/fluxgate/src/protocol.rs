// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Backend wire dialects.
//!
//! The two supported protocol generations differ in endpoint layout, write
//! body shape, and how a "database already exists" conflict is reported.
//! A [`WireDialect`] strategy is selected once at adapter construction;
//! nothing version-branches per call after that.

use crate::chunk::Chunk;
use crate::error::ForwardError;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Supported backend protocol generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectVersion {
    /// Legacy columnar JSON protocol (`0.8`).
    V08,
    /// Current measurement/fields protocol (`0.9`).
    V09,
}

impl FromStr for DialectVersion {
    type Err = ForwardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0.8" => Ok(DialectVersion::V08),
            "0.9" => Ok(DialectVersion::V09),
            other => Err(ForwardError::Configuration(format!(
                "unsupported backend protocol version {other:?} (expected \"0.8\" or \"0.9\")"
            ))),
        }
    }
}

impl fmt::Display for DialectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialectVersion::V08 => write!(f, "0.8"),
            DialectVersion::V09 => write!(f, "0.9"),
        }
    }
}

/// Backend credentials, passed as query parameters by both dialects.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    fn query(&self) -> Vec<(String, String)> {
        vec![
            ("u".into(), self.username.clone()),
            ("p".into(), self.password.clone()),
        ]
    }
}

/// HTTP method of a backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A backend request, transport-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl BackendRequest {
    /// Look up a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A backend response as seen by the adapter.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: u16,
    pub body: String,
}

impl BackendResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Version-specific request construction and conflict detection.
pub trait WireDialect: Send + Sync {
    /// Idempotent create-database request.
    fn create_database(&self, database: &str, credentials: &Credentials) -> BackendRequest;

    /// Write one record with nanosecond time precision.
    fn write(&self, database: &str, credentials: &Credentials, chunk: &Chunk) -> BackendRequest;

    /// Whether a create-database response means the database already exists,
    /// which is treated as success.
    fn is_already_exists(&self, response: &BackendResponse) -> bool;
}

/// Select the dialect strategy for a protocol version.
pub fn dialect_for(version: DialectVersion) -> Box<dyn WireDialect> {
    match version {
        DialectVersion::V08 => Box::new(LegacyDialect),
        DialectVersion::V09 => Box::new(CurrentDialect),
    }
}

/// Legacy `0.8` protocol: `/db` management endpoints, columnar write bodies,
/// conflicts reported via HTTP 409.
struct LegacyDialect;

impl WireDialect for LegacyDialect {
    fn create_database(&self, database: &str, credentials: &Credentials) -> BackendRequest {
        BackendRequest {
            method: Method::Post,
            path: "/db".into(),
            query: credentials.query(),
            body: Some(json!({ "name": database })),
        }
    }

    fn write(&self, database: &str, credentials: &Credentials, chunk: &Chunk) -> BackendRequest {
        let mut columns: Vec<Value> = Vec::with_capacity(chunk.fields.len() + 1);
        let mut row: Vec<Value> = Vec::with_capacity(chunk.fields.len() + 1);

        if let Some(time) = chunk.time {
            columns.push(json!("time"));
            row.push(json!(time));
        }
        // Tags have no columnar representation; the legacy protocol predates them.
        for (key, value) in chunk.fields.iter() {
            columns.push(json!(key));
            row.push(value.to_json());
        }

        let mut query = credentials.query();
        query.push(("time_precision".into(), "n".into()));

        BackendRequest {
            method: Method::Post,
            path: format!("/db/{database}/series"),
            query,
            body: Some(json!([{
                "name": chunk.measurement,
                "columns": columns,
                "points": [row],
            }])),
        }
    }

    fn is_already_exists(&self, response: &BackendResponse) -> bool {
        response.status == 409
    }
}

/// Current `0.9` protocol: query-language database management, record bodies
/// keyed by measurement/fields, conflicts reported as a message string.
struct CurrentDialect;

const ALREADY_EXISTS_MESSAGE: &str = "database already exists";

impl WireDialect for CurrentDialect {
    fn create_database(&self, database: &str, credentials: &Credentials) -> BackendRequest {
        let mut query = credentials.query();
        query.push(("q".into(), format!("CREATE DATABASE \"{database}\"")));

        BackendRequest {
            method: Method::Get,
            path: "/query".into(),
            query,
            body: None,
        }
    }

    fn write(&self, database: &str, credentials: &Credentials, chunk: &Chunk) -> BackendRequest {
        let mut record = serde_json::Map::new();
        record.insert("measurement".into(), json!(chunk.measurement));
        if let Some(tags) = &chunk.tags {
            if !tags.is_empty() {
                record.insert("tags".into(), json!(tags));
            }
        }
        if let Some(time) = chunk.time {
            record.insert("time".into(), json!(time));
        }
        record.insert("fields".into(), chunk.fields.to_json());

        BackendRequest {
            method: Method::Post,
            path: "/write".into(),
            query: credentials.query(),
            body: Some(json!({
                "database": database,
                "precision": "n",
                "points": [Value::Object(record)],
            })),
        }
    }

    fn is_already_exists(&self, response: &BackendResponse) -> bool {
        response.body.contains(ALREADY_EXISTS_MESSAGE)
    }
}
