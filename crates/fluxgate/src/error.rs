// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the forwarding pipeline.
//!
//! Connection-level outcomes surface as booleans from
//! [`StorageAdapter::connect`](crate::adapter::StorageAdapter::connect) and
//! the write methods; per-message errors are contained at the
//! [`Forwarder::receive`](crate::forwarder::Forwarder::receive) boundary and
//! never reach the bus subscription.

use thiserror::Error;

/// Errors raised while forwarding telemetry to the storage backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Unsupported backend protocol version or invalid configuration.
    /// Fatal at construction, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network-level failure reaching the backend. Non-fatal; surfaced as a
    /// boolean failure plus a log entry.
    #[error("backend unreachable: {0}")]
    Connectivity(String),

    /// Backend rejected the request for a reason other than
    /// "database already exists".
    #[error("backend rejected request (status {status}): {message}")]
    Backend { status: u16, message: String },

    /// Message payload shape is not a recognized encoding. The message is
    /// dropped and consumption continues.
    #[error("unrecognized payload encoding: {0}")]
    Decode(String),

    /// Storage location resolution failed for a message.
    #[error("storage location resolution failed: {0}")]
    Resolution(String),
}

impl ForwardError {
    /// Whether the error is fatal to the component raising it.
    ///
    /// Only configuration errors are fatal; everything else is contained
    /// per message or per connection attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ForwardError::Configuration(_))
    }
}
