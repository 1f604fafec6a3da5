// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluxgate Telemetry Forwarder
//!
//! Consumes decoded telemetry readings from a publish/subscribe bus and
//! persists them into an InfluxDB-family time-series backend, resolving per
//! message which database and series the reading belongs to.
//!
//! # Architecture
//!
//! ```text
//! Bus (MQTT/WAMP/...) --> Forwarder --> TopologyResolver --> StorePipeline
//!                                                                 |
//!                                        AdapterPool --> StorageAdapter --> backend HTTP API
//! ```
//!
//! The crate does not own any bus transport. Transports deliver messages
//! through the [`bus::MessageBus`] trait; [`bus::MemoryBus`] is an in-process
//! implementation for tests and embedding.
//!
//! Two backend wire generations are supported, selected once at adapter
//! construction: the legacy `0.8` JSON series protocol and the current `0.9`
//! measurement/fields protocol. Writes request nanosecond time precision and
//! database creation is idempotent on both.
//!
//! # Example
//!
//! ```ignore
//! use fluxgate::{AdapterPool, Forwarder, MemoryBus, RelayConfig, TopicPathResolver};
//! use std::sync::Arc;
//!
//! let config = RelayConfig::from_file(Path::new("fluxgate.yaml"))?;
//! let pool = AdapterPool::from_config(&config)?;
//! let forwarder = Arc::new(
//!     Forwarder::builder(TopicPathResolver)
//!         .pipeline(config.pipeline.clone())
//!         .build(pool),
//! );
//! forwarder.attach(&bus, "telemetry/#");
//! ```

pub mod adapter;
pub mod bus;
pub mod chunk;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod pool;
pub mod protocol;
pub mod schema;
pub mod topology;
pub mod transport;

pub use adapter::StorageAdapter;
pub use bus::{BusMessage, MemoryBus, MessageBus, Payload};
pub use chunk::{Chunk, FieldSet, FieldValue, LegacyChunk};
pub use config::{PipelineSettings, RealmSettings, RelayConfig, StorageSettings};
pub use error::ForwardError;
pub use forwarder::{Forwarder, ForwarderBuilder, StorePipeline};
pub use pool::AdapterPool;
pub use protocol::DialectVersion;
pub use schema::{coerce_field_types, legacy_to_current};
pub use topology::{sanitize_identifier, StorageLocation, TopicPathResolver, TopologyResolver};
pub use transport::{BackendTransport, Endpoint, HttpTransport, MockTransport};
