// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The decode/route/store pipeline.
//!
//! [`Forwarder::receive`] runs decode, resolution and the encode hook, then
//! hands the job to a [`StorePipeline`]. Every per-message error is
//! contained at the `receive` boundary: it is logged and the message
//! dropped, the subscription survives (at-most-once consumption).
//!
//! The store itself runs on a bounded queue drained by worker threads so a
//! stalled backend cannot starve the bus callback; `workers = 0` keeps the
//! write inline for deterministic embedding.

use crate::bus::{BusHandler, BusMessage, MessageBus, Payload};
use crate::chunk::FieldSet;
use crate::config::PipelineSettings;
use crate::error::ForwardError;
use crate::pool::AdapterPool;
use crate::topology::{StorageLocation, TopologyResolver};
use crossbeam::channel::{bounded, Sender, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Message transform applied between resolution and store.
pub type EncodeHook = Arc<dyn Fn(FieldSet) -> FieldSet + Send + Sync>;

/// Post-store side-effect hook: `(database, series, data)`.
pub type StoreHook = Arc<dyn Fn(&str, &str, &FieldSet) + Send + Sync>;

/// One pending store operation.
pub struct StoreJob {
    pub location: StorageLocation,
    pub fields: FieldSet,
}

/// Bounded store queue with worker threads and bounded retry.
pub struct StorePipeline {
    pool: Arc<AdapterPool>,
    settings: PipelineSettings,
    on_store: Option<StoreHook>,
    sender: Option<Sender<StoreJob>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl StorePipeline {
    pub fn new(
        pool: Arc<AdapterPool>,
        settings: PipelineSettings,
        on_store: Option<StoreHook>,
    ) -> Self {
        if settings.workers == 0 {
            return Self { pool, settings, on_store, sender: None, workers: Vec::new() };
        }

        let (sender, receiver) = bounded::<StoreJob>(settings.queue_capacity);
        let mut workers = Vec::with_capacity(settings.workers);
        for _ in 0..settings.workers {
            let receiver = receiver.clone();
            let pool = Arc::clone(&pool);
            let settings = settings.clone();
            let on_store = on_store.clone();
            workers.push(thread::spawn(move || {
                for job in receiver.iter() {
                    run_job(&pool, &settings, on_store.as_ref(), job);
                }
            }));
        }

        Self { pool, settings, on_store, sender: Some(sender), workers }
    }

    /// Submit a job. Never blocks: with a full queue the job is dropped and
    /// logged.
    pub fn submit(&self, job: StoreJob) {
        match &self.sender {
            None => run_job(&self.pool, &self.settings, self.on_store.as_ref(), job),
            Some(sender) => match sender.try_send(job) {
                Ok(()) => {}
                Err(TrySendError::Full(job)) => {
                    tracing::warn!(
                        database = %job.location.database,
                        series = %job.location.series,
                        "store queue full; measurement dropped"
                    );
                }
                Err(TrySendError::Disconnected(_)) => {
                    tracing::error!("store pipeline stopped; measurement dropped");
                }
            },
        }
    }
}

impl Drop for StorePipeline {
    fn drop(&mut self) {
        // Closing the channel lets workers drain outstanding jobs and exit.
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn run_job(
    pool: &AdapterPool,
    settings: &PipelineSettings,
    on_store: Option<&StoreHook>,
    job: StoreJob,
) {
    let StoreJob { location, fields } = job;

    let mut stored = false;
    for attempt in 0..=settings.retry_max {
        if attempt > 0 {
            let backoff = Duration::from_millis(settings.retry_backoff_ms)
                * 2u32.saturating_pow(attempt - 1);
            tracing::debug!(
                database = %location.database,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "retrying store"
            );
            thread::sleep(backoff);
        }
        if pool.store(&location, fields.clone()) {
            stored = true;
            break;
        }
    }

    if !stored {
        tracing::error!(
            database = %location.database,
            series = %location.series,
            attempts = settings.retry_max + 1,
            "store failed; measurement dropped"
        );
    }

    if let Some(hook) = on_store {
        hook(&location.database, &location.series, &fields);
    }
}

/// Bus-to-storage forwarder.
///
/// Constructed through [`Forwarder::builder`], which requires a
/// [`TopologyResolver`] up front — there is no deferred "unresolved"
/// failure mode.
pub struct Forwarder {
    resolver: Arc<dyn TopologyResolver>,
    encode: Option<EncodeHook>,
    pipeline: StorePipeline,
}

impl Forwarder {
    pub fn builder(resolver: impl TopologyResolver + 'static) -> ForwarderBuilder {
        ForwarderBuilder {
            resolver: Arc::new(resolver),
            encode: None,
            on_store: None,
            settings: PipelineSettings::default(),
        }
    }

    /// Handle one bus delivery.
    ///
    /// Decode, resolution and encode errors are logged and swallowed here;
    /// a bad message never tears down the subscription and is not
    /// redelivered.
    pub fn receive(&self, topic: &str, payload: Payload) {
        if let Err(err) = self.process(topic, payload) {
            tracing::error!(topic, error = %err, "processing bus message failed; message dropped");
        }
    }

    fn process(&self, topic: &str, payload: Payload) -> Result<(), ForwardError> {
        let message = payload.decode()?;
        tracing::debug!(topic, fields = message.len(), "bus receive");

        let location = self.resolver.resolve(topic, &message)?;
        tracing::debug!(
            topic,
            database = %location.database,
            series = %location.series,
            "storage location resolved"
        );

        let data = match &self.encode {
            Some(hook) => hook(message),
            None => message,
        };

        self.pipeline.submit(StoreJob { location, fields: data });
        Ok(())
    }

    /// Handle one delivered [`BusMessage`].
    pub fn receive_message(&self, message: BusMessage) {
        self.receive(&message.topic, message.payload);
    }

    /// Subscribe this forwarder on a bus.
    pub fn attach(self: &Arc<Self>, bus: &dyn MessageBus, pattern: &str) {
        let forwarder = Arc::clone(self);
        let handler: BusHandler = Arc::new(move |topic, payload| forwarder.receive(topic, payload));
        bus.subscribe(pattern, handler);
    }
}

/// Builder for [`Forwarder`].
pub struct ForwarderBuilder {
    resolver: Arc<dyn TopologyResolver>,
    encode: Option<EncodeHook>,
    on_store: Option<StoreHook>,
    settings: PipelineSettings,
}

impl ForwarderBuilder {
    /// Transform messages between resolution and store. Default: identity.
    pub fn encode(mut self, hook: impl Fn(FieldSet) -> FieldSet + Send + Sync + 'static) -> Self {
        self.encode = Some(Arc::new(hook));
        self
    }

    /// Side-effect hook invoked after the store attempt (metrics,
    /// downstream chaining). Default: no-op.
    pub fn on_store(mut self, hook: impl Fn(&str, &str, &FieldSet) + Send + Sync + 'static) -> Self {
        self.on_store = Some(Arc::new(hook));
        self
    }

    pub fn pipeline(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self, pool: Arc<AdapterPool>) -> Forwarder {
        let pipeline = StorePipeline::new(pool, self.settings, self.on_store);
        Forwarder { resolver: self.resolver, encode: self.encode, pipeline }
    }
}
