// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end pipeline: memory bus -> forwarder -> mock backend.

use fluxgate::{
    AdapterPool, BackendTransport, Forwarder, MemoryBus, MockTransport, PipelineSettings,
    RelayConfig, TopicPathResolver,
};
use serde_json::json;
use std::sync::Arc;

const CONFIG_YAML: &str = r#"
storage:
  version: "0.9"
  host: "localhost"
  username: "root"
  password: "root"
realms:
  - name: "site1"
    database: "site1"
    subscribe: "site1/#"
pipeline:
  workers: 0
"#;

fn build(transport: &Arc<MockTransport>) -> (MemoryBus, Arc<Forwarder>, RelayConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let config = RelayConfig::from_yaml(CONFIG_YAML).unwrap();
    let shared: Arc<dyn BackendTransport> = transport.clone();
    let pool = Arc::new(AdapterPool::new(config.storage.clone(), shared).unwrap());

    let forwarder = Arc::new(
        Forwarder::builder(TopicPathResolver)
            .pipeline(config.pipeline.clone())
            .build(pool),
    );

    let bus = MemoryBus::new();
    forwarder.attach(&bus, &config.realm("site1").unwrap().subscribe);
    (bus, forwarder, config)
}

#[test]
fn telemetry_reading_lands_in_resolved_database_and_series() {
    let transport = Arc::new(MockTransport::new());
    let (bus, _forwarder, _config) = build(&transport);

    bus.publish_json("site1/sensorA", json!({"temperature": "21.5", "humidity": 40}));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);

    let create = &requests[0].1;
    assert_eq!(create.path, "/query");
    assert_eq!(create.query_param("q"), Some("CREATE DATABASE \"site1\""));

    let write = requests[1].1.body.clone().unwrap();
    assert_eq!(write["database"], json!("site1"));
    assert_eq!(write["precision"], json!("n"));
    assert_eq!(write["points"][0]["measurement"], json!("sensorA"));
    assert_eq!(
        write["points"][0]["fields"],
        json!({"temperature": 21.5, "humidity": 40.0})
    );
}

#[test]
fn repeated_messages_reuse_the_pooled_adapter() {
    let transport = Arc::new(MockTransport::new());
    let (bus, _forwarder, _config) = build(&transport);

    bus.publish_json("site1/sensorA", json!({"v": 1}));
    bus.publish_json("site1/sensorA", json!({"v": 2}));
    bus.publish_json("site1/sensorB", json!({"v": 3}));

    // sensorA and sensorB share the site1 database: one create, three writes.
    let requests = transport.requests();
    let paths: Vec<&str> = requests.iter().map(|(_, request)| request.path.as_str()).collect();
    assert_eq!(paths.iter().filter(|p| **p == "/query").count(), 1);
    assert_eq!(paths.iter().filter(|p| **p == "/write").count(), 3);
}

#[test]
fn undecodable_payload_does_not_stop_consumption() {
    let transport = Arc::new(MockTransport::new());
    let (bus, _forwarder, _config) = build(&transport);

    // Neither a mapping nor a pair sequence: classified out at the boundary.
    bus.publish_json("site1/sensorA", json!("21.5;40"));
    bus.publish_json("site1/sensorA", json!(42));
    // Decodes as a payload but carries a nested value: dropped in receive.
    bus.publish_json("site1/sensorA", json!({"v": [1, 2, 3]}));
    assert_eq!(transport.request_count(), 0);

    bus.publish_json("site1/sensorA", json!({"v": 1}));
    assert_eq!(transport.request_count(), 2);
}

#[test]
fn messages_outside_the_subscription_are_ignored() {
    let transport = Arc::new(MockTransport::new());
    let (bus, _forwarder, _config) = build(&transport);

    bus.publish_json("site2/sensorA", json!({"v": 1}));
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn ordered_pair_payloads_flow_end_to_end() {
    let transport = Arc::new(MockTransport::new());
    let (bus, _forwarder, _config) = build(&transport);

    bus.publish_json("site1/sensorA", json!([["b", "2"], ["a", 1]]));

    let write = transport.requests()[1].1.body.clone().unwrap();
    // Pair order survives into the wire body.
    assert_eq!(write["points"][0]["fields"], json!({"b": 2.0, "a": 1.0}));
    let fields = write["points"][0]["fields"].as_object().unwrap();
    let keys: Vec<&String> = fields.keys().collect();
    assert_eq!(keys, ["b", "a"]);
}

#[test]
fn worker_pipeline_stores_asynchronously() {
    let transport = Arc::new(MockTransport::new());
    let config = RelayConfig::from_yaml(CONFIG_YAML).unwrap();
    let shared: Arc<dyn BackendTransport> = transport.clone();
    let pool = Arc::new(AdapterPool::new(config.storage.clone(), shared).unwrap());

    let forwarder = Arc::new(
        Forwarder::builder(TopicPathResolver)
            .pipeline(PipelineSettings { workers: 2, queue_capacity: 32, ..PipelineSettings::default() })
            .build(pool),
    );

    let bus = MemoryBus::new();
    forwarder.attach(&bus, "site1/#");
    for i in 0..10 {
        bus.publish_json("site1/sensorA", json!({"v": i}));
    }

    // The forwarder owns the pipeline; dropping it joins the workers after
    // the queue drains.
    drop(bus);
    match Arc::try_unwrap(forwarder) {
        Ok(forwarder) => drop(forwarder),
        Err(_) => panic!("forwarder still shared"),
    }

    assert_eq!(transport.request_count(), 11);
}
