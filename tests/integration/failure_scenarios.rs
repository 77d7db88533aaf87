//! Failure tests for the ingestion and pipeline actors
//!
//! These tests verify that the system handles failures gracefully:
//! - Malformed payloads are dropped without stopping the stream
//! - Odd but decodable payloads still produce evaluations
//! - A lost broker connection winds the pipeline down
//! - A gateway stuck on a full queue still leaves the broker cleanly

use std::time::Duration;

use drone_analytics::{
    actors::{
        ingestion::{GatewayHandle, Ingestion, QUEUE_CAPACITY},
        messages::{IngestionStats, MessageKind},
        pipeline::PipelineHandle,
    },
    config::{AnalyticsConfig, MqttConfig},
    metrics::MetricsSink,
};
use tokio::sync::mpsc;

use crate::helpers::*;

#[tokio::test]
async fn test_malformed_payloads_are_dropped() {
    let pipeline = spawn_pipeline(AnalyticsConfig::default());
    let mut ingestion = Ingestion::new(pipeline.queue.clone());

    let bodies: [(&str, &[u8]); 5] = [
        ("drone/alpha/telemetry", br#"{"seq": 1, "battery_pct": 90, "altitude_m": 10.5}"#),
        ("drone/alpha/telemetry", b"not json at all"),
        ("drone/alpha/event", b"[1, 2, 3]"),
        ("drone/alpha/event", &[0xc3, 0x28]),
        ("drone/alpha/telemetry", br#"{"seq": 2, "battery_pct": 89, "altitude_m": 10.5}"#),
    ];
    for (topic, body) in bodies {
        ingestion.handle_publish(topic, body).await.unwrap();
    }

    assert_eq!(
        ingestion.stats(),
        IngestionStats {
            received: 5,
            enqueued: 2,
            dropped: 3
        }
    );

    let status = wait_for_processed(&pipeline.handle, 2).await;
    let last = status.last_evaluation.unwrap();
    assert_eq!(status.processed, 2);
    assert_eq!(last.kind, MessageKind::Telemetry);
    assert_eq!(last.features.battery_delta, -1.0);
}

#[tokio::test]
async fn test_mistyped_fields_still_evaluated() {
    let pipeline = spawn_pipeline(AnalyticsConfig::default());
    let mut ingestion = Ingestion::new(pipeline.queue.clone());

    ingestion
        .handle_publish("d/telemetry", br#"{"battery_pct": "80", "altitude_m": 10}"#)
        .await
        .unwrap();
    ingestion
        .handle_publish("d/telemetry", br#"{"battery_pct": null, "altitude_m": "up"}"#)
        .await
        .unwrap();
    ingestion
        .handle_publish("d/event", br#"{"type": 5, "severity": "panic"}"#)
        .await
        .unwrap();

    let status = wait_for_processed(&pipeline.handle, 3).await;
    let last = status.last_evaluation.unwrap();

    assert_eq!(last.kind, MessageKind::Event);
    assert_eq!(last.features.event_severity, 0.0);
    assert_eq!(last.features.battery_low_event, 0.0);
    assert_eq!(status.last_grace_trigger, None);
}

#[tokio::test]
async fn test_pipeline_stops_when_queue_closes() {
    let pipeline = spawn_pipeline(AnalyticsConfig::default());

    pipeline.queue.send(telemetry(1, 50.0, 10.0)).await.unwrap();
    drop(pipeline.queue);

    let result = tokio::time::timeout(Duration::from_secs(2), pipeline.task)
        .await
        .expect("pipeline should stop")
        .unwrap();

    assert!(result.is_err());
    assert_eq!(pipeline.metrics.state(), 0);
}

#[tokio::test]
async fn test_unreachable_broker_ends_pipeline() {
    let mqtt = MqttConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        ..Default::default()
    };

    let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
    let gateway = GatewayHandle::spawn(&mqtt, queue_tx);
    let (_handle, task) = PipelineHandle::spawn(
        AnalyticsConfig::default(),
        queue_rx,
        MetricsSink::new().unwrap(),
        Some(gateway.clone()),
    );

    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("pipeline should stop")
        .unwrap();

    assert!(result.is_err());
    assert!(gateway.stats().await.is_err());
}

#[tokio::test]
async fn test_shutdown_releases_blocked_gateway() {
    let (queue_tx, queue_rx) = mpsc::channel(1);
    let (handle, task) = PipelineHandle::spawn(
        AnalyticsConfig::default(),
        queue_rx,
        MetricsSink::new().unwrap(),
        None,
    );
    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();

    let mut ingestion = Ingestion::new(queue_tx);
    let result = tokio::time::timeout(
        Duration::from_secs(1),
        ingestion.handle_publish("d/telemetry", b"{}"),
    )
    .await
    .expect("send must not block on a closed queue");

    assert!(result.is_err());
}

#[tokio::test]
async fn test_blocked_gateway_unsubscribes_and_disconnects_on_close() {
    let broker = FakeBroker::spawn("drone/alpha/telemetry", b"{}", 5).await;
    let (queue_tx, mut queue_rx) = mpsc::channel(1);
    let gateway = GatewayHandle::spawn(&broker.mqtt_config(), queue_tx);

    // one slot: after this the gateway refills it and waits on the next publish
    let first = tokio::time::timeout(Duration::from_secs(5), queue_rx.recv())
        .await
        .expect("first publish should be enqueued");
    assert!(first.is_some());
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stopping = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.shutdown().await }
    });
    let stats = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.stats().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!stopping.is_finished());

    queue_rx.close();

    let stopped = tokio::time::timeout(Duration::from_secs(5), stopping)
        .await
        .expect("queued shutdown must be answered")
        .unwrap();
    assert!(stopped.is_ok());

    let stats = stats.await.unwrap().unwrap();
    assert_eq!(stats.enqueued, 2);
    assert_eq!(stats.dropped, 0);

    let seen = tokio::time::timeout(Duration::from_secs(5), broker.received)
        .await
        .expect("client should close the connection")
        .unwrap();
    assert_eq!(seen.iter().filter(|&&kind| kind == packet::UNSUBSCRIBE).count(), 2);
    assert_eq!(seen.last(), Some(&packet::DISCONNECT));
}
