//! Integration tests for HTTP endpoints
//!
//! These tests verify that:
//! - `/metrics` exposes exactly the two ML gauges in Prometheus text format
//! - `/healthz` answers without querying the pipeline and reports its liveness
//! - `/api/v1/status` reflects the pipeline and degrades to 503 once it stops
//! - `/api/v1/status` does not wait on a gateway stuck behind a full queue

use std::{net::SocketAddr, time::Duration};

use axum::http::StatusCode;
use drone_analytics::{
    actors::ingestion::GatewayHandle,
    api::{ApiConfig, ApiState, StatusResponse, spawn_api_server},
    config::AnalyticsConfig,
    metrics::MetricsSink,
    monitors::state::OperationalState,
};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::helpers::*;

async fn spawn_test_api(state: ApiState) -> SocketAddr {
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
    };

    spawn_api_server(config, state).await.unwrap()
}

#[tokio::test]
async fn test_metrics_endpoint_exports_gauges() {
    let metrics = MetricsSink::new().unwrap();
    metrics.publish(0.75, OperationalState::Warn);
    let addr = spawn_test_api(ApiState::new(metrics)).await;

    let response = reqwest::get(format!("http://{}/metrics", addr))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = response.text().await.unwrap();
    assert!(body.contains("ml_anomaly_score 0.75"));
    assert!(body.contains("ml_state 1"));
    assert_eq!(body.matches("# TYPE").count(), 2);
}

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let addr = spawn_test_api(ApiState::new(MetricsSink::new().unwrap())).await;

    let response = reqwest::get(format!("http://{}/healthz", addr))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["pipeline"], "absent");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_tracks_pipeline_liveness() {
    let pipeline = spawn_pipeline(AnalyticsConfig::default());
    let state = ApiState::new(pipeline.metrics.clone()).with_pipeline(pipeline.handle.clone());
    let addr = spawn_test_api(state).await;

    let json: Value = reqwest::get(format!("http://{}/healthz", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["pipeline"], "running");

    pipeline.handle.shutdown().await.unwrap();
    pipeline.task.await.unwrap().unwrap();

    let response = reqwest::get(format!("http://{}/healthz", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["pipeline"], "stopped");
}

#[tokio::test]
async fn test_status_endpoint_reports_pipeline() {
    let pipeline = spawn_pipeline(AnalyticsConfig::default());
    let state = ApiState::new(pipeline.metrics.clone()).with_pipeline(pipeline.handle.clone());
    let addr = spawn_test_api(state).await;

    pipeline.queue.send(telemetry(1, 60.0, 11.0)).await.unwrap();
    pipeline.queue.send(telemetry(2, 59.0, 11.5)).await.unwrap();
    wait_for_processed(&pipeline.handle, 2).await;

    let response = reqwest::get(format!("http://{}/api/v1/status", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status: StatusResponse = response.json().await.unwrap();
    assert_eq!(status.state, OperationalState::Ok);
    assert_eq!(status.score, 0.0);
    assert_eq!(status.pipeline.processed, 2);
    assert_eq!(status.pipeline.window_capacity, 60);
    assert_eq!(status.ingestion, None);

    let last = status.pipeline.last_evaluation.unwrap();
    assert_eq!(last.features.battery_delta, -1.0);
    assert_eq!(last.features.altitude_delta, 0.5);
}

#[tokio::test]
async fn test_status_unavailable_without_pipeline() {
    let addr = spawn_test_api(ApiState::new(MetricsSink::new().unwrap())).await;

    let response = reqwest::get(format!("http://{}/api/v1/status", addr))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = response.json().await.unwrap();
    assert!(json["error"].is_string());
    assert_eq!(json["kind"], "pipeline_stopped");
}

#[tokio::test]
async fn test_status_unavailable_after_shutdown() {
    let pipeline = spawn_pipeline(AnalyticsConfig::default());
    let state = ApiState::new(pipeline.metrics.clone()).with_pipeline(pipeline.handle.clone());
    let addr = spawn_test_api(state).await;

    pipeline.handle.shutdown().await.unwrap();
    pipeline.task.await.unwrap().unwrap();

    let response = reqwest::get(format!("http://{}/api/v1/status", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // scrapes keep working off the last published values
    let response = reqwest::get(format!("http://{}/metrics", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_status_answers_while_gateway_is_blocked() {
    let broker = FakeBroker::spawn("drone/alpha/telemetry", b"{}", 3).await;
    let (queue_tx, mut queue_rx) = mpsc::channel(1);
    let gateway = GatewayHandle::spawn(&broker.mqtt_config(), queue_tx);

    // the gateway refills the single slot and then waits on the third publish
    let first = tokio::time::timeout(Duration::from_secs(5), queue_rx.recv())
        .await
        .expect("first publish should be enqueued");
    assert!(first.is_some());
    tokio::time::sleep(Duration::from_millis(200)).await;

    let pipeline = spawn_pipeline(AnalyticsConfig::default());
    let state = ApiState::new(pipeline.metrics.clone())
        .with_pipeline(pipeline.handle.clone())
        .with_gateway(gateway);
    let addr = spawn_test_api(state).await;

    let response = tokio::time::timeout(
        Duration::from_secs(3),
        reqwest::get(format!("http://{}/api/v1/status", addr)),
    )
    .await
    .expect("status must not wait on the gateway")
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status: StatusResponse = response.json().await.unwrap();
    assert_eq!(status.ingestion, None);
    assert_eq!(status.pipeline.processed, 0);

    drop(queue_rx);
}
