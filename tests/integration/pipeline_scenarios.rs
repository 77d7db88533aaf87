//! End-to-end scenarios through the pipeline actor
//!
//! These tests verify that:
//! - A steady stream never leaves OK
//! - A BATTERY_LOW event dampens the following battery drop
//! - Grace downgrades CRIT to WARN, and only CRIT
//! - Published gauges always match the last evaluation

use drone_analytics::{
    config::AnalyticsConfig, monitors::state::OperationalState, util::now_secs,
};

use crate::helpers::*;

fn config() -> AnalyticsConfig {
    AnalyticsConfig::default()
}

#[tokio::test]
async fn test_constant_stream_stays_ok() {
    let pipeline = spawn_pipeline(config());

    for seq in 1..=20 {
        pipeline.queue.send(telemetry(seq, 80.0, 12.0)).await.unwrap();
    }

    let status = wait_for_processed(&pipeline.handle, 20).await;
    let last = status.last_evaluation.unwrap();

    assert_eq!(status.window_len, 20);
    assert_eq!(last.score, 0.0);
    assert_eq!(last.state, OperationalState::Ok);
    assert_eq!(pipeline.metrics.score(), 0.0);
    assert_eq!(pipeline.metrics.state(), 0);
}

#[tokio::test]
async fn test_battery_low_dampens_next_drop() {
    let pipeline = spawn_pipeline(config());

    pipeline.queue.send(telemetry(1, 80.0, 12.0)).await.unwrap();
    pipeline.queue.send(battery_low(now_secs())).await.unwrap();
    pipeline.queue.send(telemetry(2, 40.0, 12.0)).await.unwrap();

    let status = wait_for_processed(&pipeline.handle, 3).await;
    let last = status.last_evaluation.unwrap();

    assert!(last.in_grace);
    assert_eq!(last.battery_weight, 0.2);
    assert_eq!(last.features.battery_delta, -8.0);
    assert_eq!(last.features.altitude_delta, 0.0);
    assert!(status.last_grace_trigger.is_some());
}

#[tokio::test]
async fn test_stale_battery_low_does_not_dampen() {
    let pipeline = spawn_pipeline(config());

    pipeline.queue.send(telemetry(1, 80.0, 12.0)).await.unwrap();
    pipeline
        .queue
        .send(battery_low(now_secs() - 1_000.0))
        .await
        .unwrap();
    pipeline.queue.send(telemetry(2, 40.0, 12.0)).await.unwrap();

    let last = wait_for_processed(&pipeline.handle, 3)
        .await
        .last_evaluation
        .unwrap();

    assert!(!last.in_grace);
    assert_eq!(last.features.battery_delta, -40.0);
}

#[tokio::test]
async fn test_grace_downgrades_crit_to_warn() {
    let mut config = config();
    config.min_samples = 2;
    let pipeline = spawn_pipeline_with_latest_measure(config, 0.0);

    pipeline.queue.send(battery_low(now_secs())).await.unwrap();
    pipeline.queue.send(telemetry(1, 24.0, 11.0)).await.unwrap();

    let last = wait_for_processed(&pipeline.handle, 2)
        .await
        .last_evaluation
        .unwrap();

    assert_eq!(last.score, 1.0);
    assert!(last.in_grace);
    assert_eq!(last.state, OperationalState::Warn);
    assert_eq!(pipeline.metrics.state(), 1);
}

#[tokio::test]
async fn test_crit_outside_grace() {
    let mut config = config();
    config.min_samples = 2;
    let pipeline = spawn_pipeline_with_latest_measure(config, 0.0);

    pipeline
        .queue
        .send(battery_low(now_secs() - 1_000.0))
        .await
        .unwrap();
    pipeline.queue.send(telemetry(1, 24.0, 11.0)).await.unwrap();

    let last = wait_for_processed(&pipeline.handle, 2)
        .await
        .last_evaluation
        .unwrap();

    assert_eq!(last.state, OperationalState::Crit);
    assert_eq!(pipeline.metrics.state(), 2);
    assert_eq!(pipeline.metrics.score(), 1.0);
}

#[tokio::test]
async fn test_cold_start_pins_score_to_zero() {
    let pipeline = spawn_pipeline_with_latest_measure(config(), 0.0);

    for seq in 1..=19 {
        pipeline.queue.send(telemetry(seq, 90.0, 10.0)).await.unwrap();
    }

    let status = wait_for_processed(&pipeline.handle, 19).await;

    assert_eq!(status.min_samples, 20);
    assert_eq!(status.last_evaluation.unwrap().score, 0.0);
    assert_eq!(pipeline.metrics.state(), 0);

    pipeline.queue.send(telemetry(20, 90.0, 10.0)).await.unwrap();
    let status = wait_for_processed(&pipeline.handle, 20).await;
    assert_eq!(status.last_evaluation.unwrap().score, 1.0);
}

#[tokio::test]
async fn test_isolation_forest_flags_sudden_drop() {
    let mut config = config();
    config.min_samples = 10;
    let pipeline = spawn_pipeline(config);

    for seq in 1..=30 {
        let altitude = 10.0 + ((seq % 4) as f64) * 0.1;
        pipeline
            .queue
            .send(telemetry(seq, 100.0 - seq as f64, altitude))
            .await
            .unwrap();
    }
    pipeline.queue.send(telemetry(31, 20.0, 10.0)).await.unwrap();

    let last = wait_for_processed(&pipeline.handle, 31)
        .await
        .last_evaluation
        .unwrap();

    assert!(last.score >= 0.85, "score was {}", last.score);
    assert_eq!(last.state, OperationalState::Crit);
}
