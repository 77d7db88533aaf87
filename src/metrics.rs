//! Prometheus metrics sink
//!
//! Exactly two gauges are exported:
//!
//! - `ml_anomaly_score`: latest normalized score, 0..1
//! - `ml_state`: latest operational state, 0=OK, 1=WARN, 2=CRIT
//!
//! Gauges are atomics, so scrapes read them without ever blocking the
//! pipeline that writes them.

use std::sync::Arc;

use anyhow::Context;
use prometheus::{Encoder, Gauge, IntGauge, Registry, TextEncoder};

use crate::monitors::state::OperationalState;

#[derive(Clone)]
pub struct MetricsSink {
    registry: Arc<Registry>,
    anomaly_score: Gauge,
    state: IntGauge,
}

impl MetricsSink {
    pub fn new() -> anyhow::Result<MetricsSink> {
        let registry = Registry::new();

        let anomaly_score = Gauge::new("ml_anomaly_score", "Anomaly score from ML (0-1)")?;
        let state = IntGauge::new(
            "ml_state",
            "Operational state derived from anomaly score (0=OK,1=WARN,2=CRIT)",
        )?;

        registry
            .register(Box::new(anomaly_score.clone()))
            .context("failed to register ml_anomaly_score")?;
        registry
            .register(Box::new(state.clone()))
            .context("failed to register ml_state")?;

        Ok(Self {
            registry: Arc::new(registry),
            anomaly_score,
            state,
        })
    }

    pub fn publish(&self, score: f64, state: OperationalState) {
        self.anomaly_score.set(score);
        self.state.set(state.as_gauge());
    }

    pub fn score(&self) -> f64 {
        self.anomaly_score.get()
    }

    pub fn state(&self) -> i64 {
        self.state.get()
    }

    /// Render all gauges in the Prometheus text exposition format.
    pub fn export(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode metrics")?;
        String::from_utf8(buffer).context("metrics output is not valid UTF-8")
    }
}
