//! API shared state containing actor handles

use crate::{
    actors::{ingestion::GatewayHandle, pipeline::PipelineHandle},
    metrics::MetricsSink,
};

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Gauges rendered by `/metrics`
    pub metrics: MetricsSink,

    /// Handle to the pipeline actor for status queries
    pub pipeline: Option<PipelineHandle>,

    /// Handle to the ingestion gateway for its counters
    pub gateway: Option<GatewayHandle>,
}

impl ApiState {
    /// State that only serves the metrics sink
    pub fn new(metrics: MetricsSink) -> Self {
        Self {
            metrics,
            pipeline: None,
            gateway: None,
        }
    }

    pub fn with_pipeline(mut self, pipeline: PipelineHandle) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_gateway(mut self, gateway: GatewayHandle) -> Self {
        self.gateway = Some(gateway);
        self
    }
}
