//! API response types

use serde::{Deserialize, Serialize};

use crate::{
    actors::messages::{IngestionStats, PipelineStatus},
    monitors::state::OperationalState,
};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub pipeline: PipelineLiveness,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PipelineLiveness {
    Running,
    Stopped,
    /// The server was started without a pipeline handle
    Absent,
}

/// Response for `/api/v1/status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub timestamp: String,

    /// Current value of `ml_anomaly_score`
    pub score: f64,

    /// State matching the current value of `ml_state`
    pub state: OperationalState,

    pub pipeline: PipelineStatus,

    /// Absent when the hub runs without a gateway, or the gateway has stopped
    pub ingestion: Option<IngestionStats>,
}
