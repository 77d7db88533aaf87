//! Pipeline status endpoint

use std::time::Duration;

use axum::{Json, extract::State};
use tracing::debug;

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::StatusResponse,
    },
    monitors::state::OperationalState,
};

/// A gateway blocked on a full queue answers nothing until the pipeline
/// catches up, so its counters are only waited on briefly.
const GATEWAY_STATS_TIMEOUT: Duration = Duration::from_secs(1);

/// GET /api/v1/status
///
/// Returns the current gauges together with a pipeline snapshot. Responds with
/// 503 once the pipeline has stopped.
pub async fn get_status(State(state): State<ApiState>) -> ApiResult<Json<StatusResponse>> {
    let pipeline = state
        .pipeline
        .as_ref()
        .ok_or_else(|| ApiError::PipelineStopped("pipeline not running".to_string()))?;

    let status = pipeline
        .status()
        .await
        .map_err(|e| ApiError::PipelineStopped(format!("{e:#}")))?;

    let ingestion = match &state.gateway {
        Some(gateway) => {
            match tokio::time::timeout(GATEWAY_STATS_TIMEOUT, gateway.stats()).await {
                Ok(Ok(stats)) => Some(stats),
                Ok(Err(e)) => {
                    debug!("gateway stats unavailable: {e:#}");
                    None
                }
                Err(_) => {
                    debug!("gateway busy, omitting ingestion stats");
                    None
                }
            }
        }
        None => None,
    };

    let state_value = state.metrics.state();

    Ok(Json(StatusResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        score: state.metrics.score(),
        state: OperationalState::from_gauge(state_value).unwrap_or_default(),
        pipeline: status,
        ingestion,
    }))
}
