//! Liveness endpoint

use axum::{Json, extract::State};

use crate::api::{
    state::ApiState,
    types::{HealthResponse, PipelineLiveness},
};

/// GET /healthz
///
/// Always 200 while the process serves HTTP. Whether the pipeline actor is
/// still consuming is reported alongside, without querying it.
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let pipeline = match &state.pipeline {
        Some(handle) if handle.is_running() => PipelineLiveness::Running,
        Some(_) => PipelineLiveness::Stopped,
        None => PipelineLiveness::Absent,
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        pipeline,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
