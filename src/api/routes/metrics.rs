//! Prometheus scrape endpoint

use axum::{extract::State, http::header, response::IntoResponse};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};

/// GET /metrics
pub async fn export(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let body = state
        .metrics
        .export()
        .map_err(|e| ApiError::MetricsExport(format!("{e:#}")))?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
