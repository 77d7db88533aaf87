//! Errors surfaced by the HTTP handlers

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// The pipeline actor is absent or has stopped; status cannot be read
    PipelineStopped(String),

    /// The gauges could not be rendered in the exposition format
    MetricsExport(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::PipelineStopped(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::MetricsExport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::PipelineStopped(_) => "pipeline_stopped",
            ApiError::MetricsExport(_) => "metrics_export",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let (ApiError::PipelineStopped(message) | ApiError::MetricsExport(message)) = self;

        (status, Json(json!({ "error": message, "kind": kind }))).into_response()
    }
}
