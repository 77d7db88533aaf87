//! HTTP server for the analytics hub
//!
//! ## Endpoints
//!
//! - `GET /metrics` - Prometheus text exposition of the two ML gauges
//! - `GET /healthz` - Liveness check, with the pipeline actor's liveness
//! - `GET /api/v1/status` - Pipeline and ingestion status as JSON
//!
//! Handlers only read atomics or ask actors through their handles, so a scrape
//! never blocks the pipeline.

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{HealthResponse, PipelineLiveness, StatusResponse};

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Context;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:9108")
    pub bind_addr: SocketAddr,
}

impl ApiConfig {
    /// Listen on every interface on `port`
    pub fn on_port(port: u16) -> ApiConfig {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::on_port(9108)
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/metrics", get(routes::metrics::export))
        .route("/healthz", get(routes::health::health_check))
        .route("/api/v1/status", get(routes::status::get_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    let addr = listener.local_addr()?;

    info!("metrics server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
