//! Health check handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: HealthStatus,
    /// When the check ran.
    pub timestamp: DateTime<Utc>,
    /// Database connectivity.
    pub database: ComponentStatus,
    /// Service version.
    pub version: String,
}

/// Overall health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All components operational.
    Healthy,
    /// A critical component is failing.
    Unhealthy,
}

/// Per-component status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component reachable.
    Up,
    /// Component unreachable.
    Down,
}

/// `GET /health`
///
/// Checks database connectivity and reports overall service health.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.storage.health_check().await {
        Ok(()) => ComponentStatus::Up,
        Err(err) => {
            error!(error = %err, "database health check failed");
            ComponentStatus::Down
        },
    };

    let (status, code) = match database {
        ComponentStatus::Up => (HealthStatus::Healthy, StatusCode::OK),
        ComponentStatus::Down => (HealthStatus::Unhealthy, StatusCode::SERVICE_UNAVAILABLE),
    };

    (
        code,
        Json(HealthResponse {
            status,
            timestamp: Utc::now(),
            database,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
