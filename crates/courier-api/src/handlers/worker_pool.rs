//! Administrative control of the worker pool.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use courier_dispatch::PoolStatus;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::AppState;

/// Request body for `PUT /worker-pool/state`.
#[derive(Debug, Deserialize)]
pub struct WorkerPoolActionRequest {
    /// Either `"start"` or `"pause"`.
    pub action: String,
}

/// Response body carrying the pool status.
#[derive(Debug, Serialize)]
pub struct WorkerPoolStatusResponse {
    /// Current pool status.
    pub status: PoolStatus,
}

/// `PUT /worker-pool/state`
///
/// Resumes or pauses job admission and returns the resulting status.
pub async fn control_worker_pool(
    State(state): State<AppState>,
    Json(request): Json<WorkerPoolActionRequest>,
) -> impl IntoResponse {
    match request.action.as_str() {
        "start" => state.pool.resume(),
        "pause" => state.pool.pause(),
        other => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid action {other:?}, use 'start' or 'pause'") })),
            )
                .into_response();
        },
    }

    Json(WorkerPoolStatusResponse { status: state.pool.status() }).into_response()
}

/// `GET /worker-pool/state`
///
/// Returns the current pool status.
pub async fn worker_pool_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(WorkerPoolStatusResponse { status: state.pool.status() })
}
