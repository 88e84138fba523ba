//! Read endpoint for dispatched messages.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::error;

use crate::AppState;

/// `GET /sent-messages`
///
/// Returns every message in the `sent` state, newest dispatch first.
pub async fn list_sent_messages(State(state): State<AppState>) -> impl IntoResponse {
    match state.storage.messages.list_sent().await {
        Ok(messages) => Json(messages).into_response(),
        Err(error) => {
            error!(error = %error, "failed to list sent messages");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}
