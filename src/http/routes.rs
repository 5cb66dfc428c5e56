//! Route handlers for the host service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use super::AppState;
use crate::admission::Stats;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Stand-in business handler behind the admission middleware.
pub async fn ping() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.backend.stats())
}

pub async fn reset_key(State(state): State<AppState>, Path(key): Path<String>) -> StatusCode {
    info!(key = %key, "Admin reset of admission key");
    state.backend.reset_key(&key);
    StatusCode::NO_CONTENT
}

pub async fn reset_all(State(state): State<AppState>) -> StatusCode {
    info!("Admin reset of all admission keys");
    state.backend.reset_all();
    StatusCode::NO_CONTENT
}
