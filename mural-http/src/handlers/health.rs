use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = serde_json::Value)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "node_id": state.manager.node_id(),
        "message_count": state.manager.store().len(),
        "peer_count": state.manager.peer_count(),
        "build_profile": if cfg!(debug_assertions) { "debug" } else { "release" },
    }))
}
