use crate::handlers::AppState;
use axum::{extract::State, Json};
use mural_replication::types::ReplicationStatus;
use std::sync::Arc;

/// GET /internal/status
/// Replication view of this node: registry, broadcast fan-out, store size
#[utoipa::path(
    get,
    path = "/internal/status",
    tag = "internal",
    responses(
        (status = 200, description = "Replication status", body = serde_json::Value)
    )
)]
pub async fn replication_status(State(state): State<Arc<AppState>>) -> Json<ReplicationStatus> {
    Json(state.manager.status())
}
