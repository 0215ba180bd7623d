use axum::{extract::State, Json};
use mural::MuralError;
use std::sync::Arc;

use super::AppState;
use crate::dto::{LoginRequest, LoginResponse};

/// Exchange a username and password for a session token
#[utoipa::path(
    post,
    path = "/login",
    tag = "session",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, MuralError> {
    match state.sessions.login(&state.users, &req.username, &req.password) {
        Ok(token) => {
            tracing::info!("User {} logged in", req.username);
            Ok(Json(LoginResponse {
                status: "ok".to_string(),
                token,
            }))
        }
        Err(e) => {
            tracing::warn!("Rejected login for {}", req.username);
            Err(e)
        }
    }
}
