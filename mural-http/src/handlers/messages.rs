use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use mural::MuralError;
use std::sync::Arc;

use super::AppState;
use crate::dto::{MessagesResponse, PostMessageRequest, PostMessageResponse};

/// Post a message as the logged-in user
///
/// The message is stored locally and pushed to every peer in the background;
/// the response does not wait for peers.
#[utoipa::path(
    post,
    path = "/messages",
    tag = "messages",
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = PostMessageResponse),
        (status = 400, description = "Missing or empty content"),
        (status = 401, description = "Missing or unknown session token"),
        (status = 409, description = "Message already present")
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<PostMessageResponse>), MuralError> {
    let author = state.sessions.authenticate(&headers)?;

    let content = req
        .content
        .ok_or_else(|| MuralError::MissingField("content".to_string()))?;
    if content.trim().is_empty() {
        return Err(MuralError::EmptyContent);
    }

    let message = state.manager.append_local(author, content)?;

    Ok((
        StatusCode::CREATED,
        Json(PostMessageResponse {
            status: "ok".to_string(),
            message,
        }),
    ))
}

/// Read the whole board, oldest first
#[utoipa::path(
    get,
    path = "/messages",
    tag = "messages",
    responses(
        (status = 200, description = "All messages ordered by timestamp", body = MessagesResponse)
    )
)]
pub async fn list_messages(State(state): State<Arc<AppState>>) -> Json<MessagesResponse> {
    Json(MessagesResponse {
        status: "ok".to_string(),
        messages: state.manager.read_snapshot(),
    })
}
