use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MuralError {
    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Missing or unknown session token")]
    Unauthorized,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Message already present: {0}")]
    DuplicateMessage(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MuralError>;

impl From<std::io::Error> for MuralError {
    fn from(e: std::io::Error) -> Self {
        MuralError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for MuralError {
    fn from(e: serde_json::Error) -> Self {
        MuralError::Json(e.to_string())
    }
}

impl MuralError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MuralError::EmptyContent => StatusCode::BAD_REQUEST,
            MuralError::MissingField(_) => StatusCode::BAD_REQUEST,
            MuralError::Unauthorized => StatusCode::UNAUTHORIZED,
            MuralError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            MuralError::DuplicateMessage(_) => StatusCode::CONFLICT,
            MuralError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MuralError::Json(_) => StatusCode::BAD_REQUEST,
            MuralError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code used in API error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            MuralError::EmptyContent => "empty_content",
            MuralError::MissingField(_) => "missing_field",
            MuralError::Unauthorized => "unauthorized",
            MuralError::InvalidCredentials => "invalid_credentials",
            MuralError::DuplicateMessage(_) => "duplicate_message",
            MuralError::Io(_) => "io_error",
            MuralError::Json(_) => "json_error",
            MuralError::Config(_) => "config_error",
        }
    }
}

// Axum IntoResponse implementation (feature-gated)
#[cfg(feature = "axum-support")]
use axum::response::{IntoResponse, Json, Response};
#[cfg(feature = "axum-support")]
use serde::Serialize;

#[cfg(feature = "axum-support")]
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
    pub message: String,
    pub request_id: String,
}

#[cfg(feature = "axum-support")]
impl IntoResponse for MuralError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = ErrorResponse {
            status: "error",
            error: self.error_code().to_string(),
            message: self.to_string(),
            request_id: format!("req_mu_{}", uuid::Uuid::new_v4()),
        };
        (status, Json(error_response)).into_response()
    }
}
