//! API error types for pulse-ingest
//!
//! Converts the shared error taxonomy into HTTP responses at the gateway
//! boundary. Status codes and retryability live on the error value itself
//! (pulse_common::Error), never inferred from variant shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Shared taxonomy error; status comes from the error value
    #[error(transparent)]
    Common(#[from] pulse_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            ApiError::Common(err) => (
                StatusCode::from_u16(err.http_status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                err.to_string(),
            ),
        };

        // Client errors echo the detail; server errors answer with a generic
        // message plus the detail in a separate field
        let body = if status.is_client_error() {
            Json(json!({ "error": message }))
        } else {
            Json(json!({
                "error": "Internal server error",
                "message": message,
            }))
        };

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
