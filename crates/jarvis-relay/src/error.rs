//! API error types and JSON error response formatting.
//!
//! ApiError renders every failure as the relay's `{success: false, error}`
//! envelope, mapping internal errors to the matching HTTP status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use jarvis_core::error::JarvisError;
use jarvis_core::types::RelayEnvelope;

use crate::tts::TtsError;

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid message.
    BadRequest(String),
    /// 500 Internal Server Error - upstream or unexpected failure.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg,
        };

        (status, Json(RelayEnvelope::failure(message))).into_response()
    }
}

impl From<TtsError> for ApiError {
    fn from(err: TtsError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JarvisError> for ApiError {
    fn from(err: JarvisError) -> Self {
        match err {
            JarvisError::EmptyInput => ApiError::BadRequest("Message is required".to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
