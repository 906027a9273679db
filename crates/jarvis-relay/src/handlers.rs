//! Route handler functions for the relay endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use jarvis_core::types::{RelayEnvelope, RelayRequest, RelayVariant};

use crate::error::ApiError;
use crate::state::AppState;

/// Service name reported by the health probe.
pub const SERVICE_NAME: &str = "jarvis-relay";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub variant: RelayVariant,
    pub uptime_secs: u64,
}

/// GET /api/test and GET / - Liveness probe.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        variant: state.config.variant,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /api/chat - Relay a message to the reply source.
///
/// A missing, blank or unparsable message is a 400. The audio variant
/// answers with `audio/mpeg` bytes from the TTS provider; the text variant
/// answers with `{success: true, response}`. Upstream failures become a 500
/// failure envelope.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected relay request body");
        ApiError::BadRequest("Message is required".to_string())
    })?;

    let Some(message) = request.text() else {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    };

    tracing::info!(
        text_len = message.len(),
        source = request.source.as_deref().unwrap_or("unknown"),
        variant = %state.config.variant,
        "Received relay request"
    );

    match state.config.variant {
        RelayVariant::Audio => {
            let audio = state.tts.synthesize(message).await.map_err(|e| {
                tracing::warn!(error = %e, "Speech synthesis failed");
                ApiError::from(e)
            })?;

            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(audio.len()));
            Ok((headers, audio).into_response())
        }
        RelayVariant::Text => {
            let reply = state.replies.reply(message);
            Ok(Json(RelayEnvelope::ok(reply)).into_response())
        }
    }
}
