//! Client side of the relay round trip.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use jarvis_core::config::RelayConfig;
use jarvis_core::types::{RelayEnvelope, RelayRequest};

use crate::error::ChatError;

/// What the relay answered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayReply {
    /// Encoded audio to play back.
    Audio(Vec<u8>),
    /// Text reply from the JSON envelope.
    Text(String),
}

/// Sends one message to the relay.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn send(&self, text: &str) -> Result<RelayReply, ChatError>;
}

/// `reqwest` client posting to `{base_url}/api/chat`.
#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    client: Client,
    url: String,
}

impl HttpRelayClient {
    pub fn new(config: &RelayConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.client_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.chat_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn send(&self, text: &str) -> Result<RelayReply, ChatError> {
        tracing::debug!(url = %self.url, text_len = text.len(), "Sending message to relay");

        let response = self
            .client
            .post(&self.url)
            .json(&RelayRequest::outgoing(text))
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if !status.is_success() {
            // The relay reports failures as an envelope; fall back to the status.
            let detail = response
                .json::<RelayEnvelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.error)
                .unwrap_or_default();
            tracing::warn!(status = %status, error = %detail, "Relay returned an error");
            return Err(ChatError::Upstream(if detail.is_empty() {
                format!("API error: {}", status.as_u16())
            } else {
                format!("API error: {} ({})", status.as_u16(), detail)
            }));
        }

        if content_type.starts_with("application/json") {
            let envelope: RelayEnvelope = response
                .json()
                .await
                .map_err(|e| ChatError::InvalidResponse(e.to_string()))?;
            return match envelope {
                RelayEnvelope {
                    success: true,
                    response,
                    ..
                } => match response.filter(|r| !r.trim().is_empty()) {
                    Some(text) => Ok(RelayReply::Text(text)),
                    None => Err(ChatError::InvalidResponse(
                        "relay reported success without a response".to_string(),
                    )),
                },
                RelayEnvelope { error, .. } => Err(ChatError::Upstream(
                    error.unwrap_or_else(|| "relay reported failure".to_string()),
                )),
            };
        }

        let audio = response.bytes().await?.to_vec();
        tracing::debug!(bytes = audio.len(), content_type = %content_type, "Received audio reply");
        Ok(RelayReply::Audio(audio))
    }
}
