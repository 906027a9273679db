//! Text-to-speech provider client.
//!
//! The relay talks to the provider through [`TtsProvider`]; the production
//! implementation is [`ElevenLabsProvider`], a `reqwest` client posting to
//! `{base_url}/text-to-speech/{voice_id}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;

use jarvis_core::config::{TtsConfig, TtsCredentials};
use jarvis_core::error::JarvisError;

/// Message returned when the provider credentials are missing.
pub const NOT_CONFIGURED_MESSAGE: &str = "ElevenLabs API key or voice ID not configured";

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("{}", NOT_CONFIGURED_MESSAGE)]
    NotConfigured,
    #[error("ElevenLabs request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("ElevenLabs API error: {status}")]
    Api { status: u16, message: String },
}

impl From<TtsError> for JarvisError {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::NotConfigured => JarvisError::Config(err.to_string()),
            TtsError::Request(e) => JarvisError::Network(e.to_string()),
            TtsError::Api { .. } => JarvisError::Upstream(err.to_string()),
        }
    }
}

/// Converts text into an audio payload.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize `text`, returning encoded audio bytes (`audio/mpeg`).
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError>;

    /// Whether the provider has what it needs to make requests.
    fn is_configured(&self) -> bool {
        true
    }
}

/// ElevenLabs REST client with a fixed voice and model.
pub struct ElevenLabsProvider {
    client: Client,
    config: TtsConfig,
    credentials: TtsCredentials,
}

impl std::fmt::Debug for ElevenLabsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsProvider")
            .field("base_url", &self.config.base_url)
            .field("model_id", &self.config.model_id)
            .field("voice_id", &self.credentials.voice_id)
            .finish_non_exhaustive()
    }
}

impl ElevenLabsProvider {
    pub fn new(config: TtsConfig, credentials: TtsCredentials) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }
}

#[async_trait]
impl TtsProvider for ElevenLabsProvider {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        let (Some(api_key), Some(voice_id)) = (
            self.credentials.api_key(),
            self.credentials.voice_id.as_deref(),
        ) else {
            return Err(TtsError::NotConfigured);
        };

        let url = format!(
            "{}/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            voice_id
        );

        let payload = json!({
            "text": text,
            "model_id": self.config.model_id,
            "voice_settings": {
                "stability": self.config.stability,
                "similarity_boost": self.config.similarity_boost
            }
        });

        tracing::debug!(text_len = text.len(), voice_id, "Requesting speech synthesis");

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .header(ACCEPT, "audio/mpeg")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = %status, body = %message, "ElevenLabs API returned an error");
            return Err(TtsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let audio = response.bytes().await?.to_vec();
        tracing::debug!(bytes = audio.len(), "Speech synthesized");
        Ok(audio)
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credentials_fail_before_any_request() {
        let provider = ElevenLabsProvider::new(
            TtsConfig {
                // Unroutable; a request here would fail differently.
                base_url: "http://127.0.0.1:9".to_string(),
                ..TtsConfig::default()
            },
            TtsCredentials::default(),
        )
        .unwrap();

        assert!(!provider.is_configured());
        let err = provider.synthesize("hello").await.unwrap_err();
        assert!(matches!(err, TtsError::NotConfigured));
        assert_eq!(err.to_string(), NOT_CONFIGURED_MESSAGE);
    }

    #[test]
    fn test_api_error_display_hides_body() {
        let err = TtsError::Api {
            status: 401,
            message: "{\"detail\":\"invalid api key\"}".to_string(),
        };
        assert_eq!(err.to_string(), "ElevenLabs API error: 401");
    }

    #[test]
    fn test_conversion_into_taxonomy() {
        let err: JarvisError = TtsError::Api {
            status: 500,
            message: String::new(),
        }
        .into();
        assert!(matches!(err, JarvisError::Upstream(_)));

        let err: JarvisError = TtsError::NotConfigured.into();
        assert!(matches!(err, JarvisError::Config(_)));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let provider = ElevenLabsProvider::new(
            TtsConfig::default(),
            TtsCredentials::new("sk-very-secret", "voice-1"),
        )
        .unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("voice-1"));
    }
}
