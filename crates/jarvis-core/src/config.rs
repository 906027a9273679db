use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{JarvisError, Result};
use crate::types::RelayVariant;

/// Environment variable holding the TTS provider API key.
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";
/// Environment variable holding the TTS voice identifier.
pub const VOICE_ID_ENV: &str = "ELEVENLABS_VOICE_ID";

/// Top-level configuration for the Jarvis application.
///
/// Loaded from `~/.jarvis/config.toml` by default. Secrets are not part of
/// this file; see [`TtsCredentials`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JarvisConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
}

impl JarvisConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: JarvisConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| JarvisError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Relay service settings, used both by the server and by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Interface the server binds to.
    pub host: String,
    /// Port the server listens on.
    pub port: u16,
    /// Reply payload returned by `/api/chat`.
    pub variant: RelayVariant,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
    /// Maximum accepted request body in bytes.
    pub body_limit_bytes: usize,
    /// Base URL the conversation client posts to.
    pub base_url: String,
    /// Client-side request timeout in seconds.
    pub client_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            variant: RelayVariant::Audio,
            allowed_origins: vec![
                "http://localhost:8080".to_string(),
                "http://localhost:8081".to_string(),
                "http://localhost:8082".to_string(),
            ],
            body_limit_bytes: 64 * 1024,
            base_url: "http://localhost:3001".to_string(),
            client_timeout_secs: 30,
        }
    }
}

impl RelayConfig {
    /// Full URL of the chat endpoint derived from `base_url`.
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

/// Text-to-speech provider settings (non-secret part).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Provider REST base URL.
    pub base_url: String,
    /// Synthesis model identifier.
    pub model_id: String,
    /// Voice stability (0.0 to 1.0).
    pub stability: f32,
    /// Voice similarity boost (0.0 to 1.0).
    pub similarity_boost: f32,
    /// Upstream request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io/v1".to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
            stability: 0.5,
            similarity_boost: 0.5,
            request_timeout_secs: 30,
        }
    }
}

/// Speech capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Deadline for one capture session in milliseconds.
    pub max_recording_ms: u64,
    /// Recognition language tag.
    pub lang: String,
    /// Keep recognizing after the first utterance.
    pub continuous: bool,
    /// Deliver interim (non-final) fragments.
    pub interim_results: bool,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_recording_ms: 15_000,
            lang: "en-US".to_string(),
            continuous: false,
            interim_results: true,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Conversation controller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Assistant message seeded into a fresh transcript. Empty disables it.
    pub greeting: String,
    /// Upper bound on how long the speaking indicator stays on, in milliseconds.
    pub speaking_fallback_ms: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello, I am Jarvis. How can I assist you today?".to_string(),
            speaking_fallback_ms: 3_000,
        }
    }
}

/// Third-party voice widget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Script that defines the widget custom element.
    pub script_src: String,
    /// Custom element tag name.
    pub element_tag: String,
    /// Value of the element's `agent-id` attribute.
    pub agent_id: String,
    /// CSS injected on mount and reapplied to late-inserted widget nodes.
    pub style_overrides: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            script_src: "https://elevenlabs.io/convai-widget/index.js".to_string(),
            element_tag: "elevenlabs-convai".to_string(),
            agent_id: String::new(),
            style_overrides: String::new(),
        }
    }
}

/// Secret half of the TTS configuration, read from the environment.
#[derive(Debug, Default)]
pub struct TtsCredentials {
    pub api_key: Option<SecretString>,
    pub voice_id: Option<String>,
}

impl TtsCredentials {
    /// Read credentials from the environment, honouring a `.env` file.
    ///
    /// Missing values are logged, not fatal: the relay still starts and
    /// reports the problem per request.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_key = non_empty_env(API_KEY_ENV).map(SecretString::from);
        let voice_id = non_empty_env(VOICE_ID_ENV);

        if api_key.is_none() {
            warn!("WARNING: {} environment variable is not set", API_KEY_ENV);
        }
        if voice_id.is_none() {
            warn!("WARNING: {} environment variable is not set", VOICE_ID_ENV);
        }

        Self { api_key, voice_id }
    }

    pub fn new(api_key: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::from(api_key.into())),
            voice_id: Some(voice_id.into()),
        }
    }

    /// Both the key and the voice are available.
    pub fn is_complete(&self) -> bool {
        self.api_key.is_some() && self.voice_id.is_some()
    }

    /// The API key, for building the upstream request only.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
