use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Source tag attached to every relay request from this client.
pub const SOURCE_TAG: &str = "jarvis-ai";

// =============================================================================
// Enums
// =============================================================================

/// Who produced a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Assistant => write!(f, "assistant"),
        }
    }
}

/// Which kind of payload the relay answers `/api/chat` with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayVariant {
    /// `audio/mpeg` bytes synthesized by the TTS provider.
    #[default]
    Audio,
    /// JSON envelope `{success: true, response}`.
    Text,
}

impl std::fmt::Display for RelayVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayVariant::Audio => write!(f, "audio"),
            RelayVariant::Text => write!(f, "text"),
        }
    }
}

// =============================================================================
// Newtype Wrappers - Identity
// =============================================================================

/// Opaque identifier for a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Entity Structs
// =============================================================================

/// One entry of the conversation transcript.
///
/// Created once and never mutated; the transcript only appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub speaker: Speaker,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(content: impl Into<String>, speaker: Speaker) -> Self {
        Self {
            id: MessageId::new(),
            content: content.into(),
            speaker,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Speaker::User)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, Speaker::Assistant)
    }

    pub fn is_assistant(&self) -> bool {
        self.speaker == Speaker::Assistant
    }
}

/// Body of `POST /api/chat`.
///
/// Only `message` is required by the relay; the client always fills in the
/// other two fields. Malformed `timestamp` or `source` values read as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl RelayRequest {
    /// Build the request the conversation client sends for `text`.
    pub fn outgoing(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            timestamp: Some(Utc::now()),
            source: Some(SOURCE_TAG.to_string()),
        }
    }

    /// The message text, if present and not blank.
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
    }
}

/// JSON envelope returned by the relay for text replies and for every error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayEnvelope {
    pub fn ok(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: Some(response.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.into()),
        }
    }
}
