//! Error types for the conversation controller.

use jarvis_core::error::JarvisError;

/// Errors from a conversation turn.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("relay unreachable: {0}")]
    Network(String),
    #[error("relay error: {0}")]
    Upstream(String),
    #[error("invalid relay response: {0}")]
    InvalidResponse(String),
    #[error("playback error: {0}")]
    Playback(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Network(err.to_string())
    }
}

impl From<ChatError> for JarvisError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage => JarvisError::EmptyInput,
            ChatError::Network(msg) => JarvisError::Network(msg),
            ChatError::Upstream(msg) | ChatError::InvalidResponse(msg) => {
                JarvisError::Upstream(msg)
            }
            ChatError::Playback(msg) => JarvisError::Playback(msg),
        }
    }
}
