//! Error types for the widget bridge.

use jarvis_core::error::JarvisError;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("widget agent id is not configured")]
    MissingAgentId,
    #[error("document host error: {0}")]
    Host(String),
}

impl From<BridgeError> for JarvisError {
    fn from(err: BridgeError) -> Self {
        JarvisError::Widget(err.to_string())
    }
}
