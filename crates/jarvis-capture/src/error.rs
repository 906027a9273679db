//! Error types for speech capture.

use jarvis_core::error::JarvisError;

use crate::state::CaptureState;

/// Errors from the capture engine and its host.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("speech recognition requires a secure context (HTTPS or localhost)")]
    InsecureContext,
    #[error("{0} is not supported by this host")]
    Unsupported(String),
    #[error("microphone access denied: {0}")]
    Permission(String),
    #[error("microphone unavailable: {0}")]
    Device(String),
    #[error("a capture session is already active")]
    AlreadyActive,
    #[error("speech recognition failed to start: {0}")]
    Recognition(String),
    #[error("invalid capture state transition: {from} -> {to}")]
    InvalidTransition { from: CaptureState, to: CaptureState },
}

impl CaptureError {
    /// Text shown to the user when `start()` fails with this error.
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::InsecureContext => {
                "Speech Recognition requires HTTPS. Please use a secure connection.".to_string()
            }
            CaptureError::Unsupported(what) => format!(
                "{} is not supported in this browser. Please use Chrome or Edge.",
                capitalize(what)
            ),
            CaptureError::Permission(msg) | CaptureError::Device(msg) => {
                format!("Could not access microphone: {}", msg)
            }
            CaptureError::Recognition(_) => {
                "Failed to start speech recognition. Please try again.".to_string()
            }
            CaptureError::AlreadyActive | CaptureError::InvalidTransition { .. } => {
                self.to_string()
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<CaptureError> for JarvisError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::InsecureContext => JarvisError::InsecureContext(err.to_string()),
            CaptureError::Unsupported(what) => JarvisError::Unsupported(what),
            CaptureError::Permission(msg) => JarvisError::Permission(msg),
            other => JarvisError::Capture(other.to_string()),
        }
    }
}
