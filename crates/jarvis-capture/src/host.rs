//! Host seam for microphone access and speech recognition.
//!
//! In a browser build these map onto `navigator.mediaDevices.getUserMedia`
//! and the `SpeechRecognition` object; tests and native hosts provide their
//! own implementations. The engine only talks to the host through this trait.

use async_trait::async_trait;

use jarvis_core::config::CaptureConfig;

use crate::error::CaptureError;

/// Processing constraints requested together with microphone access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl From<&CaptureConfig> for AudioConstraints {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            echo_cancellation: config.echo_cancellation,
            noise_suppression: config.noise_suppression,
            auto_gain_control: config.auto_gain_control,
        }
    }
}

/// Flags passed to the recognizer when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    pub continuous: bool,
    pub interim_results: bool,
    pub lang: String,
}

impl From<&CaptureConfig> for RecognitionOptions {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            continuous: config.continuous,
            interim_results: config.interim_results,
            lang: config.lang.clone(),
        }
    }
}

/// One entry of a recognition result list (first alternative only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn final_(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

/// Error code reported by the recognizer's error callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorCode {
    Network,
    NotAllowed,
    NoSpeech,
    Other(String),
}

impl RecognitionErrorCode {
    /// Parse the host's error string (`"network"`, `"not-allowed"`, ...).
    pub fn parse(code: &str) -> Self {
        match code {
            "network" => RecognitionErrorCode::Network,
            "not-allowed" => RecognitionErrorCode::NotAllowed,
            "no-speech" => RecognitionErrorCode::NoSpeech,
            other => RecognitionErrorCode::Other(other.to_string()),
        }
    }

    /// User-visible text for this error.
    pub fn user_message(&self) -> String {
        let detail = match self {
            RecognitionErrorCode::Network => "Network error occurred.",
            RecognitionErrorCode::NotAllowed => "Microphone access denied.",
            RecognitionErrorCode::NoSpeech => "No speech detected.",
            RecognitionErrorCode::Other(_) => "Please try again.",
        };
        format!("Error with speech recognition. {}", detail)
    }
}

impl std::fmt::Display for RecognitionErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognitionErrorCode::Network => write!(f, "network"),
            RecognitionErrorCode::NotAllowed => write!(f, "not-allowed"),
            RecognitionErrorCode::NoSpeech => write!(f, "no-speech"),
            RecognitionErrorCode::Other(code) => write!(f, "{}", code),
        }
    }
}

/// Why the host refused to open the microphone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MicrophoneError {
    /// The user or a policy denied access.
    Denied(String),
    /// No capture device, or the device is busy.
    Unavailable(String),
}

impl From<MicrophoneError> for CaptureError {
    fn from(err: MicrophoneError) -> Self {
        match err {
            MicrophoneError::Denied(msg) => CaptureError::Permission(msg),
            MicrophoneError::Unavailable(msg) => CaptureError::Device(msg),
        }
    }
}

/// An open microphone stream. Owned by exactly one capture session.
pub trait MicrophoneStream: Send {
    /// Stop every track of the stream, releasing the device.
    fn stop_tracks(&mut self);
}

/// Host environment providing microphone access and speech recognition.
#[async_trait]
pub trait SpeechHost: Send + Sync {
    /// Whether the page runs in a secure context.
    fn is_secure_context(&self) -> bool;

    /// Whether the host can open audio input devices at all.
    fn has_media_devices(&self) -> bool;

    /// Whether the host provides a speech recognizer.
    fn has_speech_recognition(&self) -> bool;

    /// Ask for microphone access.
    async fn request_microphone(
        &self,
        constraints: &AudioConstraints,
    ) -> Result<Box<dyn MicrophoneStream>, MicrophoneError>;

    /// Start the recognizer. Results arrive later via the engine's handlers.
    fn start_recognition(&self, options: &RecognitionOptions) -> Result<(), CaptureError>;

    /// Stop the recognizer. Must be safe to call when it is not running.
    fn stop_recognition(&self);
}
