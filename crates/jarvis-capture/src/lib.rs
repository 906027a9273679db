//! Jarvis Capture crate - Speech capture state machine and session lifecycle.
//!
//! Provides the capture engine that turns one spoken utterance into one
//! transcript through a strict state machine: Idle -> Listening -> Finalizing -> Idle.
//! Microphone access and speech recognition are reached through the
//! [`SpeechHost`] seam so the engine runs the same against a browser binding
//! or a test double.

pub mod engine;
pub mod error;
pub mod host;
pub mod state;

pub use engine::{CaptureEngine, CaptureSession, TranscriptFn, DEADLINE_NOTICE, LISTENING_NOTICE};
pub use error::CaptureError;
pub use host::{
    AudioConstraints, MicrophoneError, MicrophoneStream, RecognitionErrorCode, RecognitionOptions,
    RecognitionResult, SpeechHost,
};
pub use state::{CaptureState, StateMachine};
