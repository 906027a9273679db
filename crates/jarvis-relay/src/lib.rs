//! Jarvis Relay crate - axum HTTP relay between the assistant UI and the TTS provider.
//!
//! Exposes `POST /api/chat`, which forwards a message to the text-to-speech
//! provider and returns either `audio/mpeg` bytes or a JSON reply envelope,
//! plus a health probe on `GET /api/test` and `GET /`. The service keeps no
//! per-request state.

pub mod error;
pub mod handlers;
pub mod reply;
pub mod routes;
pub mod state;
pub mod tts;

pub use error::ApiError;
pub use reply::{CannedReplies, ReplyGenerator};
pub use routes::{create_router, start_server};
pub use state::AppState;
pub use tts::{ElevenLabsProvider, TtsError, TtsProvider};
