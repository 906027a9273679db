//! Conversational core for Jarvis.
//!
//! Owns the append-only transcript, relays user text to the relay service,
//! plays back returned audio and drives the "speaking" indicator.

pub mod controller;
pub mod error;
pub mod playback;
pub mod relay_client;

pub use controller::{ConversationController, SEND_ERROR_NOTICE};
pub use error::ChatError;
pub use playback::{AudioPlayer, DirectorySink, NullPlayer};
pub use relay_client::{HttpRelayClient, RelayClient, RelayReply};
