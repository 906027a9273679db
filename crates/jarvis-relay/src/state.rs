//! Application state shared across all route handlers.
//!
//! AppState holds the relay configuration and the two reply sources (TTS
//! provider and text reply generator). It is passed to handlers via axum's
//! State extractor.

use std::sync::Arc;
use std::time::Instant;

use jarvis_core::config::RelayConfig;

use crate::reply::{CannedReplies, ReplyGenerator};
use crate::tts::TtsProvider;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. Nothing here
/// is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    /// Relay configuration (variant, CORS origins, body limit).
    pub config: Arc<RelayConfig>,
    /// Upstream text-to-speech provider for the audio variant.
    pub tts: Arc<dyn TtsProvider>,
    /// Reply source for the text variant.
    pub replies: Arc<dyn ReplyGenerator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with the default canned reply generator.
    pub fn new(config: RelayConfig, tts: Arc<dyn TtsProvider>) -> Self {
        Self::with_replies(config, tts, Arc::new(CannedReplies::new()))
    }

    pub fn with_replies(
        config: RelayConfig,
        tts: Arc<dyn TtsProvider>,
        replies: Arc<dyn ReplyGenerator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            tts,
            replies,
            start_time: Instant::now(),
        }
    }
}
