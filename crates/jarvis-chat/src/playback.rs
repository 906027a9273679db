//! Audio playback seam.
//!
//! `play` resolves when playback has finished, which is what clears the
//! speaking indicator early.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::ChatError;

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play `audio` to completion.
    async fn play(&self, audio: Vec<u8>) -> Result<(), ChatError>;
}

/// Discards audio and finishes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlayer;

#[async_trait]
impl AudioPlayer for NullPlayer {
    async fn play(&self, audio: Vec<u8>) -> Result<(), ChatError> {
        tracing::trace!(bytes = audio.len(), "Discarding audio reply");
        Ok(())
    }
}

/// Writes each reply to `<dir>/reply-<timestamp>.mp3` instead of playing it.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl AudioPlayer for DirectorySink {
    async fn play(&self, audio: Vec<u8>) -> Result<(), ChatError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ChatError::Playback(e.to_string()))?;

        let name = format!("reply-{}.mp3", Utc::now().format("%Y%m%dT%H%M%S%.3f"));
        let path = self.dir.join(name);
        tokio::fs::write(&path, &audio)
            .await
            .map_err(|e| ChatError::Playback(e.to_string()))?;

        tracing::info!(path = %path.display(), bytes = audio.len(), "Saved audio reply");
        Ok(())
    }
}
