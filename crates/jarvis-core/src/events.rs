use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of notice channels created by [`notice_channel`].
pub const NOTICE_CHANNEL_CAPACITY: usize = 64;

/// Severity of a transient user-visible notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient message for the user ("Listening...", "No speech detected.").
///
/// Notices never enter the transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Broadcast sender shared by every component that raises notices.
pub type NoticeSender = broadcast::Sender<Notice>;

/// Create a notice channel. Subscribers call `sender.subscribe()`.
pub fn notice_channel() -> NoticeSender {
    let (tx, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
    tx
}

/// Publish a notice. Having no subscribers is not an error.
pub fn publish(sender: &NoticeSender, notice: Notice) {
    if sender.send(notice).is_err() {
        tracing::trace!("Notice dropped: no subscribers");
    }
}
