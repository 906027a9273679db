//! Conversation controller: transcript owner and relay round trip.
//!
//! Text from the keyboard, the capture engine or the voice widget ends up
//! here. A turn appends the user message immediately, calls the relay, and
//! appends the assistant message once the relay answers. Turns are not
//! queued: concurrent turns append in the order they complete.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;

use jarvis_core::config::ConversationConfig;
use jarvis_core::error::JarvisError;
use jarvis_core::events::{publish, Notice, NoticeSender};
use jarvis_core::types::{Message, Speaker};

use crate::error::ChatError;
use crate::playback::AudioPlayer;
use crate::relay_client::{RelayClient, RelayReply};

/// Notice raised when a relay turn fails.
pub const SEND_ERROR_NOTICE: &str = "Error sending message to API";

struct Inner {
    transcript: Mutex<Vec<Message>>,
    relay: Arc<dyn RelayClient>,
    player: Arc<dyn AudioPlayer>,
    notices: NoticeSender,
    speaking: watch::Sender<bool>,
    speaking_generation: AtomicU64,
    speaking_fallback: Duration,
}

impl Inner {
    fn lock_transcript(&self) -> MutexGuard<'_, Vec<Message>> {
        self.transcript.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn append(&self, message: Message) {
        tracing::debug!(
            message_id = %message.id,
            speaker = %message.speaker,
            text_len = message.content.len(),
            "Appending message"
        );
        self.lock_transcript().push(message);
    }

    /// Clear the indicator if no newer assistant message raised it since.
    fn clear_speaking(&self, generation: u64) {
        if self.speaking_generation.load(Ordering::Acquire) == generation {
            self.speaking.send_replace(false);
        }
    }
}

/// Owns the transcript and drives relay turns.
///
/// Cheap to clone; clones share the transcript. Methods that raise the
/// speaking indicator spawn timers and must run inside a tokio runtime.
#[derive(Clone)]
pub struct ConversationController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ConversationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationController")
            .field("messages", &self.inner.lock_transcript().len())
            .field("speaking", &self.is_speaking())
            .finish_non_exhaustive()
    }
}

impl ConversationController {
    /// Create a controller, seeding the transcript with the configured greeting.
    pub fn new(
        config: &ConversationConfig,
        relay: Arc<dyn RelayClient>,
        player: Arc<dyn AudioPlayer>,
        notices: NoticeSender,
    ) -> Self {
        let mut transcript = Vec::new();
        if !config.greeting.trim().is_empty() {
            transcript.push(Message::assistant(config.greeting.clone()));
        }
        let (speaking, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                transcript: Mutex::new(transcript),
                relay,
                player,
                notices,
                speaking,
                speaking_generation: AtomicU64::new(0),
                speaking_fallback: Duration::from_millis(config.speaking_fallback_ms),
            }),
        }
    }

    /// Snapshot of the transcript in append order.
    pub fn transcript(&self) -> Vec<Message> {
        self.inner.lock_transcript().clone()
    }

    /// Whether the speaking indicator is currently on.
    pub fn is_speaking(&self) -> bool {
        *self.inner.speaking.borrow()
    }

    /// Watch the speaking indicator.
    pub fn subscribe_speaking(&self) -> watch::Receiver<bool> {
        self.inner.speaking.subscribe()
    }

    /// Run one turn for typed text.
    ///
    /// Blank input is ignored and yields `Ok(None)` without touching the
    /// transcript. On success returns the appended assistant message. On
    /// failure an error notice is published and no assistant message is
    /// appended.
    pub async fn submit_text(&self, text: &str) -> Result<Option<Message>, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring blank input");
            return Ok(None);
        }

        self.inner.append(Message::user(text));

        let reply = match self.inner.relay.send(text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Relay turn failed");
                if JarvisError::from(e.clone()).is_user_visible() {
                    publish(&self.inner.notices, Notice::error(SEND_ERROR_NOTICE));
                }
                return Err(e);
            }
        };

        let message = match reply {
            RelayReply::Audio(audio) => {
                // The relay voiced the submitted text.
                let message = Message::assistant(text);
                self.inner.append(message.clone());
                let generation = self.raise_speaking();
                self.spawn_playback(audio, generation);
                message
            }
            RelayReply::Text(reply) => {
                let message = Message::assistant(reply);
                self.inner.append(message.clone());
                self.raise_speaking();
                message
            }
        };

        Ok(Some(message))
    }

    /// Same contract as [`submit_text`](Self::submit_text), for finalized transcripts.
    pub async fn on_transcript(&self, text: String) -> Result<Option<Message>, ChatError> {
        tracing::debug!(text_len = text.len(), "Transcript received");
        self.submit_text(&text).await
    }

    /// Transcript callback for the capture engine.
    ///
    /// Each finalized transcript runs as its own [`on_transcript`](Self::on_transcript)
    /// turn on the runtime that created the handler, so the capture side
    /// never waits on the relay. Must be called inside a tokio runtime.
    pub fn transcript_handler(&self) -> impl Fn(String) + Send + Sync + 'static {
        let controller = self.clone();
        let runtime = tokio::runtime::Handle::current();
        move |text| {
            let controller = controller.clone();
            runtime.spawn(async move {
                if let Err(e) = controller.on_transcript(text).await {
                    tracing::debug!(error = %e, "Transcript turn failed");
                }
            });
        }
    }

    /// Append a message reported by the voice widget.
    ///
    /// The widget already talked to its own backend, so no relay call is
    /// made. Assistant messages raise the speaking indicator.
    pub fn ingest_widget_message(&self, text: &str, speaker: Speaker) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let message = Message::new(text, speaker);
        self.inner.append(message.clone());
        if message.is_assistant() {
            self.raise_speaking();
        }
        Some(message)
    }

    /// Turn the speaking indicator on and arm its fallback timer.
    fn raise_speaking(&self) -> u64 {
        let generation = self.inner.speaking_generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.speaking.send_replace(true);

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let fallback = self.inner.speaking_fallback;
        tokio::spawn(async move {
            tokio::time::sleep(fallback).await;
            if let Some(inner) = weak.upgrade() {
                inner.clear_speaking(generation);
            }
        });
        generation
    }

    fn spawn_playback(&self, audio: Vec<u8>, generation: u64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(e) = inner.player.play(audio).await {
                tracing::warn!(error = %e, "Audio playback failed");
            }
            inner.clear_speaking(generation);
        });
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use jarvis_core::events::notice_channel;
    use tokio::sync::{broadcast, Notify};

    use crate::playback::NullPlayer;

    /// Relay answering from a fixed script, optionally after a delay.
    struct ScriptedRelay {
        reply: Result<RelayReply, String>,
        delay: Option<Duration>,
        gate: Option<Arc<Notify>>,
        calls: AtomicUsize,
    }

    impl ScriptedRelay {
        fn text(reply: &str) -> Self {
            Self {
                reply: Ok(RelayReply::Text(reply.to_string())),
                delay: None,
                gate: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn audio() -> Self {
            Self {
                reply: Ok(RelayReply::Audio(b"ID3".to_vec())),
                ..Self::text("")
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err("API error: 500".to_string()),
                ..Self::text("")
            }
        }
    }

    #[async_trait]
    impl RelayClient for ScriptedRelay {
        async fn send(&self, text: &str) -> Result<RelayReply, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(RelayReply::Text(r)) if r.is_empty() => {
                    Ok(RelayReply::Text(format!("re: {}", text)))
                }
                Ok(reply) => Ok(reply.clone()),
                Err(msg) => Err(ChatError::Upstream(msg.clone())),
            }
        }
    }

    /// Player that finishes only when released.
    #[derive(Default)]
    struct GatedPlayer {
        release: Notify,
    }

    #[async_trait]
    impl AudioPlayer for GatedPlayer {
        async fn play(&self, _audio: Vec<u8>) -> Result<(), ChatError> {
            self.release.notified().await;
            Ok(())
        }
    }

    fn controller_with(
        relay: Arc<dyn RelayClient>,
        player: Arc<dyn AudioPlayer>,
    ) -> (ConversationController, broadcast::Receiver<Notice>) {
        let notices = notice_channel();
        let rx = notices.subscribe();
        let controller =
            ConversationController::new(&ConversationConfig::default(), relay, player, notices);
        (controller, rx)
    }

    #[tokio::test]
    async fn test_greeting_seeds_transcript() {
        let (controller, _) =
            controller_with(Arc::new(ScriptedRelay::text("ok")), Arc::new(NullPlayer));
        let transcript = controller.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].speaker, Speaker::Assistant);
        assert_eq!(
            transcript[0].content,
            "Hello, I am Jarvis. How can I assist you today?"
        );
        assert!(!controller.is_speaking());
    }

    #[tokio::test]
    async fn test_empty_greeting_disables_seed() {
        let config = ConversationConfig {
            greeting: "  ".to_string(),
            ..ConversationConfig::default()
        };
        let controller = ConversationController::new(
            &config,
            Arc::new(ScriptedRelay::text("ok")),
            Arc::new(NullPlayer),
            notice_channel(),
        );
        assert!(controller.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_never_mutates_transcript() {
        let relay = Arc::new(ScriptedRelay::text("ok"));
        let (controller, _) = controller_with(relay.clone(), Arc::new(NullPlayer));
        let before = controller.transcript();

        for input in ["", " ", "\t", "\n\n", " \t \r\n "] {
            assert!(controller.submit_text(input).await.unwrap().is_none());
            assert!(controller.on_transcript(input.to_string()).await.unwrap().is_none());
        }

        assert_eq!(controller.transcript(), before);
        assert_eq!(relay.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_on_the_lights_scenario() {
        let gate = Arc::new(Notify::new());
        let relay = Arc::new(ScriptedRelay {
            gate: Some(Arc::clone(&gate)),
            ..ScriptedRelay::text("The lights are on.")
        });
        let (controller, _) = controller_with(relay, Arc::new(NullPlayer));
        let mut speaking = controller.subscribe_speaking();

        let turn = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit_text("turn on the lights").await }
        });
        tokio::task::yield_now().await;

        // User message is visible before the relay answers.
        let transcript = controller.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].speaker, Speaker::User);
        assert_eq!(transcript[1].content, "turn on the lights");
        assert!(!controller.is_speaking());

        gate.notify_one();
        let reply = turn.await.unwrap().unwrap().unwrap();
        assert_eq!(reply.content, "The lights are on.");
        assert_eq!(controller.transcript().len(), 3);

        speaking.changed().await.unwrap();
        assert!(*speaking.borrow_and_update());

        tokio::time::sleep(Duration::from_millis(3_001)).await;
        assert!(!controller.is_speaking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_audio_reply_clears_speaking_when_playback_ends() {
        let player = Arc::new(GatedPlayer::default());
        let (controller, _) = controller_with(Arc::new(ScriptedRelay::audio()), player.clone());

        let reply = controller.submit_text("hello").await.unwrap().unwrap();
        assert_eq!(reply.speaker, Speaker::Assistant);
        assert_eq!(reply.content, "hello");
        assert!(controller.is_speaking());

        tokio::time::sleep(Duration::from_millis(500)).await;
        player.release.notify_one();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!controller.is_speaking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_speaking_is_bounded_when_playback_never_ends() {
        let player = Arc::new(GatedPlayer::default());
        let (controller, _) = controller_with(Arc::new(ScriptedRelay::audio()), player);

        controller.submit_text("hello").await.unwrap();
        assert!(controller.is_speaking());

        tokio::time::sleep(Duration::from_millis(3_001)).await;
        assert!(!controller.is_speaking());
    }

    #[tokio::test]
    async fn test_failed_turn_notifies_without_assistant_message() {
        let (controller, mut notices) =
            controller_with(Arc::new(ScriptedRelay::failing()), Arc::new(NullPlayer));

        let result = controller.submit_text("hello").await;
        assert!(matches!(result, Err(ChatError::Upstream(_))));

        let transcript = controller.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].speaker, Speaker::User);
        assert!(!controller.is_speaking());
        assert_eq!(notices.try_recv().unwrap(), Notice::error(SEND_ERROR_NOTICE));
    }

    struct SilentRelay;

    #[async_trait]
    impl RelayClient for SilentRelay {
        async fn send(&self, _text: &str) -> Result<RelayReply, ChatError> {
            Err(ChatError::EmptyMessage)
        }
    }

    #[tokio::test]
    async fn test_silent_errors_publish_no_notice() {
        let (controller, mut notices) =
            controller_with(Arc::new(SilentRelay), Arc::new(NullPlayer));

        let result = controller.submit_text("hello").await;
        assert!(matches!(result, Err(ChatError::EmptyMessage)));
        assert_eq!(controller.transcript().len(), 2);
        assert!(notices.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transcript_handler_spawns_turn() {
        let (controller, _) =
            controller_with(Arc::new(ScriptedRelay::text("")), Arc::new(NullPlayer));
        let handler = controller.transcript_handler();

        handler("what time is it".to_string());
        handler("   ".to_string());
        assert_eq!(controller.transcript().len(), 1);

        tokio::time::sleep(Duration::from_millis(1)).await;
        let contents: Vec<String> = controller
            .transcript()
            .into_iter()
            .skip(1)
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["what time is it", "re: what time is it"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_turns_append_in_completion_order() {
        let slow = Arc::new(ScriptedRelay {
            delay: Some(Duration::from_millis(200)),
            ..ScriptedRelay::text("")
        });
        let (controller, _) = controller_with(slow, Arc::new(NullPlayer));

        let first = controller.submit_text("first");
        let second = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            controller.submit_text("second").await
        };
        let (a, b) = tokio::join!(first, second);
        assert!(a.is_ok() && b.is_ok());

        let contents: Vec<String> = controller
            .transcript()
            .into_iter()
            .skip(1)
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "re: first", "re: second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_message_extends_speaking() {
        let (controller, _) =
            controller_with(Arc::new(ScriptedRelay::text("ok")), Arc::new(NullPlayer));

        controller.ingest_widget_message("first reply", Speaker::Assistant);
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        controller.ingest_widget_message("second reply", Speaker::Assistant);

        // First fallback fires at 3s but belongs to a stale generation.
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(controller.is_speaking());

        tokio::time::sleep(Duration::from_millis(1_600)).await;
        assert!(!controller.is_speaking());
    }

    #[tokio::test]
    async fn test_widget_messages_skip_relay() {
        let relay = Arc::new(ScriptedRelay::text("ok"));
        let (controller, _) = controller_with(relay.clone(), Arc::new(NullPlayer));

        let user = controller.ingest_widget_message("what's the weather", Speaker::User);
        assert_eq!(user.unwrap().speaker, Speaker::User);
        assert!(!controller.is_speaking());

        assert!(controller.ingest_widget_message("   ", Speaker::Assistant).is_none());

        controller.ingest_widget_message("Sunny and warm.", Speaker::Assistant);
        assert!(controller.is_speaking());
        assert_eq!(controller.transcript().len(), 3);
        assert_eq!(relay.calls.load(Ordering::SeqCst), 0);
    }
}
