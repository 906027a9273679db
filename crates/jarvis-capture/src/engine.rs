//! Capture engine managing one speech-to-text session at a time.
//!
//! The `CaptureEngine` owns the state machine, the open microphone stream and
//! the deadline timer. Host callbacks (results, errors, end of recognition)
//! are fed in through `handle_results`, `handle_error` and `handle_end`.
//! Every exit path (final transcript, `stop`, deadline, error, drop) goes
//! through the same release step, which cancels the timer, stops the
//! recognizer and stops the microphone tracks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use jarvis_core::config::CaptureConfig;
use jarvis_core::events::{publish, Notice, NoticeSender};

use crate::error::CaptureError;
use crate::host::{
    AudioConstraints, MicrophoneStream, RecognitionErrorCode, RecognitionOptions,
    RecognitionResult, SpeechHost,
};
use crate::state::{CaptureState, StateMachine};

/// Notice raised when a session hits its deadline.
pub const DEADLINE_NOTICE: &str = "Maximum recording time reached";

/// Notice raised when a session starts listening.
pub const LISTENING_NOTICE: &str = "Listening...";

/// Callback receiving a finalized transcript.
pub type TranscriptFn = Arc<dyn Fn(String) + Send + Sync>;

/// Snapshot of the data tracked for a capture session.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    /// Unique identifier for this session.
    pub id: Uuid,
    /// When the microphone was granted and recognition started.
    pub started_at: DateTime<Utc>,
    /// When the session will be force-stopped.
    pub deadline: DateTime<Utc>,
    /// Transcript accumulated from the latest result list.
    pub transcript: String,
}

impl CaptureSession {
    fn new(max_recording_ms: u64) -> Self {
        let started_at = Utc::now();
        let max_ms = i64::try_from(max_recording_ms).unwrap_or(i64::MAX);
        Self {
            id: Uuid::new_v4(),
            started_at,
            deadline: started_at + chrono::Duration::milliseconds(max_ms),
            transcript: String::new(),
        }
    }

    /// Returns the elapsed duration of this session in seconds.
    pub fn elapsed_secs(&self) -> f32 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds() as f32 / 1000.0
    }
}

struct ActiveSession {
    session: CaptureSession,
    microphone: Box<dyn MicrophoneStream>,
    deadline_timer: Option<JoinHandle<()>>,
}

struct Shared {
    host: Arc<dyn SpeechHost>,
    config: CaptureConfig,
    state_machine: StateMachine,
    active: Mutex<Option<ActiveSession>>,
    starting: AtomicBool,
    on_transcript: TranscriptFn,
    notices: NoticeSender,
}

impl Shared {
    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move the session out and put the machine back in Idle.
    ///
    /// Called with the session lock held; resources are released by the
    /// caller after the lock is dropped, so host callbacks fired from
    /// `stop_recognition` observe Idle and are ignored.
    fn take_session(&self, active: &mut Option<ActiveSession>) -> Option<ActiveSession> {
        let taken = active.take();
        if self.state_machine.current() != CaptureState::Idle
            && self.state_machine.transition(CaptureState::Idle).is_err()
        {
            self.state_machine.reset();
        }
        taken
    }

    fn release(&self, mut active: ActiveSession) {
        if let Some(timer) = active.deadline_timer.take() {
            timer.abort();
        }
        self.host.stop_recognition();
        active.microphone.stop_tracks();
        tracing::debug!(
            session_id = %active.session.id,
            elapsed_secs = active.session.elapsed_secs(),
            "Capture resources released"
        );
    }

    fn expire(&self, session_id: Uuid) {
        let taken = {
            let mut active = self.lock_active();
            let is_current = matches!(active.as_ref(), Some(a) if a.session.id == session_id);
            if !is_current || self.state_machine.current() != CaptureState::Listening {
                return;
            }
            let mut taken = self.take_session(&mut active);
            // The timer is the caller; detach instead of aborting it.
            if let Some(session) = taken.as_mut() {
                session.deadline_timer.take();
            }
            taken
        };

        if let Some(session) = taken {
            tracing::info!(session_id = %session_id, "Maximum recording time reached");
            self.release(session);
            publish(&self.notices, Notice::info(DEADLINE_NOTICE));
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let taken = self
            .active
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(session) = taken {
            tracing::info!(session_id = %session.session.id, "Capture engine dropped mid-session");
            self.release(session);
        }
    }
}

/// Resets the `starting` flag however `start` exits, including cancellation.
struct StartGuard<'a>(&'a AtomicBool);

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn spawn_deadline(shared: Weak<Shared>, session_id: Uuid, after: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        if let Some(shared) = shared.upgrade() {
            shared.expire(session_id);
        }
    })
}

/// The capture engine manages state transitions and the session lifecycle.
///
/// Cheap to clone; clones drive the same session. At most one session is
/// active at a time and at most one deadline timer is armed for it.
#[derive(Clone)]
pub struct CaptureEngine {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for CaptureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureEngine")
            .field("state", &self.shared.state_machine.current())
            .field("session", &self.current_session())
            .field("max_recording_ms", &self.shared.config.max_recording_ms)
            .finish()
    }
}

impl CaptureEngine {
    /// Create an engine in the Idle state.
    ///
    /// `on_transcript` receives each finalized transcript exactly once.
    pub fn new<F>(
        host: Arc<dyn SpeechHost>,
        config: CaptureConfig,
        notices: NoticeSender,
        on_transcript: F,
    ) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                host,
                config,
                state_machine: StateMachine::new(),
                active: Mutex::new(None),
                starting: AtomicBool::new(false),
                on_transcript: Arc::new(on_transcript),
                notices,
            }),
        }
    }

    /// Returns the current capture state.
    pub fn state(&self) -> CaptureState {
        self.shared.state_machine.current()
    }

    /// Returns `true` while a session is listening for speech.
    pub fn is_listening(&self) -> bool {
        self.state() == CaptureState::Listening
    }

    /// Returns a clone of the current session, if one is active.
    pub fn current_session(&self) -> Option<CaptureSession> {
        self.shared.lock_active().as_ref().map(|a| a.session.clone())
    }

    /// Start a capture session.
    ///
    /// Valid only from Idle; a concurrent or repeated call returns
    /// `AlreadyActive` without touching the running session. Failures are
    /// also published as error notices.
    pub async fn start(&self) -> Result<Uuid, CaptureError> {
        if self.state().is_active() || self.shared.starting.swap(true, Ordering::AcqRel) {
            tracing::debug!("Capture start ignored: a session is already active");
            return Err(CaptureError::AlreadyActive);
        }
        let _guard = StartGuard(&self.shared.starting);

        match self.open_session().await {
            Ok(id) => Ok(id),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start capture session");
                publish(&self.shared.notices, Notice::error(e.user_message()));
                Err(e)
            }
        }
    }

    async fn open_session(&self) -> Result<Uuid, CaptureError> {
        let shared = &self.shared;

        if !shared.host.is_secure_context() {
            return Err(CaptureError::InsecureContext);
        }
        if !shared.host.has_media_devices() {
            return Err(CaptureError::Unsupported("audio input".to_string()));
        }
        if !shared.host.has_speech_recognition() {
            return Err(CaptureError::Unsupported("speech recognition".to_string()));
        }

        tracing::debug!("Requesting microphone permission");
        let constraints = AudioConstraints::from(&shared.config);
        let mut microphone = shared.host.request_microphone(&constraints).await?;

        if let Err(e) = shared
            .host
            .start_recognition(&RecognitionOptions::from(&shared.config))
        {
            microphone.stop_tracks();
            return Err(e);
        }

        let session = CaptureSession::new(shared.config.max_recording_ms);
        let id = session.id;
        {
            let mut active = shared.lock_active();
            if let Err(e) = shared.state_machine.transition(CaptureState::Listening) {
                drop(active);
                shared.host.stop_recognition();
                microphone.stop_tracks();
                return Err(e);
            }
            let timer = spawn_deadline(
                Arc::downgrade(&self.shared),
                id,
                Duration::from_millis(shared.config.max_recording_ms),
            );
            *active = Some(ActiveSession {
                session,
                microphone,
                deadline_timer: Some(timer),
            });
        }

        tracing::info!(
            session_id = %id,
            max_recording_ms = shared.config.max_recording_ms,
            "Capture session started"
        );
        publish(&shared.notices, Notice::success(LISTENING_NOTICE));
        Ok(id)
    }

    /// Stop the current session without delivering a transcript.
    ///
    /// Idempotent: returns `false` (and does nothing) when already Idle.
    pub fn stop(&self) -> bool {
        let taken = {
            let mut active = self.shared.lock_active();
            if !self.state().is_active() {
                return false;
            }
            self.shared.take_session(&mut active)
        };

        if let Some(session) = taken {
            tracing::info!(session_id = %session.session.id, "Capture session stopped");
            self.shared.release(session);
        }
        true
    }

    /// Start when Idle, stop otherwise. Returns whether a session is now running.
    pub async fn toggle(&self) -> Result<bool, CaptureError> {
        tracing::debug!(state = %self.state(), "Toggling capture");
        if self.state().is_active() {
            self.stop();
            Ok(false)
        } else {
            self.start().await.map(|_| true)
        }
    }

    /// Feed the host's current result list into the session.
    ///
    /// The transcript is the space-joined first alternative of every
    /// result. When the leading result is final, the transcript is handed
    /// to the callback and the session ends. Returns `true` if a transcript
    /// was delivered.
    pub fn handle_results(&self, results: &[RecognitionResult]) -> bool {
        let shared = &self.shared;
        let (taken, transcript) = {
            let mut active = shared.lock_active();
            if shared.state_machine.current() != CaptureState::Listening {
                tracing::debug!("Recognition result ignored: not listening");
                return false;
            }
            let Some(current) = active.as_mut() else {
                return false;
            };

            let transcript = results
                .iter()
                .map(|r| r.transcript.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            current.session.transcript = transcript.clone();

            if !results.first().is_some_and(|r| r.is_final) {
                tracing::trace!(text_len = transcript.len(), "Interim transcript");
                return false;
            }

            if let Err(e) = shared.state_machine.transition(CaptureState::Finalizing) {
                tracing::warn!(error = %e, "Cannot finalize transcript");
                return false;
            }
            (shared.take_session(&mut active), transcript)
        };

        if let Some(session) = taken {
            tracing::info!(
                session_id = %session.session.id,
                text_len = transcript.len(),
                "Final transcript received"
            );
            shared.release(session);
        }
        (shared.on_transcript)(transcript);
        true
    }

    /// Handle a recognizer error: end the session and raise a notice.
    ///
    /// Returns `false` if no session was active.
    pub fn handle_error(&self, code: RecognitionErrorCode) -> bool {
        let taken = {
            let mut active = self.shared.lock_active();
            if !self.state().is_active() {
                tracing::debug!(error = %code, "Recognition error ignored: no active session");
                return false;
            }
            self.shared.take_session(&mut active)
        };

        tracing::warn!(error = %code, "Speech recognition error");
        if let Some(session) = taken {
            self.shared.release(session);
        }
        publish(&self.shared.notices, Notice::error(code.user_message()));
        true
    }

    /// Handle the recognizer ending on its own without a final result.
    pub fn handle_end(&self) -> bool {
        let taken = {
            let mut active = self.shared.lock_active();
            if self.state() != CaptureState::Listening {
                return false;
            }
            self.shared.take_session(&mut active)
        };

        if let Some(session) = taken {
            tracing::info!(
                session_id = %session.session.id,
                "Speech recognition ended without a final transcript"
            );
            self.shared.release(session);
        }
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
