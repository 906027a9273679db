//! Capture state machine with thread-safe transitions.
//!
//! Enforces valid state transitions for one capture session:
//! - Idle -> Listening (microphone granted, recognition started)
//! - Listening -> Finalizing (a final transcript arrived)
//! - Finalizing -> Idle (transcript delivered)
//! - Listening -> Idle (stop, deadline, error, or recognition ended)

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::CaptureError;

/// Operational state of the capture engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    /// No session. Ready to start.
    Idle,
    /// Microphone open, recognition running, deadline armed.
    Listening,
    /// A final transcript is being handed off.
    Finalizing,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::Listening => write!(f, "Listening"),
            CaptureState::Finalizing => write!(f, "Finalizing"),
        }
    }
}

impl CaptureState {
    /// Returns `true` if transitioning from `self` to `target` is allowed.
    pub fn can_transition_to(&self, target: &CaptureState) -> bool {
        matches!(
            (self, target),
            (CaptureState::Idle, CaptureState::Listening)
                | (CaptureState::Listening, CaptureState::Finalizing)
                | (CaptureState::Finalizing, CaptureState::Idle)
                | (CaptureState::Listening, CaptureState::Idle)
        )
    }

    /// Whether a session is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, CaptureState::Idle)
    }
}

/// Thread-safe state machine for capture state transitions.
///
/// Clones share the same underlying state.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<CaptureState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState::Idle)),
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> CaptureState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: CaptureState) -> Result<(), CaptureError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.can_transition_to(&target) {
            tracing::debug!("Capture state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(CaptureError::InvalidTransition {
                from: *state,
                to: target,
            })
        }
    }

    /// Force the state machine back to Idle (used for error recovery).
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != CaptureState::Idle {
            tracing::warn!("Capture state machine reset to Idle from {}", *state);
            *state = CaptureState::Idle;
        }
    }
}
