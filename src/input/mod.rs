//! Input state machine — turns raw key timing into recording sessions.
//!
//! # States
//!
//! ```text
//! Idle ──primary held ≥ threshold───────────▶ Recording
//!      ──primary+secondary held ≥ threshold─▶ RecordingTranslate
//! Recording ──────────primary released─────▶ Processing
//! RecordingTranslate ─primary released─────▶ Translating
//! Processing / Translating ──session resolved──▶ Idle
//!                            │ (empty / too-short recording)
//!                            ├────────────▶ Warning ──2 s──▶ Idle
//!                            │ (exhaustion / translation failure)
//!                            └────────────▶ Error ────2 s──▶ Idle
//! ```
//!
//! Releasing the primary key before the hold threshold is a short tap:
//! nothing happens, the pending threshold check is cancelled.
//!
//! # Serialization
//!
//! All transitions flow through one [`MachineEvent`] queue with a single
//! consumer ([`StateMachine::run`]); no two transitions are ever in flight
//! at once. Timer and worker tasks feed their results back into the same
//! queue, tagged with a session generation so late events from a cancelled
//! hold or an abandoned session are dropped instead of corrupting a newer
//! one.

pub mod machine;
pub mod timer;

pub use machine::{MachineConfig, StateMachine};
pub use timer::HoldTimer;

use std::sync::{Arc, Mutex};

use crate::hotkey::HotkeyEvent;
use crate::orchestrator::{OrchestratorError, Transcription};

// ---------------------------------------------------------------------------
// InputState
// ---------------------------------------------------------------------------

/// States of the input machine. Exactly one instance exists per process;
/// transitions are the only way feedback text changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// Waiting for the primary key to be held past the threshold.
    Idle,
    /// Audio is being captured; released → transcription.
    Recording,
    /// Audio is being captured; released → transcription + translation.
    RecordingTranslate,
    /// A transcription session is in flight.
    Processing,
    /// A translation session is in flight.
    Translating,
    /// A transient warning is on screen; auto-clears.
    Warning,
    /// A transient error is on screen; auto-clears.
    Error,
}

impl InputState {
    /// Whether a new recording may start from this state.
    pub fn can_start_recording(&self) -> bool {
        matches!(self, InputState::Idle)
    }

    /// A short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            InputState::Idle => "idle",
            InputState::Recording => "recording",
            InputState::RecordingTranslate => "recording-translate",
            InputState::Processing => "processing",
            InputState::Translating => "translating",
            InputState::Warning => "warning",
            InputState::Error => "error",
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        InputState::Idle
    }
}

/// Thread-safe handle to the process-wide [`InputState`].
///
/// The machine writes it; anything else (logging, a future status surface)
/// only reads. Lock for short critical sections only.
pub type SharedInputState = Arc<Mutex<InputState>>;

/// Construct a new [`SharedInputState`] starting at [`InputState::Idle`].
pub fn new_shared_state() -> SharedInputState {
    Arc::new(Mutex::new(InputState::Idle))
}

// ---------------------------------------------------------------------------
// MachineEvent / SessionOutcome
// ---------------------------------------------------------------------------

/// Everything that can drive the state machine, merged into one queue.
#[derive(Debug)]
pub enum MachineEvent {
    /// A key edge from the hotkey listener.
    Key(HotkeyEvent),
    /// The hold-duration check fired for session `generation`.
    HoldExpired { generation: u64 },
    /// The recognition session `generation` finished.
    SessionResolved {
        generation: u64,
        outcome: SessionOutcome,
    },
    /// The warning/error display duration elapsed.
    FeedbackExpired,
}

/// How a recognition session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The orchestrator produced a transcription (possibly empty text).
    Text(Transcription),
    /// The recording was shorter than the minimum usable duration.
    TooShort,
    /// The capture device delivered nothing.
    NoAudio,
    /// The orchestrator gave up.
    Failed(OrchestratorError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
