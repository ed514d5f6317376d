//! The state machine proper: feedback spans, clipboard lifecycle, session
//! dispatch.
//!
//! The machine owns a [`FeedbackSink`] (the only writer of on-screen
//! feedback), an [`AudioSource`] and a [`SpeechBackend`]. It consumes
//! [`MachineEvent`]s from a single queue; handlers never overlap.
//!
//! Feedback accounting: [`FeedbackSpan`] tracks the character length of the
//! one live transient span. Every `show` is preceded by the erasure of the
//! previous span, so the erase count always equals the inject count — no
//! transient text is ever left behind in the target application.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::audio::{AudioSource, CapturedAudio};
use crate::config::AppConfig;
use crate::hotkey::HotkeyEvent;
use crate::inject::FeedbackSink;
use crate::orchestrator::{SpeechBackend, Transcription};
use crate::provider::TranscribeMode;

use super::timer::{notify_after, HoldTimer};
use super::{InputState, MachineEvent, SessionOutcome, SharedInputState};

// ---------------------------------------------------------------------------
// Feedback texts
// ---------------------------------------------------------------------------

const MSG_RECORDING: &str = "🎤 recording…";
const MSG_RECORDING_TRANSLATE: &str = "🎤 recording (translate)…";
const MSG_PROCESSING: &str = "🔄 transcribing…";
const MSG_TRANSLATING: &str = "🔄 translating…";
const MSG_TOO_SHORT: &str = "⚠️ recording too short — hold the key for at least 1 second";
const MSG_NOTHING: &str = "⚠️ nothing recognized";
/// Appended after the final transcript, then erased again after the settle
/// delay. The transcript itself stays.
const COMPLETION_MARKER: &str = " ✅";

// ---------------------------------------------------------------------------
// MachineConfig
// ---------------------------------------------------------------------------

/// Timing and clipboard policy for the state machine.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// How long the primary key must be held before recording starts.
    pub press_threshold: Duration,
    /// Pause between injecting the final text and erasing the completion
    /// marker, so the target application has finished pasting.
    pub settle_delay: Duration,
    /// How long warning/error feedback stays on screen.
    pub message_display: Duration,
    /// Restore the pre-session clipboard on success. When `false`, the
    /// transcript is left on the clipboard instead.
    pub keep_original_clipboard: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            press_threshold: Duration::from_millis(500),
            settle_delay: Duration::from_millis(500),
            message_display: Duration::from_secs(2),
            keep_original_clipboard: true,
        }
    }
}

impl MachineConfig {
    /// Pull the configurable parts out of [`AppConfig`].
    pub fn from_app(cfg: &AppConfig) -> Self {
        Self {
            press_threshold: Duration::from_millis(cfg.hotkey.press_threshold_ms),
            keep_original_clipboard: cfg.keep_original_clipboard,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// FeedbackSpan
// ---------------------------------------------------------------------------

/// Character length of the currently displayed transient text.
///
/// At most one span is live at any instant; `show` records exactly what was
/// injected and `erase` removes exactly that, so counts can never go stale
/// or negative.
#[derive(Debug, Default)]
struct FeedbackSpan {
    chars: usize,
}

impl FeedbackSpan {
    fn show(&mut self, sink: &mut dyn FeedbackSink, text: &str) {
        debug_assert_eq!(self.chars, 0, "previous span must be erased first");
        if let Err(e) = sink.show_text(text) {
            log::warn!("feedback injection failed: {e}");
            return;
        }
        self.chars = text.chars().count();
    }

    fn erase(&mut self, sink: &mut dyn FeedbackSink) {
        if self.chars == 0 {
            return;
        }
        if let Err(e) = sink.erase_chars(self.chars) {
            log::warn!("feedback erasure failed: {e}");
        }
        self.chars = 0;
    }

    fn replace(&mut self, sink: &mut dyn FeedbackSink, text: &str) {
        self.erase(sink);
        self.show(sink, text);
    }
}

// ---------------------------------------------------------------------------
// RecordingSession
// ---------------------------------------------------------------------------

/// Transient per-recording bookkeeping; dropped when the session resolves.
#[derive(Debug)]
struct RecordingSession {
    mode: TranscribeMode,
    started: tokio::time::Instant,
    generation: u64,
}

// ---------------------------------------------------------------------------
// StateMachine
// ---------------------------------------------------------------------------

/// Single consumer of the [`MachineEvent`] queue.
///
/// Spawn [`run`](Self::run) as a tokio task; it exits when every sender is
/// dropped.
pub struct StateMachine<S: FeedbackSink> {
    cfg: MachineConfig,
    state: SharedInputState,
    sink: S,
    source: Arc<dyn AudioSource>,
    backend: Arc<dyn SpeechBackend>,
    /// Sender half of the machine's own queue, handed to timers/workers.
    self_tx: mpsc::Sender<MachineEvent>,

    primary_down: bool,
    secondary_down: bool,
    hold_timer: Option<HoldTimer>,
    /// Bumped on every primary press; events tagged with an older value are
    /// ignored.
    generation: u64,
    session: Option<RecordingSession>,
    span: FeedbackSpan,
}

impl<S: FeedbackSink> StateMachine<S> {
    pub fn new(
        cfg: MachineConfig,
        state: SharedInputState,
        sink: S,
        source: Arc<dyn AudioSource>,
        backend: Arc<dyn SpeechBackend>,
        self_tx: mpsc::Sender<MachineEvent>,
    ) -> Self {
        Self {
            cfg,
            state,
            sink,
            source,
            backend,
            self_tx,
            primary_down: false,
            secondary_down: false,
            hold_timer: None,
            generation: 0,
            session: None,
            span: FeedbackSpan::default(),
        }
    }

    /// Run until the event channel closes.
    pub async fn run(mut self, mut rx: mpsc::Receiver<MachineEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event).await;
        }
        log::info!("input: event channel closed, state machine shutting down");
    }

    async fn handle(&mut self, event: MachineEvent) {
        match event {
            MachineEvent::Key(HotkeyEvent::PrimaryPressed) => self.on_primary_pressed(),
            MachineEvent::Key(HotkeyEvent::PrimaryReleased) => self.on_primary_released().await,
            MachineEvent::Key(HotkeyEvent::SecondaryPressed) => self.secondary_down = true,
            // Mode is fixed at the threshold crossing; releasing the
            // secondary key mid-hold does not change it.
            MachineEvent::Key(HotkeyEvent::SecondaryReleased) => self.secondary_down = false,
            MachineEvent::HoldExpired { generation } => self.on_hold_expired(generation),
            MachineEvent::SessionResolved {
                generation,
                outcome,
            } => self.on_session_resolved(generation, outcome).await,
            MachineEvent::FeedbackExpired => self.on_feedback_expired(),
        }
    }

    // -----------------------------------------------------------------------
    // Key handling
    // -----------------------------------------------------------------------

    fn on_primary_pressed(&mut self) {
        if self.primary_down {
            return;
        }
        self.primary_down = true;
        self.generation += 1;

        // The duration check runs regardless of state; on_hold_expired
        // re-checks that recording may actually start.
        self.hold_timer = Some(HoldTimer::start(
            self.cfg.press_threshold,
            self.generation,
            self.self_tx.clone(),
        ));
    }

    fn on_hold_expired(&mut self, generation: u64) {
        if generation != self.generation || !self.primary_down {
            log::debug!("input: stale hold-check event dropped");
            return;
        }
        if !self.current_state().can_start_recording() {
            return;
        }

        // Snapshot the clipboard before any feedback clobbers it. First
        // capture wins; errors downgrade to a missing snapshot.
        if let Err(e) = self.sink.save_clipboard() {
            log::warn!("clipboard snapshot failed: {e}");
        }

        let translate = self.secondary_down;
        let (next, message, mode) = if translate {
            (
                InputState::RecordingTranslate,
                MSG_RECORDING_TRANSLATE,
                TranscribeMode::Translate,
            )
        } else {
            (InputState::Recording, MSG_RECORDING, TranscribeMode::Transcribe)
        };

        self.span = FeedbackSpan::default();
        self.span.show(&mut self.sink, message);
        self.set_state(next);

        self.session = Some(RecordingSession {
            mode,
            started: tokio::time::Instant::now(),
            generation: self.generation,
        });
        self.source.start();
    }

    async fn on_primary_released(&mut self) {
        self.primary_down = false;
        if let Some(timer) = self.hold_timer.take() {
            timer.cancel();
        }

        let (next, message) = match self.current_state() {
            InputState::Recording => (InputState::Processing, MSG_PROCESSING),
            InputState::RecordingTranslate => (InputState::Translating, MSG_TRANSLATING),
            // Short tap or release in a non-recording state: nothing to do.
            _ => return,
        };

        self.span.replace(&mut self.sink, message);
        self.set_state(next);

        let Some(session) = &self.session else {
            // Recording state without a session cannot normally happen.
            log::error!("input: recording state without a session, resetting");
            self.reset_to_idle();
            return;
        };
        let generation = session.generation;
        let mode = session.mode;

        // Stop capture now, then resolve the session on a worker so the
        // event loop stays responsive to key events.
        let captured = self.source.stop();
        let backend = Arc::clone(&self.backend);
        let tx = self.self_tx.clone();

        tokio::spawn(async move {
            let outcome = match captured {
                CapturedAudio::TooShort => SessionOutcome::TooShort,
                CapturedAudio::Empty => SessionOutcome::NoAudio,
                CapturedAudio::Buffer(audio) => {
                    match backend.transcribe_or_translate(audio, mode).await {
                        Ok(result) => SessionOutcome::Text(result),
                        Err(e) => SessionOutcome::Failed(e),
                    }
                }
            };
            let _ = tx
                .send(MachineEvent::SessionResolved {
                    generation,
                    outcome,
                })
                .await;
        });
    }

    // -----------------------------------------------------------------------
    // Session resolution
    // -----------------------------------------------------------------------

    async fn on_session_resolved(&mut self, generation: u64, outcome: SessionOutcome) {
        if self.session.as_ref().map(|s| s.generation) != Some(generation) {
            log::debug!("input: stale session result dropped");
            return;
        }
        let session = self.session.take().unwrap();

        match outcome {
            SessionOutcome::Text(result) if result.text.is_empty() => {
                log::warn!(
                    "{}: session produced no text after {:?}",
                    result.provider,
                    session.started.elapsed()
                );
                self.show_transient(InputState::Warning, MSG_NOTHING);
            }

            SessionOutcome::Text(result) => {
                self.finish_success(&result).await;
            }

            SessionOutcome::TooShort => {
                self.show_transient(InputState::Warning, MSG_TOO_SHORT);
            }

            SessionOutcome::NoAudio => {
                log::error!("input: no audio captured, resetting");
                self.reset_to_idle();
            }

            SessionOutcome::Failed(e) => {
                log::error!("session failed: {e}");
                self.show_transient(InputState::Error, &format!("❌ {e}"));
            }
        }
    }

    /// Success path: swap the processing span for the transcript plus a
    /// completion marker, let the paste settle, then erase just the marker
    /// and settle the clipboard.
    async fn finish_success(&mut self, result: &Transcription) {
        self.span.erase(&mut self.sink);

        let with_marker = format!("{}{}", result.text, COMPLETION_MARKER);
        if let Err(e) = self.sink.show_text(&with_marker) {
            log::warn!("transcript injection failed: {e}");
        } else {
            // Only the marker is transient; the transcript stays.
            self.span.chars = COMPLETION_MARKER.chars().count();
        }

        tokio::time::sleep(self.cfg.settle_delay).await;
        self.span.erase(&mut self.sink);

        let replacement = if self.cfg.keep_original_clipboard {
            None
        } else {
            Some(result.text.as_str())
        };
        if let Err(e) = self.sink.restore_clipboard(replacement) {
            log::warn!("clipboard restore failed: {e}");
        }

        log::info!(
            "injected {} chars from {} ({:.1?})",
            result.text.chars().count(),
            result.provider,
            result.elapsed
        );
        self.set_state(InputState::Idle);
    }

    // -----------------------------------------------------------------------
    // Transient feedback
    // -----------------------------------------------------------------------

    /// Show a warning/error span and schedule its auto-clear.
    fn show_transient(&mut self, state: InputState, message: &str) {
        self.span.replace(&mut self.sink, message);
        self.set_state(state);
        notify_after(
            self.cfg.message_display,
            MachineEvent::FeedbackExpired,
            self.self_tx.clone(),
        );
    }

    fn on_feedback_expired(&mut self) {
        // Only meaningful while transient feedback is on screen. A clear
        // that raced with a state change is simply dropped.
        if !matches!(
            self.current_state(),
            InputState::Warning | InputState::Error
        ) {
            return;
        }
        self.reset_to_idle();
    }

    /// Erase any live span, restore the clipboard snapshot, return to Idle.
    fn reset_to_idle(&mut self) {
        self.span.erase(&mut self.sink);
        if let Err(e) = self.sink.restore_clipboard(None) {
            log::warn!("clipboard restore failed: {e}");
        }
        self.set_state(InputState::Idle);
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn current_state(&self) -> InputState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, next: InputState) {
        let mut state = self.state.lock().unwrap();
        if *state != next {
            log::debug!("input: {} -> {}", state.label(), next.label());
            *state = next;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
