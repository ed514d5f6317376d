//! Feedback injection — transient status text rendered at the text cursor.
//!
//! # Overview
//!
//! The input state machine shows feedback ("recording…", "transcribing…",
//! the final transcript) directly in the focused application. Typing the
//! text key-by-key is unreliable across layouts, so injection goes through
//! the clipboard:
//!
//! 1. **Set** the text into the clipboard.
//! 2. **Simulate** the platform paste chord (Ctrl+V, or ⌘V on macOS).
//! 3. **Erase** by sending one backspace per previously injected character.
//!
//! Because the clipboard is clobbered by step 1, the machine asks the sink
//! to **snapshot** the clipboard when a recording session starts (first
//! capture wins) and to **restore** it exactly once when the session ends.
//!
//! [`FeedbackSink`] is the narrow interface the state machine consumes;
//! [`FeedbackInjector`] is the production implementation on top of
//! `arboard` + `enigo`. Tests substitute a recording mock.

pub mod clipboard;
pub mod keyboard;

pub use clipboard::{read_clipboard, write_clipboard};
pub use keyboard::{press_backspace, simulate_paste};

use thiserror::Error;

use crate::config::Platform;

// ---------------------------------------------------------------------------
// InjectError
// ---------------------------------------------------------------------------

/// All errors that can surface during feedback injection.
#[derive(Debug, Error)]
pub enum InjectError {
    /// Could not open or read the system clipboard.
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    /// Could not write text to the system clipboard.
    #[error("cannot set clipboard text: {0}")]
    ClipboardSet(String),

    /// Could not simulate a key press/release event.
    #[error("cannot simulate key press: {0}")]
    KeySimulation(String),
}

// ---------------------------------------------------------------------------
// FeedbackSink
// ---------------------------------------------------------------------------

/// Interface between the input state machine and the platform.
///
/// The machine tracks span lengths itself and guarantees that
/// `erase_chars(n)` is only ever called with the exact number of characters
/// previously passed to [`show_text`](Self::show_text); implementations do
/// not need to defend against stale counts.
pub trait FeedbackSink: Send {
    /// Render `text` at the cursor (replaces the clipboard, simulates paste).
    fn show_text(&mut self, text: &str) -> Result<(), InjectError>;

    /// Remove the last `n` characters (backspace-equivalent operations).
    fn erase_chars(&mut self, n: usize) -> Result<(), InjectError>;

    /// Snapshot the current clipboard contents. Later calls while a
    /// snapshot is pending are no-ops (first capture wins).
    fn save_clipboard(&mut self) -> Result<(), InjectError>;

    /// End-of-session clipboard handling, clearing the pending snapshot:
    ///
    /// * `replacement = None` — put the snapshot back.
    /// * `replacement = Some(text)` — leave `text` on the clipboard instead
    ///   (the "keep original clipboard" setting is off and the session
    ///   produced a transcript).
    fn restore_clipboard(&mut self, replacement: Option<&str>) -> Result<(), InjectError>;
}

// ---------------------------------------------------------------------------
// FeedbackInjector
// ---------------------------------------------------------------------------

/// Production [`FeedbackSink`] backed by `arboard` and `enigo`.
#[derive(Debug)]
pub struct FeedbackInjector {
    platform: Platform,
    /// Pending clipboard snapshot. Outer `None` = no snapshot; inner `None`
    /// = clipboard held no text when the snapshot was taken.
    saved: Option<Option<String>>,
    /// Milliseconds to wait after setting the clipboard before pasting, so
    /// the clipboard manager has flushed before the target reads it.
    pub paste_delay_ms: u64,
}

impl FeedbackInjector {
    /// Create an injector for `platform` with the default paste delay.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            saved: None,
            paste_delay_ms: 50,
        }
    }
}

impl FeedbackSink for FeedbackInjector {
    fn show_text(&mut self, text: &str) -> Result<(), InjectError> {
        if text.is_empty() {
            return Ok(());
        }
        write_clipboard(text)?;
        std::thread::sleep(std::time::Duration::from_millis(self.paste_delay_ms));
        simulate_paste(self.platform)
    }

    fn erase_chars(&mut self, n: usize) -> Result<(), InjectError> {
        press_backspace(n)
    }

    fn save_clipboard(&mut self) -> Result<(), InjectError> {
        if self.saved.is_none() {
            self.saved = Some(read_clipboard()?);
        }
        Ok(())
    }

    fn restore_clipboard(&mut self, replacement: Option<&str>) -> Result<(), InjectError> {
        let saved = self.saved.take();
        match replacement {
            Some(text) => write_clipboard(text),
            None => match saved {
                Some(Some(text)) => write_clipboard(&text),
                // Nothing snapshotted, or the clipboard was empty/non-text:
                // leave it alone.
                _ => Ok(()),
            },
        }
    }
}
