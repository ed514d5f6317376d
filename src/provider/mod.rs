//! Speech provider adapters.
//!
//! Each cloud recognition backend is wrapped in one adapter implementing
//! [`SpeechProvider`]: it turns a captured [`AudioBuffer`] plus a
//! [`TranscribeMode`] into recognized text using that backend's wire
//! protocol, and nothing else — health tracking, failover and translation
//! routing live in the orchestrator.
//!
//! Two wire contracts are implemented:
//!
//! * [`UploadProvider`] — HTTP multipart upload to an OpenAI-compatible
//!   `audio/transcriptions` endpoint (SiliconFlow, Groq).
//! * [`XunfeiProvider`] — the stateful streaming WebSocket protocol with
//!   signed connection URLs, 40 ms audio frames and partial results.
//!
//! Adapters are stateless across calls except for connection setup; they do
//! not retry across sessions (the upload adapter retries transient transport
//! failures locally because the upload is idempotent).

pub mod auth;
pub mod upload;
pub mod xunfei;

pub use upload::UploadProvider;
pub use xunfei::XunfeiProvider;

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::{AudioBuffer, AudioError};

// ---------------------------------------------------------------------------
// TranscribeMode
// ---------------------------------------------------------------------------

/// What the caller wants back: the spoken text as-is, or its translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscribeMode {
    /// Recognize and return the original language.
    Transcribe,
    /// Recognize and translate into the configured target language.
    Translate,
}

// ---------------------------------------------------------------------------
// ProviderError
// ---------------------------------------------------------------------------

/// Failures surfaced by a provider adapter.
///
/// The orchestrator treats every variant as grounds for cooldown + failover;
/// the distinctions exist for logging and for the adapters' own retry
/// decisions (only `Transport` and `Timeout` are safely retryable).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection-level failure (refused, reset, TLS, DNS, …).
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not complete within the adapter's transport timeouts.
    #[error("request timed out")]
    Timeout,

    /// The backend answered with a non-success status code or error body.
    #[error("provider rejected the request: {0}")]
    Protocol(String),

    /// The response arrived but could not be parsed.
    #[error("cannot parse provider response: {0}")]
    Parse(String),

    /// The captured audio could not be decoded for this backend.
    #[error("audio rejected: {0}")]
    Audio(#[from] AudioError),

    /// The utterance exceeds the backend's maximum duration.
    #[error("utterance too long: {got:.1}s exceeds {max}s limit")]
    UtteranceTooLong { got: f32, max: u32 },
}

impl ProviderError {
    /// `true` for failures an idempotent upload may retry locally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transport(_) | ProviderError::Timeout)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ProviderError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ProviderError::Transport(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// SpeechProvider trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for recognition backends.
///
/// Implementations must be `Send + Sync` so that they can be held behind an
/// `Arc<dyn SpeechProvider>` and called from any worker task.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Registry name, used in logs and in the result's provenance.
    fn name(&self) -> &str;

    /// `true` when the backend can translate natively; otherwise the
    /// orchestrator routes recognized text through the translation adapter.
    fn native_translate(&self) -> bool {
        false
    }

    /// Recognize `audio` and return the text.
    ///
    /// `mode` is only meaningful to backends that translate natively; the
    /// others recognize the original language regardless.
    async fn transcribe(
        &self,
        audio: &AudioBuffer,
        mode: TranscribeMode,
    ) -> Result<String, ProviderError>;
}

// Compile-time assertion: Box<dyn SpeechProvider> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechProvider>) {}
};
