//! Text translation for translate mode.
//!
//! Invoked by the orchestrator when the user requested translation and the
//! provider that produced the transcript cannot translate natively. The
//! translation backend is an OpenAI-compatible chat-completions endpoint;
//! nothing provider-specific is hardcoded.
//!
//! Translation failures carry their own error type so the caller can tell
//! them apart from recognition failures — they never count against a
//! recognition provider's health.

pub mod api;

pub use api::{ApiTranslator, TranslateError, Translator};
