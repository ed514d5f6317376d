//! Backend orchestration — priority failover across recognition providers.
//!
//! The orchestrator owns the only mutable view of provider health. Each
//! session calls [`SpeechBackend::transcribe_or_translate`] once; providers
//! are tried strictly in registration (priority) order, a failing provider
//! is put on a cooldown during which it is skipped without being counted
//! against, and the first success short-circuits the scan.
//!
//! ```text
//! transcribe_or_translate(audio, mode)
//!   for provider in registry (priority order):
//!       skip unless healthy or cooldown elapsed
//!       timeout(provider.transcribe(audio, mode))
//!         ├─ Ok    → reset health, translate if needed, return
//!         └─ Err   → failures += 1, start cooldown, next provider
//!   all failed / none eligible → exhaustion error
//! ```
//!
//! Failover is sequential on purpose: racing every provider in parallel
//! would spend quota on calls that are then abandoned.

pub mod failover;
pub mod health;

pub use failover::{Orchestrator, OrchestratorError, SpeechBackend, Transcription};
pub use health::{ProviderHealth, ProviderRecord};
