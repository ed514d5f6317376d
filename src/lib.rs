//! voicepaste — hold-to-talk cloud dictation.
//!
//! Hold the primary hotkey, speak, release: the captured audio is sent to a
//! cloud speech-recognition backend and the recognized text is pasted at the
//! current cursor position. Holding the secondary hotkey as well translates
//! the recognition result before pasting.
//!
//! # Subsystems
//!
//! | Module         | Responsibility                                          |
//! |----------------|---------------------------------------------------------|
//! | [`config`]     | `settings.toml` persistence and startup validation      |
//! | [`audio`]      | captured-audio types, WAV codec, resampling, mic input  |
//! | [`hotkey`]     | global key listener (rdev) for the two trigger keys     |
//! | [`input`]      | the press/release state machine and feedback lifecycle  |
//! | [`inject`]     | clipboard-paste text injection and feedback erasure     |
//! | [`provider`]   | speech provider adapters (HTTP upload, streaming wss)   |
//! | [`orchestrator`]| priority failover, provider health, cooldown           |
//! | [`translate`]  | text translation adapter for translate mode             |
//!
//! # Data flow
//!
//! ```text
//! rdev thread ─▶ MachineEvent queue ─▶ StateMachine
//!                                        │ release
//!                                        ▼
//!                         AudioSource::stop() ─▶ Orchestrator
//!                                        │          │ failover across
//!                                        │          ▼ providers
//!                                        │     SpeechProvider(s)
//!                                        │          │
//!                                        ▼          ▼ (translate mode)
//!                                  FeedbackSink ◀─ Translator
//! ```

pub mod audio;
pub mod config;
pub mod hotkey;
pub mod input;
pub mod inject;
pub mod orchestrator;
pub mod provider;
pub mod translate;
