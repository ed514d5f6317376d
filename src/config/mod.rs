//! Configuration module for voicepaste.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform data directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.
//!
//! Startup validation lives here too: [`AppConfig::usable_providers`] reports
//! which recognition backends have complete credentials, and `main` refuses
//! to start when the list is empty.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, HotkeyConfig, OrchestratorConfig, Platform, TranslationConfig, UploadConfig,
    XunfeiConfig, PROVIDER_GROQ, PROVIDER_SILICONFLOW, PROVIDER_XUNFEI,
};
