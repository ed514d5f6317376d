//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize` and `Clone` so they can
//! be round-tripped through `settings.toml` and shared across threads.
//! Provider credentials default to `None`; a backend without complete
//! credentials is skipped at registration time.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Registry name of the SiliconFlow upload backend.
pub const PROVIDER_SILICONFLOW: &str = "siliconflow";
/// Registry name of the Xunfei streaming backend.
pub const PROVIDER_XUNFEI: &str = "xunfei";
/// Registry name of the Groq upload backend.
pub const PROVIDER_GROQ: &str = "groq";

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Target desktop platform — selects the modifier key used for the simulated
/// paste chord (⌘V on macOS, Ctrl+V elsewhere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Mac,
    Windows,
    Linux,
}

impl Default for Platform {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Mac
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey bindings and press timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Primary key — hold to record, release to transcribe (e.g. `"F8"`).
    pub primary_key: String,
    /// Secondary key — held together with the primary key for translate
    /// mode (e.g. `"F7"`).
    pub secondary_key: String,
    /// Milliseconds the primary key must be held before recording starts.
    /// Shorter taps are ignored.
    pub press_threshold_ms: u64,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            primary_key: "F8".into(),
            secondary_key: "F7".into(),
            press_threshold_ms: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// OrchestratorConfig
// ---------------------------------------------------------------------------

/// Failover policy for the provider registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Provider names in priority order. Unknown names are rejected at
    /// startup; names without credentials are skipped with a warning.
    pub priority: Vec<String>,
    /// Try the next provider when one fails. When `false`, the first
    /// failure is surfaced immediately.
    pub enable_fallback: bool,
    /// Seconds a failing provider is held ineligible before being re-probed.
    pub cooldown_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            priority: vec![
                PROVIDER_SILICONFLOW.into(),
                PROVIDER_XUNFEI.into(),
                PROVIDER_GROQ.into(),
            ],
            enable_fallback: true,
            cooldown_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// UploadConfig  (SiliconFlow / Groq — OpenAI-compatible audio endpoints)
// ---------------------------------------------------------------------------

/// Settings for an HTTP multipart-upload recognition backend.
///
/// Used twice: once for the SiliconFlow primary and once for the Groq
/// fallback — the two speak the same wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Bearer token. `None` disables the backend.
    pub api_key: Option<String>,
    /// API root, e.g. `https://api.siliconflow.cn`.
    pub base_url: String,
    /// Model identifier sent in the `model` form field.
    pub model: String,
    /// Overall per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Whether the backend exposes a native `audio/translations` endpoint.
    pub native_translate: bool,
}

impl UploadConfig {
    /// Defaults for the SiliconFlow primary backend.
    pub fn siliconflow() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.siliconflow.cn".into(),
            model: "FunAudioLLM/SenseVoiceSmall".into(),
            timeout_secs: 20,
            native_translate: false,
        }
    }

    /// Defaults for the Groq fallback backend.
    pub fn groq() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.groq.com/openai".into(),
            model: "whisper-large-v3-turbo".into(),
            timeout_secs: 20,
            native_translate: true,
        }
    }

    /// `true` when the backend can be registered.
    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

// ---------------------------------------------------------------------------
// XunfeiConfig  (streaming WebSocket backend)
// ---------------------------------------------------------------------------

/// Settings for the Xunfei real-time streaming backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XunfeiConfig {
    /// Application id issued by the open platform.
    pub app_id: Option<String>,
    /// API key — goes into the signed authorization header value.
    pub api_key: Option<String>,
    /// API secret — HMAC-SHA256 signing key. Never sent on the wire.
    pub api_secret: Option<String>,
    /// Service host.
    pub host: String,
    /// Request path signed into the connection URL.
    pub path: String,
    /// Overall per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Recognition language, e.g. `"zh_cn"`.
    pub language: String,
    /// Recognition domain, e.g. `"slm"`.
    pub domain: String,
    /// Voice-activity end-of-speech timeout in milliseconds.
    pub vad_eos_ms: u32,
}

impl Default for XunfeiConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            api_key: None,
            api_secret: None,
            host: "iat.xf-yun.com".into(),
            path: "/v1".into(),
            timeout_secs: 30,
            language: "zh_cn".into(),
            domain: "slm".into(),
            vad_eos_ms: 5000,
        }
    }
}

impl XunfeiConfig {
    /// `true` when app id, key and secret are all present and non-empty.
    pub fn has_credentials(&self) -> bool {
        [&self.app_id, &self.api_key, &self.api_secret]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// TranslationConfig
// ---------------------------------------------------------------------------

/// Settings for the text translation backend used when the chosen
/// recognition provider has no native translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Base URL of an OpenAI-compatible chat-completions API.
    pub base_url: String,
    /// API key — `None` for local providers that need no authentication.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Target language name injected into the instruction, e.g. `"English"`.
    pub target_language: String,
    /// Maximum seconds to wait for a translation response.
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.siliconflow.cn".into(),
            api_key: None,
            model: "Qwen/Qwen2.5-7B-Instruct".into(),
            target_language: "English".into(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voicepaste::config::AppConfig;
///
/// // Load (returns Default when the file is missing)
/// let config = AppConfig::load().unwrap();
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Desktop platform (paste modifier selection).
    pub platform: Platform,
    /// Restore the pre-session clipboard after injection. When `false`, the
    /// recognized text is left on the clipboard instead.
    pub keep_original_clipboard: bool,
    /// Hotkey bindings and press timing.
    pub hotkey: HotkeyConfig,
    /// Failover policy.
    pub orchestrator: OrchestratorConfig,
    /// SiliconFlow upload backend.
    pub siliconflow: UploadConfig,
    /// Xunfei streaming backend.
    pub xunfei: XunfeiConfig,
    /// Groq upload backend.
    pub groq: UploadConfig,
    /// Translation backend.
    pub translation: TranslationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            keep_original_clipboard: true,
            hotkey: HotkeyConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            siliconflow: UploadConfig::siliconflow(),
            xunfei: XunfeiConfig::default(),
            groq: UploadConfig::groq(),
            translation: TranslationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Names from the priority list whose backend has complete credentials,
    /// in priority order.
    ///
    /// `main` treats an empty result as fatal: running with zero usable
    /// recognition providers would make every session fail.
    pub fn usable_providers(&self) -> Vec<&str> {
        self.orchestrator
            .priority
            .iter()
            .map(String::as_str)
            .filter(|name| match *name {
                PROVIDER_SILICONFLOW => self.siliconflow.has_credentials(),
                PROVIDER_XUNFEI => self.xunfei.has_credentials(),
                PROVIDER_GROQ => self.groq.has_credentials(),
                other => {
                    log::warn!("unknown provider name in priority list: {other}");
                    false
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
