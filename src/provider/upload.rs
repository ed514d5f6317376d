//! HTTP multipart-upload recognition adapter.
//!
//! Speaks the OpenAI-compatible audio API: a multipart POST with `file` and
//! `model` parts, bearer auth, JSON response carrying a `text` field. Both
//! the SiliconFlow primary and the Groq fallback are registered as instances
//! of this one adapter — they differ only in config.
//!
//! Uploads are idempotent, so transient transport failures are retried
//! locally (at most [`MAX_RETRIES`] times with a short pause) before the
//! failure is reported to the orchestrator. HTTP status errors are not
//! retried — a 4xx/5xx answer will not improve on resend.

use async_trait::async_trait;

use crate::audio::AudioBuffer;
use crate::config::UploadConfig;

use super::{ProviderError, SpeechProvider, TranscribeMode};

/// Local retries for transient failures, on top of the initial attempt.
pub const MAX_RETRIES: u32 = 2;
/// Pause between local retries.
const RETRY_PAUSE: std::time::Duration = std::time::Duration::from_secs(1);
/// Connection-establish timeout, separate from the overall call timeout.
const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

// ---------------------------------------------------------------------------
// UploadProvider
// ---------------------------------------------------------------------------

/// Multipart-upload adapter for OpenAI-compatible audio endpoints.
pub struct UploadProvider {
    name: String,
    cfg: UploadConfig,
    client: reqwest::Client,
}

impl UploadProvider {
    /// Build an adapter from its registry `name` and [`UploadConfig`].
    ///
    /// The HTTP client carries a connect timeout and the per-call timeout
    /// from config; the orchestrator enforces its own overall deadline on
    /// top of these.
    pub fn new(name: impl Into<String>, cfg: UploadConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            cfg,
            client,
        }
    }

    /// Endpoint for `mode`: native translation goes to `audio/translations`,
    /// everything else to `audio/transcriptions`.
    fn endpoint(&self, mode: TranscribeMode) -> String {
        let op = match mode {
            TranscribeMode::Translate if self.cfg.native_translate => "translations",
            _ => "transcriptions",
        };
        format!("{}/v1/audio/{op}", self.cfg.base_url)
    }

    async fn call_once(&self, url: &str, audio: &AudioBuffer) -> Result<String, ProviderError> {
        let part = reqwest::multipart::Part::bytes(audio.wav.clone())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.cfg.model.clone());

        let mut req = self.client.post(url).multipart(form);

        let key = self.cfg.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Protocol(format!("HTTP {status}: {body}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        extract_text(&json)
    }
}

/// Pull the transcript out of the response body.
fn extract_text(json: &serde_json::Value) -> Result<String, ProviderError> {
    json["text"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| ProviderError::Parse("response has no `text` field".into()))
}

#[async_trait]
impl SpeechProvider for UploadProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn native_translate(&self) -> bool {
        self.cfg.native_translate
    }

    async fn transcribe(
        &self,
        audio: &AudioBuffer,
        mode: TranscribeMode,
    ) -> Result<String, ProviderError> {
        let url = self.endpoint(mode);

        let mut attempt = 0;
        loop {
            match self.call_once(&url, audio).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    log::warn!(
                        "{}: upload failed ({e}), retry {attempt}/{MAX_RETRIES}",
                        self.name
                    );
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(native_translate: bool) -> UploadProvider {
        let mut cfg = UploadConfig::siliconflow();
        cfg.api_key = Some("sk-test".into());
        cfg.native_translate = native_translate;
        UploadProvider::new("siliconflow", cfg)
    }

    #[test]
    fn name_matches_registration() {
        assert_eq!(provider(false).name(), "siliconflow");
    }

    #[test]
    fn native_translate_reflects_config() {
        assert!(!provider(false).native_translate());
        assert!(provider(true).native_translate());
    }

    #[test]
    fn transcribe_mode_uses_transcriptions_endpoint() {
        let p = provider(true);
        assert_eq!(
            p.endpoint(TranscribeMode::Transcribe),
            "https://api.siliconflow.cn/v1/audio/transcriptions"
        );
    }

    #[test]
    fn translate_mode_uses_translations_endpoint_when_native() {
        let p = provider(true);
        assert_eq!(
            p.endpoint(TranscribeMode::Translate),
            "https://api.siliconflow.cn/v1/audio/translations"
        );
    }

    #[test]
    fn translate_mode_without_native_support_stays_on_transcriptions() {
        let p = provider(false);
        assert_eq!(
            p.endpoint(TranscribeMode::Translate),
            "https://api.siliconflow.cn/v1/audio/transcriptions"
        );
    }

    // ---- extract_text ---

    #[test]
    fn extract_text_reads_and_trims() {
        let json = serde_json::json!({ "text": "  hello world \n" });
        assert_eq!(extract_text(&json).unwrap(), "hello world");
    }

    #[test]
    fn extract_text_missing_field_is_parse_error() {
        let json = serde_json::json!({ "transcript": "nope" });
        assert!(matches!(
            extract_text(&json).unwrap_err(),
            ProviderError::Parse(_)
        ));
    }

    // ---- retry classification ---

    #[test]
    fn transport_and_timeout_are_retryable() {
        assert!(ProviderError::Transport("reset".into()).is_retryable());
        assert!(ProviderError::Timeout.is_retryable());
    }

    #[test]
    fn protocol_and_parse_are_not_retryable() {
        assert!(!ProviderError::Protocol("HTTP 401".into()).is_retryable());
        assert!(!ProviderError::Parse("bad json".into()).is_retryable());
    }
}
