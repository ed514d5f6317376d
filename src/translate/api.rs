//! Core `Translator` trait and `ApiTranslator` implementation.
//!
//! `ApiTranslator` calls any OpenAI-compatible `/v1/chat/completions`
//! endpoint with a fixed translation instruction. All connection details
//! come from [`TranslationConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::TranslationConfig;

// ---------------------------------------------------------------------------
// TranslateError
// ---------------------------------------------------------------------------

/// Errors that can occur during translation.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// HTTP transport or connection error.
    #[error("translation request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("translation request timed out")]
    Timeout,

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse translation response: {0}")]
    Parse(String),

    /// The backend returned a response with no usable text content.
    #[error("translation backend returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for TranslateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranslateError::Timeout
        } else {
            TranslateError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Translator trait
// ---------------------------------------------------------------------------

/// Async trait for text translation backends.
///
/// Implementors must be `Send + Sync` so they can be shared across worker
/// tasks behind an `Arc<dyn Translator>`.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into the backend's configured target language.
    async fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

// ---------------------------------------------------------------------------
// ApiTranslator
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// Works with any provider that speaks the chat-completions wire format —
/// the defaults point at the same account used for recognition uploads.
pub struct ApiTranslator {
    client: reqwest::Client,
    config: TranslationConfig,
}

impl ApiTranslator {
    /// Build an `ApiTranslator` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.
    pub fn from_config(config: &TranslationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn instruction(&self) -> String {
        format!(
            "You are a translation engine. Translate the user's text into {}. \
             Reply with the translation only — no explanations, no quotes.",
            self.config.target_language
        )
    }
}

#[async_trait]
impl Translator for ApiTranslator {
    /// Send `text` to the configured endpoint for translation.
    ///
    /// The `Authorization: Bearer …` header is attached **only** when
    /// `config.api_key` is a non-empty string — safe for local providers
    /// that require no authentication.
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": self.instruction() },
                { "role": "user",   "content": text              }
            ],
            "stream":      false,
            "temperature": 0.2,
            "max_tokens":  512
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranslateError::Parse(e.to_string()))?;

        let translated = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(TranslateError::EmptyResponse)?
            .trim()
            .to_string();

        if translated.is_empty() {
            return Err(TranslateError::EmptyResponse);
        }

        Ok(translated)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
