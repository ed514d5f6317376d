//! The failover loop: try providers in priority order, first success wins.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioBuffer;
use crate::provider::{SpeechProvider, TranscribeMode};
use crate::translate::{TranslateError, Translator};

use super::health::ProviderRecord;

// ---------------------------------------------------------------------------
// Transcription
// ---------------------------------------------------------------------------

/// Result of one recognition session.
#[derive(Debug, Clone)]
pub struct Transcription {
    /// Recognized (and possibly translated) text. May be empty when the
    /// backend heard nothing usable.
    pub text: String,
    /// Name of the provider that produced the text.
    pub provider: String,
    /// Wall-clock duration of the successful attempt, translation included.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// OrchestratorError
// ---------------------------------------------------------------------------

/// Session-level failures surfaced to the input state machine.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Every registered provider is inside its cooldown window.
    #[error("no recognition provider is currently available")]
    NoEligibleProviders,

    /// Every attempted provider failed.
    #[error("all recognition providers failed: {summary}")]
    Exhausted { summary: String },

    /// Recognition succeeded but the translation step failed. Kept distinct
    /// so it never counts against a recognition provider's health.
    #[error("translation failed: {0}")]
    Translation(#[from] TranslateError),
}

// ---------------------------------------------------------------------------
// SpeechBackend trait
// ---------------------------------------------------------------------------

/// The single contract the input state machine depends on.
///
/// [`Orchestrator`] is the production implementation; tests substitute a
/// mock so state-machine scenarios run without any provider wiring.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Run one recognition session over `audio`. The buffer is consumed —
    /// a session is single-use.
    async fn transcribe_or_translate(
        &self,
        audio: AudioBuffer,
        mode: TranscribeMode,
    ) -> Result<Transcription, OrchestratorError>;
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

struct Entry {
    record: ProviderRecord,
    provider: Arc<dyn SpeechProvider>,
    /// Overall per-call deadline, enforced independently of the adapter's
    /// transport timeouts.
    timeout: Duration,
}

/// Holds the ordered provider registry and executes the failover protocol.
///
/// Health records are mutated only here, under a short-lived lock that is
/// never held across an `await`.
pub struct Orchestrator {
    entries: Mutex<Vec<Entry>>,
    translator: Option<Arc<dyn Translator>>,
    enable_fallback: bool,
}

impl Orchestrator {
    /// Create an empty registry.
    ///
    /// `enable_fallback = false` propagates the first failure immediately
    /// instead of trying the next provider.
    pub fn new(enable_fallback: bool) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            translator: None,
            enable_fallback,
        }
    }

    /// Append `provider` to the registry. Registration order is priority
    /// order: the first registered provider is tried first.
    pub fn register(
        &mut self,
        provider: Arc<dyn SpeechProvider>,
        timeout: Duration,
        cooldown: Duration,
    ) {
        let entries = self.entries.get_mut().unwrap();
        let priority = entries.len();
        let record = ProviderRecord::new(
            provider.name(),
            priority,
            provider.native_translate(),
            cooldown,
        );
        log::info!(
            "registered provider {} (priority {priority}, native_translate={})",
            record.name,
            record.native_translate
        );
        entries.push(Entry {
            record,
            provider,
            timeout,
        });
    }

    /// Attach the translation backend used for non-native translate mode.
    pub fn set_translator(&mut self, translator: Arc<dyn Translator>) {
        self.translator = Some(translator);
    }

    /// Number of registered providers.
    pub fn provider_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Consecutive-failure count for `name`, if registered. Test and
    /// logging accessor.
    pub fn failure_count(&self, name: &str) -> Option<u32> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.record.name == name)
            .map(|e| e.record.consecutive_failures())
    }

    /// Whether `name` is currently inside its cooldown window.
    pub fn is_cooling_down(&self, name: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.record.name == name)
            .is_some_and(|e| !e.record.is_eligible(Instant::now()))
    }

    async fn apply_translation(&self, text: String) -> Result<String, OrchestratorError> {
        if text.is_empty() {
            // Nothing was recognized; the caller turns this into a warning.
            return Ok(text);
        }
        match &self.translator {
            Some(translator) => Ok(translator.translate(&text).await?),
            None => Err(OrchestratorError::Translation(TranslateError::Request(
                "no translation backend configured".into(),
            ))),
        }
    }
}

#[async_trait]
impl SpeechBackend for Orchestrator {
    async fn transcribe_or_translate(
        &self,
        audio: AudioBuffer,
        mode: TranscribeMode,
    ) -> Result<Transcription, OrchestratorError> {
        // Snapshot the registry so no lock is held across provider calls.
        let candidates: Vec<(usize, String, Arc<dyn SpeechProvider>, Duration, bool)> = {
            let entries = self.entries.lock().unwrap();
            entries
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    (
                        i,
                        e.record.name.clone(),
                        Arc::clone(&e.provider),
                        e.timeout,
                        e.record.native_translate,
                    )
                })
                .collect()
        };

        let mut failures: Vec<(String, String)> = Vec::new();

        for (idx, name, provider, per_timeout, native_translate) in candidates {
            let eligible = {
                let entries = self.entries.lock().unwrap();
                entries[idx].record.is_eligible(Instant::now())
            };
            if !eligible {
                // Skipping does not count against the provider.
                log::debug!("{name}: inside cooldown window, skipped");
                continue;
            }

            log::info!("{name}: attempting recognition ({mode:?})");
            let started = Instant::now();

            let outcome =
                tokio::time::timeout(per_timeout, provider.transcribe(&audio, mode)).await;

            let error = match outcome {
                Ok(Ok(text)) => {
                    {
                        let mut entries = self.entries.lock().unwrap();
                        entries[idx].record.record_success();
                    }

                    let text = if mode == TranscribeMode::Translate && !native_translate {
                        self.apply_translation(text).await?
                    } else {
                        text
                    };

                    let elapsed = started.elapsed();
                    log::info!("{name}: recognition succeeded in {elapsed:.1?}");
                    return Ok(Transcription {
                        text,
                        provider: name,
                        elapsed,
                    });
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("call exceeded {per_timeout:?} deadline"),
            };

            {
                let mut entries = self.entries.lock().unwrap();
                entries[idx].record.record_failure(Instant::now());
                log::warn!(
                    "{name}: recognition failed ({error}); failure #{} — cooling down",
                    entries[idx].record.consecutive_failures()
                );
            }
            failures.push((name, error));

            if !self.enable_fallback {
                break;
            }
        }

        if failures.is_empty() {
            Err(OrchestratorError::NoEligibleProviders)
        } else {
            let summary = failures
                .iter()
                .map(|(name, error)| format!("{name}: {error}"))
                .collect::<Vec<_>>()
                .join("; ");
            Err(OrchestratorError::Exhausted { summary })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::provider::ProviderError;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Provider whose outcome is fixed; counts how often it is invoked.
    struct StubProvider {
        name: &'static str,
        native_translate: bool,
        succeed: bool,
        delay: Option<Duration>,
        calls: AtomicU32,
    }

    impl StubProvider {
        fn ok(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                native_translate: false,
                succeed: true,
                delay: None,
                calls: AtomicU32::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                native_translate: false,
                succeed: false,
                delay: None,
                calls: AtomicU32::new(0),
            })
        }

        fn slow(name: &'static str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name,
                native_translate: false,
                succeed: true,
                delay: Some(delay),
                calls: AtomicU32::new(0),
            })
        }

        fn native(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                native_translate: true,
                succeed: true,
                delay: None,
                calls: AtomicU32::new(0),
            })
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn native_translate(&self) -> bool {
            self.native_translate
        }

        async fn transcribe(
            &self,
            _audio: &AudioBuffer,
            _mode: TranscribeMode,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.succeed {
                Ok(format!("text from {}", self.name))
            } else {
                Err(ProviderError::Transport("connection refused".into()))
            }
        }
    }

    /// Translator with a fixed outcome.
    struct StubTranslator {
        succeed: bool,
        calls: AtomicU32,
    }

    impl StubTranslator {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                succeed: true,
                calls: AtomicU32::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                succeed: false,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Translator for StubTranslator {
        async fn translate(&self, text: &str) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(format!("translated: {text}"))
            } else {
                Err(TranslateError::Timeout)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    const TIMEOUT: Duration = Duration::from_secs(5);
    const COOLDOWN: Duration = Duration::from_secs(300);

    fn audio() -> AudioBuffer {
        AudioBuffer {
            wav: vec![0; 64],
            sample_rate: 16_000,
            duration_secs: 2.0,
        }
    }

    fn orchestrator_with(providers: &[Arc<StubProvider>]) -> Orchestrator {
        let mut orc = Orchestrator::new(true);
        for p in providers {
            orc.register(Arc::clone(p) as Arc<dyn SpeechProvider>, TIMEOUT, COOLDOWN);
        }
        orc
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn first_success_wins_and_later_providers_are_not_consulted() {
        let p1 = StubProvider::failing("p1");
        let p2 = StubProvider::ok("p2");
        let p3 = StubProvider::ok("p3");
        let orc = orchestrator_with(&[Arc::clone(&p1), Arc::clone(&p2), Arc::clone(&p3)]);

        let result = orc
            .transcribe_or_translate(audio(), TranscribeMode::Transcribe)
            .await
            .expect("p2 should serve the request");

        assert_eq!(result.provider, "p2");
        assert_eq!(result.text, "text from p2");
        assert_eq!(p1.call_count(), 1);
        assert_eq!(p2.call_count(), 1);
        assert_eq!(p3.call_count(), 0);
        assert_eq!(orc.failure_count("p1"), Some(1));
        assert_eq!(orc.failure_count("p2"), Some(0));
    }

    #[tokio::test]
    async fn cooling_down_provider_is_skipped_without_being_counted() {
        let p1 = StubProvider::failing("p1");
        let p2 = StubProvider::ok("p2");
        let orc = orchestrator_with(&[Arc::clone(&p1), Arc::clone(&p2)]);

        // First session puts p1 on cooldown.
        orc.transcribe_or_translate(audio(), TranscribeMode::Transcribe)
            .await
            .unwrap();
        assert!(orc.is_cooling_down("p1"));

        // Second session must not touch p1 at all.
        let result = orc
            .transcribe_or_translate(audio(), TranscribeMode::Transcribe)
            .await
            .unwrap();

        assert_eq!(result.provider, "p2");
        assert_eq!(p1.call_count(), 1);
        assert_eq!(orc.failure_count("p1"), Some(1), "skip must not count");
    }

    #[tokio::test]
    async fn elapsed_cooldown_reprobes_the_provider() {
        let p1 = StubProvider::failing("p1");
        let p2 = StubProvider::ok("p2");

        let mut orc = Orchestrator::new(true);
        // Zero cooldown: eligible again immediately after a failure.
        orc.register(
            Arc::clone(&p1) as Arc<dyn SpeechProvider>,
            TIMEOUT,
            Duration::ZERO,
        );
        orc.register(Arc::clone(&p2) as Arc<dyn SpeechProvider>, TIMEOUT, COOLDOWN);

        orc.transcribe_or_translate(audio(), TranscribeMode::Transcribe)
            .await
            .unwrap();
        orc.transcribe_or_translate(audio(), TranscribeMode::Transcribe)
            .await
            .unwrap();

        assert_eq!(p1.call_count(), 2, "p1 must be re-probed after cooldown");
        assert_eq!(orc.failure_count("p1"), Some(2));
    }

    #[tokio::test]
    async fn exhaustion_counts_each_provider_exactly_once() {
        let p1 = StubProvider::failing("p1");
        let p2 = StubProvider::failing("p2");
        let p3 = StubProvider::failing("p3");
        let orc = orchestrator_with(&[Arc::clone(&p1), Arc::clone(&p2), Arc::clone(&p3)]);

        let err = orc
            .transcribe_or_translate(audio(), TranscribeMode::Transcribe)
            .await
            .unwrap_err();

        match err {
            OrchestratorError::Exhausted { summary } => {
                assert!(summary.contains("p1"));
                assert!(summary.contains("p2"));
                assert!(summary.contains("p3"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        for p in [&p1, &p2, &p3] {
            assert_eq!(p.call_count(), 1);
        }
        assert_eq!(orc.failure_count("p1"), Some(1));
        assert_eq!(orc.failure_count("p2"), Some(1));
        assert_eq!(orc.failure_count("p3"), Some(1));
    }

    #[tokio::test]
    async fn disabled_fallback_propagates_the_first_failure() {
        let p1 = StubProvider::failing("p1");
        let p2 = StubProvider::ok("p2");

        let mut orc = Orchestrator::new(false);
        orc.register(Arc::clone(&p1) as Arc<dyn SpeechProvider>, TIMEOUT, COOLDOWN);
        orc.register(Arc::clone(&p2) as Arc<dyn SpeechProvider>, TIMEOUT, COOLDOWN);

        let err = orc
            .transcribe_or_translate(audio(), TranscribeMode::Transcribe)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Exhausted { .. }));
        assert_eq!(p2.call_count(), 0, "fallback is disabled");
    }

    #[tokio::test]
    async fn all_providers_cooling_down_is_no_eligible_providers() {
        let p1 = StubProvider::failing("p1");
        let orc = orchestrator_with(&[Arc::clone(&p1)]);

        // Put p1 on cooldown.
        let _ = orc
            .transcribe_or_translate(audio(), TranscribeMode::Transcribe)
            .await;

        let err = orc
            .transcribe_or_translate(audio(), TranscribeMode::Transcribe)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::NoEligibleProviders));
        assert_eq!(p1.call_count(), 1);
    }

    #[tokio::test]
    async fn per_provider_timeout_counts_as_failure() {
        let slow = StubProvider::slow("slow", Duration::from_millis(200));
        let fast = StubProvider::ok("fast");

        let mut orc = Orchestrator::new(true);
        orc.register(
            Arc::clone(&slow) as Arc<dyn SpeechProvider>,
            Duration::from_millis(20),
            COOLDOWN,
        );
        orc.register(Arc::clone(&fast) as Arc<dyn SpeechProvider>, TIMEOUT, COOLDOWN);

        let result = orc
            .transcribe_or_translate(audio(), TranscribeMode::Transcribe)
            .await
            .unwrap();

        assert_eq!(result.provider, "fast");
        assert_eq!(orc.failure_count("slow"), Some(1));
        assert!(orc.is_cooling_down("slow"));
    }

    #[tokio::test]
    async fn translate_mode_routes_through_translator() {
        let p1 = StubProvider::ok("p1");
        let translator = StubTranslator::ok();

        let mut orc = orchestrator_with(&[Arc::clone(&p1)]);
        orc.set_translator(Arc::clone(&translator) as Arc<dyn Translator>);

        let result = orc
            .transcribe_or_translate(audio(), TranscribeMode::Translate)
            .await
            .unwrap();

        assert_eq!(result.text, "translated: text from p1");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn native_translation_skips_the_translator() {
        let p1 = StubProvider::native("p1");
        let translator = StubTranslator::ok();

        let mut orc = orchestrator_with(&[Arc::clone(&p1)]);
        orc.set_translator(Arc::clone(&translator) as Arc<dyn Translator>);

        let result = orc
            .transcribe_or_translate(audio(), TranscribeMode::Translate)
            .await
            .unwrap();

        assert_eq!(result.text, "text from p1");
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transcribe_mode_never_touches_the_translator() {
        let p1 = StubProvider::ok("p1");
        let translator = StubTranslator::ok();

        let mut orc = orchestrator_with(&[Arc::clone(&p1)]);
        orc.set_translator(Arc::clone(&translator) as Arc<dyn Translator>);

        orc.transcribe_or_translate(audio(), TranscribeMode::Transcribe)
            .await
            .unwrap();

        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn translation_failure_is_distinct_and_does_not_cool_down_recognition() {
        let p1 = StubProvider::ok("p1");
        let translator = StubTranslator::failing();

        let mut orc = orchestrator_with(&[Arc::clone(&p1)]);
        orc.set_translator(Arc::clone(&translator) as Arc<dyn Translator>);

        let err = orc
            .transcribe_or_translate(audio(), TranscribeMode::Translate)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Translation(_)));
        // Recognition succeeded — p1's health is untouched.
        assert_eq!(orc.failure_count("p1"), Some(0));
        assert!(!orc.is_cooling_down("p1"));
    }

    #[tokio::test]
    async fn translate_mode_without_translator_is_a_translation_error() {
        let p1 = StubProvider::ok("p1");
        let orc = orchestrator_with(&[Arc::clone(&p1)]);

        let err = orc
            .transcribe_or_translate(audio(), TranscribeMode::Translate)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Translation(_)));
    }
}
