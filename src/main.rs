//! Application entry point — voicepaste.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run) and
//!    refuse to start unless at least one recognition provider has complete
//!    credentials.
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the provider registry, orchestrator and translation adapter.
//! 5. Open the microphone capture stream.
//! 6. Spawn the hotkey listener thread and the event forwarder.
//! 7. Run the input state machine on the runtime — blocks for the process
//!    lifetime.

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::mpsc;

use voicepaste::{
    audio::MicSource,
    config::{AppConfig, AppPaths, PROVIDER_GROQ, PROVIDER_SILICONFLOW, PROVIDER_XUNFEI},
    hotkey::{parse_key, HotkeyListener},
    inject::FeedbackInjector,
    input::{new_shared_state, MachineConfig, MachineEvent, StateMachine},
    orchestrator::{Orchestrator, SpeechBackend},
    provider::{SpeechProvider, UploadProvider, XunfeiProvider},
    translate::{ApiTranslator, Translator},
};

// ---------------------------------------------------------------------------
// Registry construction
// ---------------------------------------------------------------------------

/// Build the orchestrator from the priority list, skipping backends without
/// credentials (already filtered by [`AppConfig::usable_providers`]).
fn build_orchestrator(config: &AppConfig, usable: &[&str]) -> Orchestrator {
    let cooldown = std::time::Duration::from_secs(config.orchestrator.cooldown_secs);
    let mut orchestrator = Orchestrator::new(config.orchestrator.enable_fallback);

    for &name in usable {
        let (provider, timeout_secs): (Arc<dyn SpeechProvider>, u64) = match name {
            PROVIDER_SILICONFLOW => (
                Arc::new(UploadProvider::new(name, config.siliconflow.clone())),
                config.siliconflow.timeout_secs,
            ),
            PROVIDER_GROQ => (
                Arc::new(UploadProvider::new(name, config.groq.clone())),
                config.groq.timeout_secs,
            ),
            PROVIDER_XUNFEI => (
                Arc::new(
                    XunfeiProvider::new(config.xunfei.clone())
                        .with_partial(Arc::new(|text| log::debug!("partial result: {text}"))),
                ),
                config.xunfei.timeout_secs,
            ),
            other => {
                log::warn!("unknown provider {other} survived validation, skipping");
                continue;
            }
        };

        orchestrator.register(
            provider,
            std::time::Duration::from_secs(timeout_secs),
            cooldown,
        );
    }

    let translator: Arc<dyn Translator> = Arc::new(ApiTranslator::from_config(&config.translation));
    orchestrator.set_translator(translator);

    orchestrator
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voicepaste starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    let usable = config.usable_providers();
    if usable.is_empty() {
        bail!(
            "no recognition provider has complete credentials — add them to {}",
            AppPaths::new().settings_file.display()
        );
    }
    log::info!("recognition providers (priority order): {}", usable.join(", "));

    // 3. Tokio runtime (2 workers — recognition sessions + timers)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Orchestrator + translation
    let backend: Arc<dyn SpeechBackend> = Arc::new(build_orchestrator(&config, &usable));

    // 5. Microphone. The stream handle must stay on this thread for the
    //    process lifetime.
    let (mic, _stream) = MicSource::open().context("audio capture unavailable")?;

    // 6. Hotkeys
    let primary = parse_key(&config.hotkey.primary_key).unwrap_or_else(|| {
        log::warn!(
            "unknown primary key {:?}, falling back to F8",
            config.hotkey.primary_key
        );
        rdev::Key::F8
    });
    let secondary = parse_key(&config.hotkey.secondary_key).unwrap_or_else(|| {
        log::warn!(
            "unknown secondary key {:?}, falling back to F7",
            config.hotkey.secondary_key
        );
        rdev::Key::F7
    });
    log::info!(
        "hold {} to transcribe, {} + {} to translate",
        config.hotkey.primary_key,
        config.hotkey.secondary_key,
        config.hotkey.primary_key
    );

    let (hotkey_tx, mut hotkey_rx) = mpsc::channel(16);
    let _listener = HotkeyListener::start(primary, secondary, hotkey_tx);

    // 7. State machine
    let (event_tx, event_rx) = mpsc::channel::<MachineEvent>(64);
    let machine = StateMachine::new(
        MachineConfig::from_app(&config),
        new_shared_state(),
        FeedbackInjector::new(config.platform),
        Arc::new(mic),
        backend,
        event_tx.clone(),
    );

    rt.block_on(async move {
        // Forward listener edges into the machine's queue.
        tokio::spawn(async move {
            while let Some(ev) = hotkey_rx.recv().await {
                if event_tx.send(MachineEvent::Key(ev)).await.is_err() {
                    break;
                }
            }
        });

        log::info!("=== voicepaste ready ===");
        machine.run(event_rx).await;
    });

    Ok(())
}
