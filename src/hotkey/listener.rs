//! Dedicated OS-thread hotkey listener using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`HotkeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! # Auto-repeat
//!
//! While a key is physically held, the OS delivers repeated `KeyPress`
//! events. The callback keeps a held-flag per watched key and forwards only
//! the first press and the matching release, so consumers always see clean
//! edges.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**. Setting the stop flag
//! prevents events from being forwarded, but the OS thread itself will
//! remain blocked in the rdev event loop until the process exits. This is
//! safe and expected — rdev holds no resources that need explicit cleanup.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use super::HotkeyEvent;

// ---------------------------------------------------------------------------
// HotkeyListener
// ---------------------------------------------------------------------------

/// Handle to a running hotkey listener thread.
///
/// Construct one with [`HotkeyListener::start`]. Drop it to stop forwarding
/// events.
pub struct HotkeyListener {
    /// Shared stop flag — set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// The thread handle. Kept alive so the thread is not detached
    /// prematurely; we never `join` it because `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn a dedicated OS thread that watches `primary` and `secondary`
    /// and forwards press/release edges on `tx`.
    ///
    /// The background thread uses `blocking_send` so it works correctly from
    /// a non-async context.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn start(
        primary: rdev::Key,
        secondary: rdev::Key,
        tx: mpsc::Sender<HotkeyEvent>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let mut primary_held = false;
                let mut secondary_held = false;

                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    let forwarded = match event.event_type {
                        rdev::EventType::KeyPress(k) if k == primary && !primary_held => {
                            primary_held = true;
                            Some(HotkeyEvent::PrimaryPressed)
                        }
                        rdev::EventType::KeyRelease(k) if k == primary => {
                            primary_held = false;
                            Some(HotkeyEvent::PrimaryReleased)
                        }
                        rdev::EventType::KeyPress(k) if k == secondary && !secondary_held => {
                            secondary_held = true;
                            Some(HotkeyEvent::SecondaryPressed)
                        }
                        rdev::EventType::KeyRelease(k) if k == secondary => {
                            secondary_held = false;
                            Some(HotkeyEvent::SecondaryReleased)
                        }
                        _ => None,
                    };

                    if let Some(ev) = forwarded {
                        // blocking_send is safe to call from non-async threads.
                        let _ = tx.blocking_send(ev);
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {:?}", e);
                }
            })
            .expect("failed to spawn hotkey-listener thread");

        Self {
            stop,
            _thread: thread,
        }
    }
}

impl Drop for HotkeyListener {
    /// Set the stop flag so the rdev callback stops forwarding events.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // The OS thread stays blocked inside rdev::listen until the process
        // exits; it holds nothing that needs cleanup.
    }
}
