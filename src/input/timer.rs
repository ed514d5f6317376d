//! Cancellable timers feeding the state-machine event queue.
//!
//! [`HoldTimer`] implements the hold-duration check: a background task polls
//! every 10 ms while the primary key is held and posts
//! [`MachineEvent::HoldExpired`] once the configured threshold is reached.
//! The owning machine aborts it on key release, so a released key can never
//! produce a late threshold event under a newer generation (and the
//! generation tag catches the remaining in-flight window).

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::MachineEvent;

/// Poll granularity of the hold-duration check.
const TICK: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// HoldTimer
// ---------------------------------------------------------------------------

/// Handle to a running hold-duration check.
///
/// Dropping the handle aborts the task.
pub struct HoldTimer {
    handle: JoinHandle<()>,
}

impl HoldTimer {
    /// Start polling; posts `HoldExpired { generation }` on `tx` once the
    /// key has been held for `threshold`, then exits.
    pub fn start(threshold: Duration, generation: u64, tx: mpsc::Sender<MachineEvent>) -> Self {
        let handle = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut tick = tokio::time::interval(TICK);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tick.tick().await;
                if started.elapsed() >= threshold {
                    let _ = tx.send(MachineEvent::HoldExpired { generation }).await;
                    return;
                }
            }
        });

        Self { handle }
    }

    /// Abort the check. Idempotent; also happens on drop.
    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for HoldTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// notify_after
// ---------------------------------------------------------------------------

/// Post `event` on `tx` after `delay`. Used for the auto-clear of transient
/// warning/error feedback.
pub fn notify_after(
    delay: Duration,
    event: MachineEvent,
    tx: mpsc::Sender<MachineEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = tx.send(event).await;
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_threshold() {
        let (tx, mut rx) = mpsc::channel(4);
        let _timer = HoldTimer::start(Duration::from_millis(500), 7, tx);

        tokio::time::sleep(Duration::from_millis(490)).await;
        assert!(rx.try_recv().is_err(), "must not fire early");

        tokio::time::sleep(Duration::from_millis(30)).await;
        match rx.try_recv() {
            Ok(MachineEvent::HoldExpired { generation }) => assert_eq!(generation, 7),
            other => panic!("expected HoldExpired, got {other:?}"),
        }

        // And only once.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let timer = HoldTimer::start(Duration::from_millis(500), 1, tx);

        tokio::time::sleep(Duration::from_millis(300)).await;
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err(), "cancelled timer must stay silent");
    }

    #[tokio::test(start_paused = true)]
    async fn notify_after_delivers_late() {
        let (tx, mut rx) = mpsc::channel(4);
        notify_after(Duration::from_secs(2), MachineEvent::FeedbackExpired, tx);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(matches!(rx.try_recv(), Ok(MachineEvent::FeedbackExpired)));
    }
}
