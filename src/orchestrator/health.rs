//! Per-provider health bookkeeping.
//!
//! A [`ProviderRecord`] exists for every registered backend and lives for
//! the process lifetime. Only the orchestrator mutates it.

use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// ProviderHealth
// ---------------------------------------------------------------------------

/// Health state of one registered provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderHealth {
    /// Last attempt succeeded (or the provider has not been tried yet).
    Healthy,
    /// Last attempt failed; the provider is skipped until its cooldown
    /// window elapses.
    CoolingDown,
}

// ---------------------------------------------------------------------------
// ProviderRecord
// ---------------------------------------------------------------------------

/// Health and identity bookkeeping for one registered backend.
#[derive(Debug, Clone)]
pub struct ProviderRecord {
    /// Registry name.
    pub name: String,
    /// Position in the priority order (0 = tried first).
    pub priority: usize,
    /// Capability flag: can the backend translate natively?
    pub native_translate: bool,
    health: ProviderHealth,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    cooldown: Duration,
}

impl ProviderRecord {
    /// Create a healthy record.
    pub fn new(
        name: impl Into<String>,
        priority: usize,
        native_translate: bool,
        cooldown: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            native_translate,
            health: ProviderHealth::Healthy,
            consecutive_failures: 0,
            last_failure: None,
            cooldown,
        }
    }

    /// Whether the provider may be tried at `now`.
    ///
    /// A cooling-down provider becomes eligible again exactly at
    /// `last_failure + cooldown` (boundary inclusive); re-probing it then is
    /// the only health check there is.
    pub fn is_eligible(&self, now: Instant) -> bool {
        match self.health {
            ProviderHealth::Healthy => true,
            ProviderHealth::CoolingDown => match self.last_failure {
                Some(failed_at) => now >= failed_at + self.cooldown,
                None => true,
            },
        }
    }

    /// Register a failed attempt: count it and (re)start the cooldown.
    pub fn record_failure(&mut self, now: Instant) {
        self.consecutive_failures += 1;
        self.health = ProviderHealth::CoolingDown;
        self.last_failure = Some(now);
    }

    /// Register a successful attempt: reset the failure count and cooldown.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.health = ProviderHealth::Healthy;
        self.last_failure = None;
    }

    pub fn health(&self) -> ProviderHealth {
        self.health
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(300);

    #[test]
    fn new_record_is_healthy_and_eligible() {
        let record = ProviderRecord::new("p", 0, false, COOLDOWN);
        assert_eq!(record.health(), ProviderHealth::Healthy);
        assert_eq!(record.consecutive_failures(), 0);
        assert!(record.is_eligible(Instant::now()));
    }

    #[test]
    fn failure_starts_cooldown_and_counts() {
        let mut record = ProviderRecord::new("p", 0, false, COOLDOWN);
        let t0 = Instant::now();

        record.record_failure(t0);

        assert_eq!(record.health(), ProviderHealth::CoolingDown);
        assert_eq!(record.consecutive_failures(), 1);
        assert!(!record.is_eligible(t0));
    }

    #[test]
    fn cooldown_boundary_is_inclusive() {
        let mut record = ProviderRecord::new("p", 0, false, COOLDOWN);
        let t0 = Instant::now();
        record.record_failure(t0);

        // One tick before the boundary: still ineligible.
        assert!(!record.is_eligible(t0 + COOLDOWN - Duration::from_nanos(1)));
        // Exactly at the boundary: eligible again.
        assert!(record.is_eligible(t0 + COOLDOWN));
        assert!(record.is_eligible(t0 + COOLDOWN + Duration::from_secs(1)));
    }

    #[test]
    fn repeated_failures_restart_the_window() {
        let mut record = ProviderRecord::new("p", 0, false, COOLDOWN);
        let t0 = Instant::now();

        record.record_failure(t0);
        let t1 = t0 + Duration::from_secs(100);
        record.record_failure(t1);

        assert_eq!(record.consecutive_failures(), 2);
        // The window restarts at the second failure.
        assert!(!record.is_eligible(t0 + COOLDOWN));
        assert!(record.is_eligible(t1 + COOLDOWN));
    }

    #[test]
    fn success_clears_cooldown_and_failures() {
        let mut record = ProviderRecord::new("p", 0, false, COOLDOWN);
        record.record_failure(Instant::now());
        record.record_success();

        assert_eq!(record.health(), ProviderHealth::Healthy);
        assert_eq!(record.consecutive_failures(), 0);
        assert!(record.is_eligible(Instant::now()));
    }
}
