//! Shared health state for the /health endpoint.
//! Updated by ContinuousMonitor, read by the API.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// Shared health metrics. Updated by the monitor, read by API.
#[derive(Default)]
pub struct HealthState {
    /// True between `start()` and `stop()`.
    monitor_running: AtomicBool,
    /// Set for the duration of a scan cycle; a second cycle may not begin.
    cycle_in_progress: AtomicBool,
    /// Unix seconds of the last completed cycle (0 = none).
    last_cycle_at: AtomicI64,
    cycles_completed: AtomicU64,
    /// Collections skipped for upstream errors in the last cycle.
    last_cycle_failures: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_monitor_running(&self, v: bool) {
        self.monitor_running.store(v, Ordering::Relaxed);
    }

    pub fn monitor_running(&self) -> bool {
        self.monitor_running.load(Ordering::Relaxed)
    }

    /// Claim the cycle slot. False if another cycle holds it.
    pub fn try_begin_cycle(&self) -> bool {
        self.cycle_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end_cycle(&self, finished_at: i64, failures: u64) {
        self.last_cycle_at.store(finished_at, Ordering::Relaxed);
        self.last_cycle_failures.store(failures, Ordering::Relaxed);
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.cycle_in_progress.store(false, Ordering::Release);
    }

    pub fn cycle_in_progress(&self) -> bool {
        self.cycle_in_progress.load(Ordering::Acquire)
    }

    pub fn last_cycle_at(&self) -> i64 {
        self.last_cycle_at.load(Ordering::Relaxed)
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn last_cycle_failures(&self) -> u64 {
        self.last_cycle_failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_slot_is_exclusive() {
        let health = HealthState::new();
        assert!(health.try_begin_cycle());
        assert!(!health.try_begin_cycle());
        assert!(health.cycle_in_progress());
        health.end_cycle(1_714_557_600, 2);
        assert!(!health.cycle_in_progress());
        assert_eq!(health.cycles_completed(), 1);
        assert_eq!(health.last_cycle_failures(), 2);
        assert!(health.try_begin_cycle());
    }
}
