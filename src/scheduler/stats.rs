//! Scheduler Statistics Module
//!
//! Counts admissions, evictions and delivery outcomes of the scheduler.

use serde::Serialize;

// == Scheduler Stats ==
/// Running counters for the reminder scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Reminders admitted into the working set
    pub admitted: u64,
    /// Reminders evicted to make room for more urgent ones
    pub evicted: u64,
    /// Admissions skipped because no resident reminder could be evicted
    pub skipped_admissions: u64,
    /// Reminders delivered and cleaned up
    pub delivered: u64,
    /// Deliveries that produced no notification
    pub failed_deliveries: u64,
    /// Reminders armed after their due time had already passed
    pub stale_arms: u64,
}

impl SchedulerStats {
    // == Constructor ==
    /// Creates a new SchedulerStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Delivery Rate ==
    /// Calculates the share of fired reminders that were delivered.
    ///
    /// Returns delivered / (delivered + failed), or 0.0 if nothing fired yet.
    pub fn delivery_rate(&self) -> f64 {
        let total = self.delivered + self.failed_deliveries;
        if total == 0 {
            0.0
        } else {
            self.delivered as f64 / total as f64
        }
    }

    pub fn record_admission(&mut self) {
        self.admitted += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evicted += 1;
    }

    pub fn record_skipped_admission(&mut self) {
        self.skipped_admissions += 1;
    }

    pub fn record_delivery(&mut self) {
        self.delivered += 1;
    }

    pub fn record_failed_delivery(&mut self) {
        self.failed_deliveries += 1;
    }

    pub fn record_stale_arm(&mut self) {
        self.stale_arms += 1;
    }
}
