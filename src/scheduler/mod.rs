//! Scheduler Module
//!
//! Bounded time-indexed scheduler for reminders. Holds at most
//! `cache_limit` reminders in memory, fires each at its due time and keeps
//! the working set topped off from the backing store.
//!
//! Eviction prefers the reminder due farthest in the future, but never
//! one whose timer is about to fire: a reminder with `eviction_min_ttl` or
//! less left stays resident.

mod reminders;
mod stats;


pub use reminders::{
    HealthReport, ReminderScheduler, ReminderState, ScheduledReminder, TriggerOutcome, NAMESPACE,
};
pub use stats::SchedulerStats;
