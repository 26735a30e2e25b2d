//! Reminder Scheduler - bounded in-memory scheduling of stored reminders
//!
//! Keeps the soonest-due reminders of a backing store in a namespaced TTL
//! cache, arms one timer per reminder and delivers each when it comes due.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod notifier;
pub mod scheduler;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheManager;
pub use config::{Config, SchedulerConfig};
pub use scheduler::ReminderScheduler;
