//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the scheduler is running.
//!
//! # Tasks
//! - Refill: tops the working set off from the backing store
//! - Health check: reports when the working set is over capacity

mod health;
mod refill;

pub use health::spawn_health_task;
pub use refill::spawn_refill_task;
