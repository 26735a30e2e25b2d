//! Refill Task
//!
//! Background task that periodically tops the working set off from the
//! backing store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::scheduler::ReminderScheduler;

/// Spawns a background task that calls `fill(fetch_limit)` every `interval`.
///
/// The first refill happens one full interval after the task starts.
/// Refills are idempotent per reminder id, so overlapping with
/// trigger-driven backfills is harmless.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let refill_handle = spawn_refill_task(scheduler.clone(), Duration::from_secs(60), 25);
/// // Later, during shutdown:
/// refill_handle.abort();
/// ```
pub fn spawn_refill_task(
    scheduler: Arc<ReminderScheduler>,
    interval: Duration,
    fetch_limit: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting refill task with interval of {:?}, fetching up to {} reminders",
            interval, fetch_limit
        );

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            let admitted = scheduler.fill(fetch_limit).await;

            if admitted > 0 {
                info!("Refill: admitted {} reminders", admitted);
            } else {
                debug!("Refill: nothing to admit");
            }
        }
    })
}
