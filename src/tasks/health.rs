//! Health Check Task
//!
//! Background task that periodically compares the working-set size with
//! its capacity. It only reports; it never evicts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::scheduler::ReminderScheduler;

/// Spawns a background task that runs the scheduler health check every `interval`.
pub fn spawn_health_task(scheduler: Arc<ReminderScheduler>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting health check task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;
            scheduler.check_health();
        }
    })
}
