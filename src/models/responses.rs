//! Response DTOs for the reminder API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::models::Reminder;
use crate::scheduler::SchedulerStats;

/// Response body for POST /reminders
#[derive(Debug, Clone, Serialize)]
pub struct CreateReminderResponse {
    /// Success message
    pub message: String,
    pub reminder: Reminder,
    /// Whether the reminder entered the in-memory working set right away
    pub scheduled: bool,
}

impl CreateReminderResponse {
    pub fn new(reminder: Reminder, scheduled: bool) -> Self {
        Self {
            message: format!("Reminder '{}' created successfully", reminder.id),
            reminder,
            scheduled,
        }
    }
}

/// Response body for DELETE /reminders/:id
#[derive(Debug, Clone, Serialize)]
pub struct DeleteReminderResponse {
    /// Success message
    pub message: String,
    pub id: String,
}

impl DeleteReminderResponse {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            message: format!("Reminder '{}' deleted successfully", id),
            id,
        }
    }
}

/// Response body for GET /reminders
#[derive(Debug, Clone, Serialize)]
pub struct WorkingSetResponse {
    pub total: usize,
    pub capacity: usize,
    /// Cached reminders, soonest first
    pub reminders: Vec<Reminder>,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Reminders currently held in memory
    pub cached: usize,
    /// Working-set capacity
    pub capacity: usize,
    /// Reminders whose delivery is in progress or failed
    pub firing: usize,
    pub admitted: u64,
    pub evicted: u64,
    pub skipped_admissions: u64,
    pub delivered: u64,
    pub failed_deliveries: u64,
    pub stale_arms: u64,
    /// Share of fired reminders that were delivered
    pub delivery_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from scheduler statistics
    pub fn new(stats: &SchedulerStats, cached: usize, capacity: usize, firing: usize) -> Self {
        Self {
            cached,
            capacity,
            firing,
            admitted: stats.admitted,
            evicted: stats.evicted,
            skipped_admissions: stats.skipped_admissions,
            delivered: stats.delivered,
            failed_deliveries: stats.failed_deliveries,
            stale_arms: stats.stale_arms,
            delivery_rate: stats.delivery_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Whether the working set is over capacity
    pub over_capacity: bool,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn new(over_capacity: bool) -> Self {
        let status = if over_capacity { "degraded" } else { "healthy" };
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            over_capacity,
        }
    }
}
