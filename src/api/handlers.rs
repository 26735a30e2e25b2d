//! API Handlers
//!
//! HTTP request handlers for each reminder endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use tracing::info;

use crate::config::Config;
use crate::error::{Result, SchedulerError};
use crate::models::{
    CreateReminderRequest, CreateReminderResponse, DeleteReminderResponse, HealthResponse,
    OwnerQuery, StatsResponse, WorkingSetResponse,
};
use crate::scheduler::ReminderScheduler;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<ReminderScheduler>,
    /// Maximum pending reminders per owner
    pub owner_reminder_limit: usize,
}

impl AppState {
    pub fn new(scheduler: Arc<ReminderScheduler>, owner_reminder_limit: usize) -> Self {
        Self {
            scheduler,
            owner_reminder_limit,
        }
    }

    /// Creates a new AppState using the limits from `config`.
    pub fn from_config(scheduler: Arc<ReminderScheduler>, config: &Config) -> Self {
        Self::new(scheduler, config.owner_reminder_limit)
    }
}

/// Handler for POST /reminders
///
/// Stores a new reminder and offers it to the scheduler. `scheduled` in the
/// response tells whether it entered the working set right away; if not, a
/// later refill picks it up.
pub async fn create_reminder(
    State(state): State<AppState>,
    Json(req): Json<CreateReminderRequest>,
) -> Result<Json<CreateReminderResponse>> {
    if let Some(error_msg) = req.validate(Utc::now()) {
        return Err(SchedulerError::InvalidRequest(error_msg));
    }

    let owner_id = req.owner_id.clone();
    let limit = state.owner_reminder_limit;
    let Some(reminder) = state
        .scheduler
        .store()
        .insert_if_under_limit(req.into_new_reminder(), limit)
        .await?
    else {
        return Err(SchedulerError::LimitReached(format!(
            "owner {} already has {} pending reminders",
            owner_id, limit
        )));
    };
    let scheduled = state.scheduler.add(reminder.clone());
    info!(
        "Reminder {} created for {} (scheduled: {})",
        reminder.id, reminder.owner_id, scheduled
    );

    Ok(Json(CreateReminderResponse::new(reminder, scheduled)))
}

/// Handler for DELETE /reminders/:id?owner_id=
///
/// Cancels a reminder owned by the caller, resident or not.
pub async fn delete_reminder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<DeleteReminderResponse>> {
    state.scheduler.cancel(&id, &query.owner_id).await?;
    Ok(Json(DeleteReminderResponse::new(id)))
}

/// Handler for GET /reminders
///
/// Lists the in-memory working set, soonest due first.
pub async fn list_reminders(State(state): State<AppState>) -> Json<WorkingSetResponse> {
    let reminders = state.scheduler.working_set();

    Json(WorkingSetResponse {
        total: reminders.len(),
        capacity: state.scheduler.capacity(),
        reminders,
    })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let scheduler = &state.scheduler;

    Json(StatsResponse::new(
        &scheduler.stats(),
        scheduler.len(),
        scheduler.capacity(),
        scheduler.firing_count(),
    ))
}

/// Handler for GET /health
///
/// Reports `degraded` while the working set is over capacity.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.scheduler.check_health();
    Json(HealthResponse::new(report.overflow() > 0))
}
