//! Reminder records and the request/response models of the HTTP API
//!
//! This module defines the reminder shapes shared with the backing store
//! and the DTOs used for serializing/deserializing HTTP bodies.

pub mod reminder;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use reminder::{NewReminder, Reminder, ReminderPatch};
pub use requests::{CreateReminderRequest, OwnerQuery};
pub use responses::{
    CreateReminderResponse, DeleteReminderResponse, HealthResponse, StatsResponse,
    WorkingSetResponse,
};
