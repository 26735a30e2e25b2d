//! Request DTOs for the reminder API
//!
//! Defines the structure of incoming HTTP request bodies and queries.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::NewReminder;

/// Maximum reminder message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Request body for POST /reminders
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderRequest {
    pub owner_id: String,
    pub channel_id: String,
    pub message: String,
    /// When to remind, RFC 3339
    pub notify_on: DateTime<Utc>,
}

impl CreateReminderRequest {
    /// Validates the request against `now`.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self, now: DateTime<Utc>) -> Option<String> {
        if self.owner_id.is_empty() {
            return Some("Owner cannot be empty".to_string());
        }
        if self.channel_id.is_empty() {
            return Some("Channel cannot be empty".to_string());
        }
        if self.message.trim().is_empty() {
            return Some("Message cannot be empty".to_string());
        }
        if self.message.chars().count() > MAX_MESSAGE_LENGTH {
            return Some(format!(
                "Message exceeds maximum length of {} characters",
                MAX_MESSAGE_LENGTH
            ));
        }
        if self.notify_on < now {
            return Some("Reminder time is in the past".to_string());
        }
        None
    }

    pub fn into_new_reminder(self) -> NewReminder {
        NewReminder {
            owner_id: self.owner_id,
            channel_id: self.channel_id,
            message: self.message,
            notify_on: self.notify_on,
            confirmation_message_id: None,
        }
    }
}

/// Query string for DELETE /reminders/:id
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: String,
}
