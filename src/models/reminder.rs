//! Reminder records
//!
//! The reminder as stored by the backing store and held in the scheduler's
//! working set, plus the insert and update shapes used against the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Reminder ==
/// A pending reminder. The `id` is shared with the backing store record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    /// User who set the reminder and receives the notification
    pub owner_id: String,
    /// Channel the notification is posted to
    pub channel_id: String,
    pub message: String,
    /// Wall-clock instant the reminder is due
    pub notify_on: DateTime<Utc>,
    /// Message that acknowledged the reminder; edited once it is delivered
    pub confirmation_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// Time left until the reminder is due, zero if already past.
    pub fn delay_from(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.notify_on - now).to_std().unwrap_or_default()
    }

    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.notify_on < now
    }
}

// == New Reminder ==
/// Fields supplied when creating a reminder; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReminder {
    pub owner_id: String,
    pub channel_id: String,
    pub message: String,
    pub notify_on: DateTime<Utc>,
    #[serde(default)]
    pub confirmation_message_id: Option<String>,
}

// == Reminder Patch ==
/// Partial update applied to a stored reminder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPatch {
    pub confirmation_message_id: Option<String>,
    /// Set once the notification has gone out
    pub delivered_at: Option<DateTime<Utc>>,
    /// Link to the delivered notification
    pub notification_url: Option<String>,
}

impl ReminderPatch {
    /// Patch recording a successful delivery.
    pub fn delivered(at: DateTime<Utc>, notification_url: impl Into<String>) -> Self {
        Self {
            delivered_at: Some(at),
            notification_url: Some(notification_url.into()),
            ..Self::default()
        }
    }
}
