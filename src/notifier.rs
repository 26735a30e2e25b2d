//! Notifier Module
//!
//! Delivers fired reminders to their recipients and confirms delivery on
//! the message that originally acknowledged the reminder.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::models::Reminder;

// == Delivery Handle ==
/// Reference to a delivered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryHandle {
    pub message_id: String,
    pub url: String,
}

// == Notifier ==
/// Outbound side of the chat transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Posts the notification for `reminder`. `None` if nothing was posted.
    async fn deliver(&self, reminder: &Reminder) -> Result<Option<DeliveryHandle>>;

    /// Marks the reminder's confirmation message as delivered, linking `handle`.
    async fn apply_confirmation(&self, reminder: &Reminder, handle: &DeliveryHandle)
        -> Result<()>;
}

// == Log Notifier ==
/// Notifier that writes each notification to the tracing log.
#[derive(Debug)]
pub struct LogNotifier {
    base_url: String,
    next_message: AtomicU64,
}

impl LogNotifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            next_message: AtomicU64::new(1),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new("log://notifications")
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, reminder: &Reminder) -> Result<Option<DeliveryHandle>> {
        let message_id = self.next_message.fetch_add(1, Ordering::Relaxed).to_string();

        info!(
            reminder_id = %reminder.id,
            channel_id = %reminder.channel_id,
            owner_id = %reminder.owner_id,
            "Reminder for <@{}>: {}",
            reminder.owner_id,
            reminder.message
        );

        Ok(Some(DeliveryHandle {
            url: format!("{}/{}/{}", self.base_url, reminder.channel_id, message_id),
            message_id,
        }))
    }

    async fn apply_confirmation(
        &self,
        reminder: &Reminder,
        handle: &DeliveryHandle,
    ) -> Result<()> {
        match &reminder.confirmation_message_id {
            Some(confirmation) => info!(
                "Confirmation {} for reminder {} now links to {}",
                confirmation, reminder.id, handle.url
            ),
            None => info!("Reminder {} delivered at {}", reminder.id, handle.url),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reminder() -> Reminder {
        Reminder {
            id: "r1".to_string(),
            owner_id: "u1".to_string(),
            channel_id: "c1".to_string(),
            message: "drink water".to_string(),
            notify_on: Utc::now(),
            confirmation_message_id: Some("m0".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_log_notifier_handles_are_unique() {
        let notifier = LogNotifier::new("https://chat.example");
        let first = notifier.deliver(&reminder()).await.unwrap().unwrap();
        let second = notifier.deliver(&reminder()).await.unwrap().unwrap();

        assert_ne!(first, second);
        assert_eq!(first.url, "https://chat.example/c1/1");
    }

    #[tokio::test]
    async fn test_log_notifier_confirmation() {
        let notifier = LogNotifier::default();
        let handle = notifier.deliver(&reminder()).await.unwrap().unwrap();

        tokio_test::assert_ok!(notifier.apply_confirmation(&reminder(), &handle).await);
    }
}
