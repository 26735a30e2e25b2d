//! In-memory reminder store
//!
//! A [`ReminderStore`] kept in process memory. Backs the server binary and
//! the tests; a relational store implements the same trait in production.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SchedulerError};
use crate::models::{NewReminder, Reminder, ReminderPatch};
use crate::store::ReminderStore;

#[derive(Debug, Default)]
struct Records {
    reminders: HashMap<String, Reminder>,
    /// Patches applied so far, in order
    patches: Vec<(String, ReminderPatch)>,
}

// == Memory Store ==
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
    /// When set, delete and update calls fail
    fail_mutations: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `reminders` as-is, keeping their ids.
    pub fn with_reminders(reminders: impl IntoIterator<Item = Reminder>) -> Self {
        let reminders = reminders
            .into_iter()
            .map(|reminder| (reminder.id.clone(), reminder))
            .collect();

        Self {
            records: RwLock::new(Records {
                reminders,
                patches: Vec::new(),
            }),
            fail_mutations: AtomicBool::new(false),
        }
    }

    /// Makes every later delete/update call fail until reset.
    pub fn set_fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.reminders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Ids of every stored reminder, soonest due first.
    pub async fn ids(&self) -> Vec<String> {
        let records = self.records.read().await;
        sorted(records.reminders.values())
            .into_iter()
            .map(|reminder| reminder.id)
            .collect()
    }

    /// Patches applied through `update_by_id`, in order.
    pub async fn patches(&self) -> Vec<(String, ReminderPatch)> {
        self.records.read().await.patches.clone()
    }

    fn check_mutations(&self, op: &str, id: &str) -> Result<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(SchedulerError::Store(format!("{} of {} rejected", op, id)));
        }
        Ok(())
    }
}

/// Assigns an id and creation time.
fn materialize(reminder: NewReminder) -> Reminder {
    Reminder {
        id: Uuid::new_v4().to_string(),
        owner_id: reminder.owner_id,
        channel_id: reminder.channel_id,
        message: reminder.message,
        notify_on: reminder.notify_on,
        confirmation_message_id: reminder.confirmation_message_id,
        created_at: Utc::now(),
    }
}

fn owned_by(records: &Records, owner_id: &str) -> usize {
    records
        .reminders
        .values()
        .filter(|reminder| reminder.owner_id == owner_id)
        .count()
}

/// Soonest due first; ties broken by creation time, then id.
fn sorted<'a>(reminders: impl Iterator<Item = &'a Reminder>) -> Vec<Reminder> {
    let mut reminders: Vec<Reminder> = reminders.cloned().collect();
    reminders.sort_by(|a, b| {
        a.notify_on
            .cmp(&b.notify_on)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
    reminders
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn fetch_oldest_excluding(
        &self,
        excluded: &[String],
        limit: usize,
    ) -> Result<Vec<Reminder>> {
        let records = self.records.read().await;
        let candidates = records
            .reminders
            .values()
            .filter(|reminder| !excluded.contains(&reminder.id));

        let mut reminders = sorted(candidates);
        reminders.truncate(limit);
        Ok(reminders)
    }

    async fn fetch_most_recent(&self, limit: usize) -> Result<Vec<Reminder>> {
        let records = self.records.read().await;
        let mut reminders = sorted(records.reminders.values());
        reminders.truncate(limit);
        Ok(reminders)
    }

    async fn delete_by_id(&self, id: &str, owner_id: &str) -> Result<bool> {
        self.check_mutations("delete", id)?;

        let mut records = self.records.write().await;
        let owned = records
            .reminders
            .get(id)
            .is_some_and(|reminder| reminder.owner_id == owner_id);

        if owned {
            records.reminders.remove(id);
            debug!("Reminder {} deleted from store", id);
        }

        Ok(owned)
    }

    async fn update_by_id(&self, id: &str, owner_id: &str, patch: ReminderPatch) -> Result<bool> {
        self.check_mutations("update", id)?;

        let mut records = self.records.write().await;
        let Some(reminder) = records
            .reminders
            .get_mut(id)
            .filter(|reminder| reminder.owner_id == owner_id)
        else {
            return Ok(false);
        };

        if let Some(confirmation) = &patch.confirmation_message_id {
            reminder.confirmation_message_id = Some(confirmation.clone());
        }

        records.patches.push((id.to_string(), patch));
        Ok(true)
    }

    async fn insert(&self, reminder: NewReminder) -> Result<Reminder> {
        let reminder = materialize(reminder);

        self.records
            .write()
            .await
            .reminders
            .insert(reminder.id.clone(), reminder.clone());

        Ok(reminder)
    }

    async fn insert_if_under_limit(
        &self,
        reminder: NewReminder,
        limit: usize,
    ) -> Result<Option<Reminder>> {
        let mut records = self.records.write().await;

        if owned_by(&records, &reminder.owner_id) >= limit {
            return Ok(None);
        }

        let reminder = materialize(reminder);
        records
            .reminders
            .insert(reminder.id.clone(), reminder.clone());

        Ok(Some(reminder))
    }

    async fn find(&self, id: &str) -> Result<Option<Reminder>> {
        Ok(self.records.read().await.reminders.get(id).cloned())
    }

    async fn count_for_owner(&self, owner_id: &str) -> Result<usize> {
        Ok(owned_by(&*self.records.read().await, owner_id))
    }
}
