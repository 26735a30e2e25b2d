//! Backing Store Module
//!
//! The durable list of every pending reminder. The scheduler only ever
//! holds a bounded subset of it in memory; the store stays authoritative.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewReminder, Reminder, ReminderPatch};

// == Reminder Store ==
/// Backing store for reminders.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Up to `limit` reminders whose id is not in `excluded`, soonest due first.
    async fn fetch_oldest_excluding(&self, excluded: &[String], limit: usize)
        -> Result<Vec<Reminder>>;

    /// Up to `limit` reminders, soonest due first.
    async fn fetch_most_recent(&self, limit: usize) -> Result<Vec<Reminder>>;

    /// Deletes the reminder `id` belonging to `owner_id`. False if no such record.
    async fn delete_by_id(&self, id: &str, owner_id: &str) -> Result<bool>;

    /// Applies `patch` to the reminder `id` belonging to `owner_id`. False if no such record.
    async fn update_by_id(&self, id: &str, owner_id: &str, patch: ReminderPatch) -> Result<bool>;

    /// Persists a new reminder and returns it with its assigned id.
    async fn insert(&self, reminder: NewReminder) -> Result<Reminder>;

    /// Persists `reminder` only if its owner has fewer than `limit` pending
    /// reminders. The count and the insert are one atomic step. `None` if
    /// the owner is at the limit.
    async fn insert_if_under_limit(
        &self,
        reminder: NewReminder,
        limit: usize,
    ) -> Result<Option<Reminder>>;

    async fn find(&self, id: &str) -> Result<Option<Reminder>>;

    /// Number of pending reminders owned by `owner_id`.
    async fn count_for_owner(&self, owner_id: &str) -> Result<usize>;
}
