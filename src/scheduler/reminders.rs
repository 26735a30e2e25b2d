//! Reminder Scheduler
//!
//! Keeps a bounded working set of pending reminders in a cache namespace,
//! arms one delivery timer per reminder and tops the set off from the
//! backing store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::{ArmedTimer, CacheManager, Namespace};
use crate::config::SchedulerConfig;
use crate::error::{CacheError, Result, SchedulerError};
use crate::models::{Reminder, ReminderPatch};
use crate::notifier::Notifier;
use crate::scheduler::SchedulerStats;
use crate::store::ReminderStore;
use crate::tasks::{spawn_health_task, spawn_refill_task};

/// Cache namespace holding the working set
pub const NAMESPACE: &str = "reminders_scheduler";

// == Scheduled Reminder ==
/// Working-set entry: a reminder and its armed delivery timer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledReminder {
    pub reminder: Reminder,
    pub timer: ArmedTimer,
    /// Identifies the admission that armed `timer`
    token: u64,
}

// == Reminder State ==
/// Where a resident reminder is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderState {
    /// Timer armed, waiting for the due time
    Pending,
    /// Timer elapsed, delivery in progress
    Firing,
    /// Delivery produced no notification; left for an operator to reconcile
    Failed,
}

// == Trigger Outcome ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Delivered,
    DeliveryFailed,
    /// Not resident, or already firing
    Skipped,
}

// == Health Report ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub total: usize,
    pub capacity: usize,
    /// Resident reminders whose delivery failed; they hold their slot
    /// until removed
    pub failed: usize,
}

impl HealthReport {
    /// Entries above capacity.
    pub fn overflow(&self) -> usize {
        self.total.saturating_sub(self.capacity)
    }

    pub fn is_full(&self) -> bool {
        self.total >= self.capacity
    }

    /// Full, with failed deliveries taking up slots nothing can free.
    pub fn is_stalled(&self) -> bool {
        self.is_full() && self.failed > 0
    }
}

#[derive(Debug, Default)]
struct Bookkeeping {
    /// Reminders whose delivery is in progress
    firing: HashSet<String>,
    /// Reminders whose delivery failed, still resident
    failed: HashSet<String>,
    /// Reminders removed from the working set whose store deletion is pending
    retiring: HashSet<String>,
    /// Reminders delivered or canceled whose store record could not be
    /// deleted; kept out of the working set until the next process start
    orphaned: HashSet<String>,
    /// Reminders delivered or canceled since the oldest running fill took
    /// its snapshot. A fetch in flight may still return them.
    settled: HashSet<String>,
    /// Fills between their exclusion snapshot and their last admission
    active_fills: usize,
    next_token: u64,
    stats: SchedulerStats,
}

impl Bookkeeping {
    /// True while `id` must not be admitted.
    fn blocks(&self, id: &str) -> bool {
        self.firing.contains(id)
            || self.retiring.contains(id)
            || self.orphaned.contains(id)
            || self.settled.contains(id)
    }

    /// Records that `id` left the working set for good.
    fn settle(&mut self, id: &str) {
        self.settled.insert(id.to_string());
    }
}

/// Ends a fill's in-flight window, also when the fill future is dropped.
struct FillGuard<'a> {
    scheduler: &'a ReminderScheduler,
}

impl Drop for FillGuard<'_> {
    fn drop(&mut self) {
        let mut book = self.scheduler.lock_state();
        book.active_fills -= 1;
        if book.active_fills == 0 {
            book.settled.clear();
        }
    }
}

// == Reminder Scheduler ==
/// Bounded in-memory scheduler for reminders held in a [`ReminderStore`].
///
/// All bookkeeping changes happen under one lock that is never held across
/// an `.await`, so admission, eviction, cancellation and the start of a
/// delivery are atomic with respect to each other.
pub struct ReminderScheduler {
    cache: Namespace<ScheduledReminder>,
    store: Arc<dyn ReminderStore>,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    state: Mutex<Bookkeeping>,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    this: Weak<ReminderScheduler>,
}

impl ReminderScheduler {
    // == Constructor ==
    /// Creates a scheduler whose working set lives in the [`NAMESPACE`]
    /// namespace of `cache`.
    ///
    /// Fails if that namespace already exists.
    pub fn new(
        cache: &CacheManager,
        store: Arc<dyn ReminderStore>,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> std::result::Result<Arc<Self>, CacheError> {
        let namespace = cache.create::<ScheduledReminder>(NAMESPACE)?;

        Ok(Arc::new_cyclic(|this| Self {
            cache: namespace,
            store,
            notifier,
            config,
            state: Mutex::new(Bookkeeping::default()),
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            this: this.clone(),
        }))
    }

    fn lock_state(&self) -> MutexGuard<'_, Bookkeeping> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Add ==
    /// Admits `reminder` into the working set and arms its delivery timer.
    ///
    /// Returns false when the reminder is already resident or firing, or
    /// when the set is full and nothing could be evicted for it.
    pub fn add(&self, reminder: Reminder) -> bool {
        let mut book = self.lock_state();

        if self.cache.has(&reminder.id) || book.blocks(&reminder.id) {
            return false;
        }

        if self.cache.total() >= self.config.cache_limit
            && self.evict_locked(&mut book, &reminder).is_none()
        {
            book.stats.record_skipped_admission();
            debug!(
                "Working set full, reminder {} not admitted this cycle",
                reminder.id
            );
            return false;
        }

        let now = Utc::now();
        let delay = reminder.delay_from(now);
        let token = book.next_token;
        book.next_token += 1;

        let this = self.this.clone();
        let id = reminder.id.clone();
        let Some(timer) = ArmedTimer::try_spawn(delay, async move {
            if let Some(scheduler) = this.upgrade() {
                scheduler.on_timer(&id, token);
            }
        }) else {
            warn!("Cannot arm reminder {}: no tokio runtime", reminder.id);
            return false;
        };

        let id = reminder.id.clone();
        let stale = reminder.is_past_due(now);
        let entry = ScheduledReminder {
            reminder,
            timer: timer.clone(),
            token,
        };

        if !self.cache.set(id.clone(), entry, None) {
            timer.cancel();
            return false;
        }

        book.stats.record_admission();
        if stale {
            book.stats.record_stale_arm();
            warn!("Stale reminder triggered: {}", id);
        } else {
            debug!("Reminder {} armed, fires in {:?}", id, delay);
        }

        true
    }

    // == Remove ==
    /// Cancels a resident reminder: disarms it, drops it from the working
    /// set and deletes it from the store.
    ///
    /// No-op returning false when `id` is not resident or is already firing.
    pub async fn remove(&self, id: &str) -> bool {
        let entry = {
            let mut book = self.lock_state();

            if book.firing.contains(id) {
                debug!("Reminder {} is firing, cancellation ignored", id);
                return false;
            }

            let Some(entry) = self.cache.take(id) else {
                return false;
            };
            entry.timer.cancel();
            book.failed.remove(id);
            book.retiring.insert(id.to_string());
            book.settle(id);
            entry
        };

        let deleted = self.delete_from_store(&entry.reminder).await;
        {
            let mut book = self.lock_state();
            book.retiring.remove(id);
            if !deleted {
                book.orphaned.insert(id.to_string());
            }
        }
        info!("Reminder {} removed", id);
        true
    }

    // == Evict ==
    /// Frees one slot for `incoming` if the working set is full.
    ///
    /// Returns the id of the evicted reminder. Evicted reminders stay in
    /// the store and come back on a later refill.
    pub fn evict_one_if_needed(&self, incoming: &Reminder) -> Option<String> {
        let mut book = self.lock_state();

        if self.cache.total() < self.config.cache_limit {
            return None;
        }

        self.evict_locked(&mut book, incoming)
    }

    /// Evicts the latest-due pending reminder if its timer has more than
    /// `eviction_min_ttl` left.
    fn evict_locked(&self, book: &mut Bookkeeping, incoming: &Reminder) -> Option<String> {
        let now = Instant::now();

        let latest = self
            .cache
            .values()
            .into_iter()
            .filter(|entry| {
                let id = &entry.reminder.id;
                !book.firing.contains(id) && !book.failed.contains(id)
            })
            .max_by_key(|entry| entry.reminder.notify_on)?;

        let remaining = latest.timer.remaining_at(now);
        if remaining <= self.config.eviction_min_ttl {
            debug!(
                "Reminder {} fires in {:?}, too soon to evict",
                latest.reminder.id, remaining
            );
            return None;
        }

        latest.timer.cancel();
        self.cache.delete(&latest.reminder.id);
        book.stats.record_eviction();
        info!(
            "Evicted reminder {} (due {}) for reminder {} (due {})",
            latest.reminder.id, latest.reminder.notify_on, incoming.id, incoming.notify_on
        );

        Some(latest.reminder.id)
    }

    // == Fill ==
    /// Admits up to `amount` reminders from the store that are not already
    /// resident. Returns how many were admitted.
    pub async fn fill(&self, amount: usize) -> usize {
        if amount == 0 {
            return 0;
        }

        let excluded = {
            let mut book = self.lock_state();
            book.active_fills += 1;
            let mut ids = self.cache.keys();
            ids.extend(
                book.firing
                    .iter()
                    .chain(book.retiring.iter())
                    .chain(book.orphaned.iter())
                    .filter(|id| !self.cache.has(id))
                    .cloned(),
            );
            ids
        };
        let _guard = FillGuard { scheduler: self };

        let fetched = if excluded.is_empty() {
            self.store.fetch_most_recent(amount).await
        } else {
            self.store.fetch_oldest_excluding(&excluded, amount).await
        };

        let reminders = match fetched {
            Ok(reminders) => reminders,
            Err(e) => {
                warn!("Failed to fetch reminders for refill: {}", e);
                return 0;
            }
        };

        let admitted = reminders
            .into_iter()
            .filter(|reminder| self.add(reminder.clone()))
            .count();

        if admitted > 0 {
            debug!("Refill admitted {} reminders", admitted);
        }
        admitted
    }

    // == Trigger ==
    /// Delivers a resident reminder now, regardless of its timer.
    pub async fn trigger(&self, id: &str) -> TriggerOutcome {
        match self.begin_firing(id, None) {
            Some(reminder) => self.complete_firing(reminder).await,
            None => TriggerOutcome::Skipped,
        }
    }

    /// Timer callback. Marks the reminder as firing and hands delivery to
    /// its own task so cancelling the timer cannot interrupt it.
    fn on_timer(&self, id: &str, token: u64) {
        let Some(reminder) = self.begin_firing(id, Some(token)) else {
            return;
        };
        let Some(scheduler) = self.this.upgrade() else {
            return;
        };

        tokio::spawn(async move {
            scheduler.complete_firing(reminder).await;
        });
    }

    /// Moves a pending reminder to `Firing`. `token` pins the admission the
    /// caller belongs to.
    fn begin_firing(&self, id: &str, token: Option<u64>) -> Option<Reminder> {
        let mut book = self.lock_state();

        let entry = self.cache.get(id)?;
        if token.is_some_and(|token| token != entry.token)
            || book.firing.contains(id)
            || book.failed.contains(id)
        {
            return None;
        }

        book.firing.insert(id.to_string());
        Some(entry.reminder)
    }

    async fn complete_firing(&self, reminder: Reminder) -> TriggerOutcome {
        let id = reminder.id.clone();

        let handle = match self.notifier.deliver(&reminder).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                error!("Reminder {} was not delivered: no notification posted", id);
                self.mark_failed(&id);
                return TriggerOutcome::DeliveryFailed;
            }
            Err(e) => {
                error!("Reminder {} was not delivered: {}", id, e);
                self.mark_failed(&id);
                return TriggerOutcome::DeliveryFailed;
            }
        };

        if let Err(e) = self.notifier.apply_confirmation(&reminder, &handle).await {
            warn!("Failed to confirm delivery of reminder {}: {}", id, e);
        }

        let patch = ReminderPatch::delivered(Utc::now(), handle.url.clone());
        match self.store.update_by_id(&id, &reminder.owner_id, patch).await {
            Ok(true) => {}
            Ok(false) => warn!("Reminder {} missing from store on delivery", id),
            Err(e) => warn!("Failed to record delivery of reminder {}: {}", id, e),
        }

        {
            let mut book = self.lock_state();
            if let Some(entry) = self.cache.take(&id) {
                entry.timer.cancel();
            }
            book.settle(&id);
        }
        let deleted = self.delete_from_store(&reminder).await;

        {
            let mut book = self.lock_state();
            book.firing.remove(&id);
            if !deleted {
                book.orphaned.insert(id.clone());
            }
            book.stats.record_delivery();
        }
        info!("Reminder {} delivered at {}", id, handle.url);

        self.fill(1).await;
        TriggerOutcome::Delivered
    }

    fn mark_failed(&self, id: &str) {
        let mut book = self.lock_state();
        book.firing.remove(id);
        book.failed.insert(id.to_string());
        book.stats.record_failed_delivery();
    }

    /// Deletes the store record. False only if the store call failed.
    async fn delete_from_store(&self, reminder: &Reminder) -> bool {
        match self.store.delete_by_id(&reminder.id, &reminder.owner_id).await {
            Ok(true) => true,
            Ok(false) => {
                debug!("Reminder {} already gone from store", reminder.id);
                true
            }
            Err(e) => {
                warn!("Failed to delete reminder {} from store: {}", reminder.id, e);
                false
            }
        }
    }

    // == Cancel ==
    /// Cancels the reminder `id` on behalf of `owner_id`, whether or not it
    /// is resident.
    ///
    /// The id is blocked from admission before the store record is deleted,
    /// so a refill that fetched it earlier cannot bring it back.
    pub async fn cancel(&self, id: &str, owner_id: &str) -> Result<()> {
        let Some(reminder) = self.store.find(id).await? else {
            return Err(SchedulerError::NotFound(id.to_string()));
        };

        if reminder.owner_id != owner_id {
            return Err(SchedulerError::Forbidden(format!(
                "Reminder {} belongs to another user",
                id
            )));
        }

        let was_resident = {
            let mut book = self.lock_state();

            if book.firing.contains(id) {
                return Err(SchedulerError::InvalidRequest(format!(
                    "Reminder {} is already being delivered",
                    id
                )));
            }

            let entry = self.cache.take(id);
            if let Some(entry) = &entry {
                entry.timer.cancel();
                book.failed.remove(id);
            }
            book.retiring.insert(id.to_string());
            book.settle(id);
            entry.is_some()
        };

        let deleted = self.store.delete_by_id(id, owner_id).await;

        let mut book = self.lock_state();
        book.retiring.remove(id);
        match deleted {
            Ok(true) => {
                info!("Reminder {} canceled", id);
                Ok(())
            }
            Ok(false) if was_resident => {
                debug!("Reminder {} already gone from store", id);
                Ok(())
            }
            Ok(false) => Err(SchedulerError::NotFound(id.to_string())),
            Err(e) => {
                book.orphaned.insert(id.to_string());
                Err(e)
            }
        }
    }

    // == Health Check ==
    /// Compares the working-set size with its capacity. Never evicts.
    pub fn check_health(&self) -> HealthReport {
        let report = {
            let book = self.lock_state();
            HealthReport {
                total: self.cache.total(),
                capacity: self.config.cache_limit,
                failed: book.failed.len(),
            }
        };

        if report.overflow() > 0 {
            warn!(
                "Reminders scheduler has exceeded cache limit by {} entries",
                report.overflow()
            );
        } else if report.is_stalled() {
            warn!(
                "Reminders scheduler is at its cache limit of {} with {} failed reminders holding slots; remove them to resume admissions",
                report.capacity, report.failed
            );
        } else if report.is_full() {
            info!("Reminders scheduler is at its cache limit of {}", report.capacity);
        } else {
            debug!(
                "Reminders scheduler holds {}/{} entries",
                report.total, report.capacity
            );
        }

        report
    }

    // == Run ==
    /// Fills the working set and starts the periodic refill and health
    /// check. Only the first call does anything.
    pub async fn run(&self) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let Some(this) = self.this.upgrade() else {
            return false;
        };

        info!("Reminders scheduler initiated");
        let admitted = self.fill(self.config.fetch_limit).await;
        info!("Initial fill admitted {} reminders", admitted);

        let refill = spawn_refill_task(
            this.clone(),
            self.config.fetch_interval,
            self.config.fetch_limit,
        );
        let health = spawn_health_task(this, self.config.health_check_interval);

        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend([refill, health]);

        true
    }

    // == Shutdown ==
    /// Stops the periodic tasks and disarms every pending timer. Deliveries
    /// already in progress run to completion.
    pub fn shutdown(&self) {
        for task in self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }

        for entry in self.cache.values() {
            entry.timer.cancel();
        }

        info!("Reminders scheduler stopped");
    }

    // == Accessors ==
    pub fn len(&self) -> usize {
        self.cache.total()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.config.cache_limit
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cache.has(id)
    }

    /// Resident entry for `id`, with its timer.
    pub fn get(&self, id: &str) -> Option<ScheduledReminder> {
        self.cache.get(id)
    }

    /// Ids of resident reminders in admission order.
    pub fn ids(&self) -> Vec<String> {
        self.cache.keys()
    }

    /// Resident reminders, soonest due first.
    pub fn working_set(&self) -> Vec<Reminder> {
        let mut reminders: Vec<Reminder> = self
            .cache
            .values()
            .into_iter()
            .map(|entry| entry.reminder)
            .collect();
        reminders.sort_by(|a, b| a.notify_on.cmp(&b.notify_on).then(a.id.cmp(&b.id)));
        reminders
    }

    pub fn state(&self, id: &str) -> Option<ReminderState> {
        let book = self.lock_state();

        if book.firing.contains(id) {
            Some(ReminderState::Firing)
        } else if book.failed.contains(id) {
            Some(ReminderState::Failed)
        } else if self.cache.has(id) {
            Some(ReminderState::Pending)
        } else {
            None
        }
    }

    /// Reminders firing or failed.
    pub fn firing_count(&self) -> usize {
        let book = self.lock_state();
        book.firing.len() + book.failed.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.lock_state().stats.clone()
    }

    pub fn store(&self) -> &Arc<dyn ReminderStore> {
        &self.store
    }
}

impl std::fmt::Debug for ReminderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderScheduler")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .field("started", &self.is_running())
            .finish()
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        for entry in self.cache.values() {
            entry.timer.cancel();
        }
        self.cache.free();
    }
}
