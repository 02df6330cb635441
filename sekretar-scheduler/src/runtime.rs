use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use sekretar_database::interfaces::ActionStoreImpl;
use sekretar_models::{core::ActionFilter, errors::SendableError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::action::Action;
use crate::config::SchedulerConfig;
use crate::handle::ActionHandle;
use crate::registry::ActionRegistry;

struct SchedulerInner<S: ActionStoreImpl> {
    store: Arc<S>,
    registry: ActionRegistry<S>,
    timers: Mutex<HashMap<i64, JoinHandle<()>>>,
    config: SchedulerConfig,
}

/// Durable action scheduler runtime.
///
/// Owns the in-memory index of armed timers; the persisted store remains the
/// source of truth. Cheap to clone (shared inner), so handlers receive their
/// own copy for re-scheduling and cancellation sweeps.
pub struct Scheduler<S: ActionStoreImpl> {
    inner: Arc<SchedulerInner<S>>,
}

impl<S: ActionStoreImpl> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ActionStoreImpl> Scheduler<S> {
    pub fn new(store: Arc<S>, registry: ActionRegistry<S>, config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                registry,
                timers: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    /// Loads every `done = false` row and arms a timer for each. Overdue
    /// actions fire immediately rather than being skipped.
    pub async fn start(&self) -> Result<(), SendableError> {
        let pending = self
            .inner
            .store
            .find_pending(&ActionFilter::default())
            .await?;
        let count = pending.len();
        for action in pending {
            self.arm(action.id, action.time).await;
        }
        info!("Action scheduler initialized with {} pending action(s)", count);
        Ok(())
    }

    /// Persists a new action row, then arms a timer for it. The two steps are
    /// deliberately not atomic: the insert alone is durable, and a crash in
    /// between is healed by the next `start()` scan. Arming is only a
    /// responsiveness optimization.
    pub async fn schedule_raw(
        &self,
        kind: &str,
        user_id: Option<i64>,
        time: DateTime<Utc>,
        args: serde_json::Value,
    ) -> Result<i64, SendableError> {
        let action_id = self
            .inner
            .store
            .insert_action(user_id, time, kind, &args)
            .await?;
        self.arm(action_id, time).await;
        Ok(action_id)
    }

    /// Serializes a typed action and schedules it for `time`.
    pub async fn schedule<A>(
        &self,
        action: &A,
        time: DateTime<Utc>,
    ) -> Result<ActionHandle<S>, SendableError>
    where
        A: Action<S>,
    {
        let args = serde_json::to_value(action)?;
        let action_id = self
            .schedule_raw(A::NAME, action.user_id(), time, args)
            .await?;
        Ok(ActionHandle::new(action_id, self.clone()))
    }

    /// Cancels a pending action: marks the row done and disarms its timer.
    ///
    /// Not an error to cancel an unknown or already-done action; a handler may
    /// complete concurrently with a cancellation request. An in-flight handler
    /// is not interrupted, cancellation only prevents future firing.
    pub async fn cancel(&self, action_id: i64) -> Result<(), SendableError> {
        let action = self.inner.store.get_action(action_id).await?;
        let Some(action) = action else {
            warn!("Tried to cancel action {} which does not exist", action_id);
            return Ok(());
        };
        if action.done {
            warn!("Tried to cancel action {} which is already done", action_id);
            return Ok(());
        }

        self.inner.store.mark_done(action_id).await?;

        let mut timers = self.inner.timers.lock().await;
        match timers.remove(&action_id) {
            Some(timer) => timer.abort(),
            None => error!("Action {} is not armed by this scheduler", action_id),
        }
        Ok(())
    }

    /// Cancels every pending action for `user_id` restricted to `kinds`.
    /// Used for bulk sweeps when business state invalidates pending work.
    pub async fn cancel_pending(
        &self,
        user_id: Option<i64>,
        kinds: &[&str],
    ) -> Result<usize, SendableError> {
        let mut filter = ActionFilter {
            user_id,
            kinds: None,
        };
        filter = filter.with_kinds(kinds);

        let actions = self.inner.store.find_pending(&filter).await?;
        let count = actions.len();
        for action in &actions {
            self.cancel(action.id).await?;
        }
        Ok(count)
    }

    /// Aborts all live timers. Rows are *not* marked done; they stay pending
    /// and are re-armed by the next `start()`. Process shutdown is not the
    /// same as action cancellation.
    pub async fn shutdown(&self) {
        let mut timers = self.inner.timers.lock().await;
        let count = timers.len();
        for (_, timer) in timers.drain() {
            timer.abort();
        }
        info!("Action scheduler shut down, {} timer(s) disarmed", count);
    }

    /// Number of timers currently held in the in-memory index.
    pub async fn armed_timer_count(&self) -> usize {
        self.inner.timers.lock().await.len()
    }

    async fn arm(&self, action_id: i64, time: DateTime<Utc>) {
        // The lock must be held across the spawn: an overdue task can finish
        // and reach its self-removal before the handle lands in the index,
        // which would leave a finished handle behind forever
        let mut timers = self.inner.timers.lock().await;
        let scheduler = self.clone();
        let timer = tokio::spawn(async move {
            scheduler.action_timer_task(action_id, time).await;
        });
        if let Some(previous) = timers.insert(action_id, timer) {
            warn!("Action {} was already armed; replacing its timer", action_id);
            previous.abort();
        }
    }

    async fn action_timer_task(self, action_id: i64, time: DateTime<Utc>) {
        wait_until(time).await;

        if let Err(err) = self.perform_action(action_id, time).await {
            error!("Failed to execute scheduled action {}: {}", action_id, err);
        }

        self.inner.timers.lock().await.remove(&action_id);
    }

    /// Execution wrapper: resolves and runs the handler for a fired action.
    /// Only a clean handler return marks the row done; an unknown kind leaves
    /// the row pending forever as a queryable signal of a registration bug,
    /// and a failing handler is retried across restarts until the crash
    /// budget is spent, then dead-lettered.
    async fn perform_action(&self, action_id: i64, due: DateTime<Utc>) -> Result<(), SendableError> {
        let Some(action) = self.inner.store.get_action(action_id).await? else {
            warn!("Fired action {} no longer exists in the store", action_id);
            return Ok(());
        };
        if action.done {
            return Ok(());
        }

        let Some(handler) = self.inner.registry.resolve(&action.kind) else {
            error!(
                "Handler is not set for scheduled actions of kind {:?} (action {})",
                action.kind, action_id
            );
            return Ok(());
        };

        let attempts = self.inner.store.record_attempt(action_id).await?;
        match handler(self.clone(), due, action.args).await {
            Ok(()) => {
                self.inner.store.mark_done(action_id).await?;
            }
            Err(err) => {
                error!(
                    "Exception occurred during execution of scheduled action {} ({}): {}",
                    action_id, action.kind, err
                );
                if attempts >= self.inner.config.max_crash_attempts {
                    error!(
                        "Dead-lettering action {} ({}) after {} failed attempt(s)",
                        action_id, action.kind, attempts
                    );
                    self.inner.store.mark_done(action_id).await?;
                }
            }
        }
        Ok(())
    }
}

async fn wait_until(time: DateTime<Utc>) {
    // A time already in the past yields a negative delta and fires at once
    if let Ok(delay) = (time - Utc::now()).to_std() {
        tokio::time::sleep(delay).await;
    }
}
