use std::future::Future;

use chrono::{DateTime, Utc};
use sekretar_models::{
    core::{ActionFilter, ScheduledAction},
    errors::SendableError,
};

// NOTE: Ensure anything that implements this trait cannot contain a reference
// otherwise, this is breaking major rules
pub trait ActionStoreImpl: Send + Sync + 'static {
    fn init_schema(&self) -> impl Future<Output = Result<(), SendableError>> + Send;

    /// Inserts a new pending action and returns the store-assigned id.
    fn insert_action(
        &self,
        user_id: Option<i64>,
        time: DateTime<Utc>,
        kind: &str,
        args: &serde_json::Value,
    ) -> impl Future<Output = Result<i64, SendableError>> + Send;

    fn get_action(
        &self,
        action_id: i64,
    ) -> impl Future<Output = Result<Option<ScheduledAction>, SendableError>> + Send;

    /// Sets `done = true`. Safe to call on an already-done or unknown row;
    /// `done` never transitions back to `false`.
    fn mark_done(&self, action_id: i64) -> impl Future<Output = Result<(), SendableError>> + Send;

    /// Increments the row's attempt counter and returns the new value.
    fn record_attempt(
        &self,
        action_id: i64,
    ) -> impl Future<Output = Result<i64, SendableError>> + Send;

    /// All rows with `done = false` matching the filter.
    fn find_pending(
        &self,
        filter: &ActionFilter,
    ) -> impl Future<Output = Result<Vec<ScheduledAction>, SendableError>> + Send;
}
