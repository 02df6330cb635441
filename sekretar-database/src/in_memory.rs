use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sekretar_models::{
    core::{ActionFilter, ScheduledAction},
    errors::SendableError,
};

use crate::interfaces::ActionStoreImpl;

#[derive(Default)]
struct StoreState {
    next_id: i64,
    rows: BTreeMap<i64, ScheduledAction>,
}

/// Ephemeral store backend, used by tests and throwaway runs. Shares state
/// across clones so a "restarted" runtime can be pointed at the same rows.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionStoreImpl for InMemoryStore {
    async fn init_schema(&self) -> Result<(), SendableError> {
        Ok(())
    }

    async fn insert_action(
        &self,
        user_id: Option<i64>,
        time: DateTime<Utc>,
        kind: &str,
        args: &serde_json::Value,
    ) -> Result<i64, SendableError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.rows.insert(
            id,
            ScheduledAction {
                id,
                user_id,
                time,
                done: false,
                kind: kind.to_string(),
                args: args.clone(),
                attempts: 0,
            },
        );
        Ok(id)
    }

    async fn get_action(&self, action_id: i64) -> Result<Option<ScheduledAction>, SendableError> {
        Ok(self.state.lock().rows.get(&action_id).cloned())
    }

    async fn mark_done(&self, action_id: i64) -> Result<(), SendableError> {
        if let Some(row) = self.state.lock().rows.get_mut(&action_id) {
            row.done = true;
        }
        Ok(())
    }

    async fn record_attempt(&self, action_id: i64) -> Result<i64, SendableError> {
        let mut state = self.state.lock();
        match state.rows.get_mut(&action_id) {
            Some(row) => {
                row.attempts += 1;
                Ok(row.attempts)
            }
            None => Ok(0),
        }
    }

    async fn find_pending(
        &self,
        filter: &ActionFilter,
    ) -> Result<Vec<ScheduledAction>, SendableError> {
        let state = self.state.lock();
        Ok(state
            .rows
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect())
    }
}
