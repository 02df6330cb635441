use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted scheduled action row. The store is the source of truth for
/// durability; in-memory timers are rebuilt from rows with `done = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub id: i64,
    pub user_id: Option<i64>,
    pub time: DateTime<Utc>,
    pub done: bool,
    pub kind: String,
    pub args: serde_json::Value,
    pub attempts: i64,
}

/// Filter for pending-action queries. `done = false` is implied.
#[derive(Debug, Clone, Default)]
pub struct ActionFilter {
    pub user_id: Option<i64>,
    pub kinds: Option<Vec<String>>,
}

impl ActionFilter {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            kinds: None,
        }
    }

    pub fn with_kinds(mut self, kinds: &[&str]) -> Self {
        self.kinds = Some(kinds.iter().map(|kind| kind.to_string()).collect());
        self
    }

    pub fn matches(&self, action: &ScheduledAction) -> bool {
        if action.done {
            return false;
        }
        if let Some(user_id) = self.user_id {
            if action.user_id != Some(user_id) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.iter().any(|kind| *kind == action.kind) {
                return false;
            }
        }
        true
    }
}
