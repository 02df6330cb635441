use std::future::Future;

use chrono::{DateTime, Utc};
use sekretar_database::interfaces::ActionStoreImpl;
use sekretar_models::errors::SendableError;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::runtime::Scheduler;

/// A typed, serializable unit of deferred work.
///
/// Implementors declare their payload as ordinary serde fields; the registry
/// wires a decode-and-run adapter under `NAME` via
/// [`ActionRegistry::register_action`](crate::ActionRegistry::register_action).
/// `run` receives the scheduler so an action can re-schedule itself or
/// escalate to a sibling action, and its registered context for everything
/// else it needs (collaborator handles, shared state).
///
/// Returning `Err` from `run` does **not** mark the backing row done; retry
/// logic belongs inside the action itself, since the runtime cannot know
/// whether retrying is appropriate.
pub trait Action<S: ActionStoreImpl>: Serialize + DeserializeOwned + Send + Sized + 'static {
    const NAME: &'static str;

    type Ctx: Send + Sync + 'static;

    /// Subject user recorded on the persisted row, for bulk cancellation
    /// queries. `None` for system-wide actions.
    fn user_id(&self) -> Option<i64> {
        None
    }

    fn run(
        self,
        scheduler: &Scheduler<S>,
        ctx: &Self::Ctx,
        due: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), SendableError>> + Send;
}
