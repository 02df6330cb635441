use sekretar_database::interfaces::ActionStoreImpl;
use sekretar_models::errors::SendableError;

use crate::errors::SchedulerError;
use crate::runtime::Scheduler;

/// Lightweight reference to a scheduled action, returned by
/// [`Scheduler::schedule`]. Enough to cancel or query completion without the
/// typed payload.
pub struct ActionHandle<S: ActionStoreImpl> {
    action_id: i64,
    scheduler: Scheduler<S>,
}

impl<S: ActionStoreImpl> ActionHandle<S> {
    pub(crate) fn new(action_id: i64, scheduler: Scheduler<S>) -> Self {
        Self {
            action_id,
            scheduler,
        }
    }

    pub fn action_id(&self) -> i64 {
        self.action_id
    }

    pub async fn cancel(&self) -> Result<(), SendableError> {
        self.scheduler.cancel(self.action_id).await
    }

    pub async fn is_done(&self) -> Result<bool, SendableError> {
        match self.scheduler.store().get_action(self.action_id).await? {
            Some(action) => Ok(action.done),
            None => Err(Box::new(SchedulerError::MissingAction(self.action_id))),
        }
    }
}
