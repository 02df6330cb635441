use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("action kind {0:?} is already registered")]
    DuplicateActionType(String),
    #[error("no handler registered for action kind {0:?}")]
    UnknownActionType(String),
    #[error("handle points to missing action: {0}")]
    MissingAction(i64),
}
