mod action;
mod config;
mod errors;
mod handle;
mod registry;
mod runtime;

pub use action::Action;
pub use config::SchedulerConfig;
pub use errors::SchedulerError;
pub use handle::ActionHandle;
pub use registry::{ActionRegistry, HandlerFn, HandlerFuture};
pub use runtime::Scheduler;
