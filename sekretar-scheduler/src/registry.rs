use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use sekretar_database::interfaces::ActionStoreImpl;
use sekretar_models::errors::SendableError;

use crate::action::Action;
use crate::errors::SchedulerError;
use crate::runtime::Scheduler;

pub type HandlerFuture = BoxFuture<'static, Result<(), SendableError>>;

/// Decode-and-run adapter stored per action kind. Receives the scheduler (for
/// re-scheduling from inside handlers), the due time, and the raw args row.
pub type HandlerFn<S> =
    Arc<dyn Fn(Scheduler<S>, DateTime<Utc>, serde_json::Value) -> HandlerFuture + Send + Sync>;

/// Maps action kinds to handlers. Built once at startup, then frozen inside
/// the scheduler; registration order is explicit and deterministic.
pub struct ActionRegistry<S: ActionStoreImpl> {
    handlers: HashMap<String, HandlerFn<S>>,
}

impl<S: ActionStoreImpl> ActionRegistry<S> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: &str, handler: HandlerFn<S>) -> Result<(), SchedulerError> {
        if self.handlers.contains_key(kind) {
            return Err(SchedulerError::DuplicateActionType(kind.to_string()));
        }
        self.handlers.insert(kind.to_string(), handler);
        Ok(())
    }

    /// Registers a typed action under `A::NAME`. The adapter deserializes the
    /// persisted args back into `A` and hands it the given context.
    pub fn register_action<A>(&mut self, ctx: Arc<A::Ctx>) -> Result<(), SchedulerError>
    where
        A: Action<S>,
    {
        let handler: HandlerFn<S> = Arc::new(move |scheduler, due, args| {
            let ctx = Arc::clone(&ctx);
            Box::pin(async move {
                let action: A = serde_json::from_value(args)?;
                action.run(&scheduler, &ctx, due).await
            })
        });
        self.register(A::NAME, handler)
    }

    pub fn resolve(&self, kind: &str) -> Option<HandlerFn<S>> {
        self.handlers.get(kind).cloned()
    }
}

impl<S: ActionStoreImpl> Default for ActionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
