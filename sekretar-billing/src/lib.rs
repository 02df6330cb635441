use std::sync::Arc;
use std::time::Duration;

use sekretar_database::interfaces::ActionStoreImpl;
use sekretar_scheduler::{ActionRegistry, SchedulerError};

pub mod actions;
pub mod collaborators;
pub mod gateway;
pub mod remote;
pub mod sweeps;
pub mod types;

use actions::{
    ExtraPlanPaymentRetryAction, ExtraPlanResetAction, KickInactiveAction,
    LegacyRecurrentPaymentRetryAction, RecurrentPaymentAction,
};
use collaborators::BillingEnv;

/// Persisted action kind names. Fixed strings: existing rows must keep
/// decoding across deployments.
pub mod kinds {
    pub const RECURRENT_PAYMENT: &str = "recurrent_payment";
    pub const RECURRENT_PAYMENT_RETRY: &str = "recurrent_payment_retry";
    pub const KICK_INACTIVE: &str = "pishov_nahui";
    pub const EXTRA_PLAN_PAYMENT_RETRY: &str = "extra_plan_payment_retry";
    pub const EXTRA_PLAN_RESET: &str = "extra_plan_reset";
}

/// Retry budget granted to a fresh recurrent charge. Effectively one more
/// charge than this: the initial attempt does not count as a retry.
pub const CHARGE_RETRIES_COUNT: i64 = 2;

/// Grace before the post-kick cancellation sweep, so the sweep cannot cancel
/// the kick's own still-running row.
pub const POST_KICK_SWEEP_DELAY: Duration = Duration::from_secs(10);

pub fn charge_retry_period() -> chrono::Duration {
    chrono::Duration::days(1)
}

pub fn auto_kick_period() -> chrono::Duration {
    chrono::Duration::days(30)
}

/// Registers every billing action kind. Called once from the startup routine,
/// before the scheduler is constructed.
pub fn register_billing_actions<S: ActionStoreImpl>(
    registry: &mut ActionRegistry<S>,
    env: Arc<BillingEnv>,
) -> Result<(), SchedulerError> {
    registry.register_action::<RecurrentPaymentAction>(Arc::clone(&env))?;
    registry.register_action::<LegacyRecurrentPaymentRetryAction>(Arc::clone(&env))?;
    registry.register_action::<ExtraPlanPaymentRetryAction>(Arc::clone(&env))?;
    registry.register_action::<ExtraPlanResetAction>(Arc::clone(&env))?;
    registry.register_action::<KickInactiveAction>(env)?;
    Ok(())
}
