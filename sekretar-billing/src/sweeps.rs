//! Bulk cancellation sweeps. Whenever business state changes out-of-band
//! (manual payment, unsubscribe), the pending punishment actions guarding the
//! old state must be cancelled so a stale retry cannot fire afterwards.

use sekretar_database::interfaces::ActionStoreImpl;
use sekretar_models::errors::SendableError;
use sekretar_scheduler::Scheduler;

use crate::kinds;

/// Cancels the punishment actions pending against a user: the kick and both
/// payment-retry kinds. Called when a payment lands through another path.
pub async fn cancel_billing_punishment<S: ActionStoreImpl>(
    scheduler: &Scheduler<S>,
    user_id: i64,
) -> Result<usize, SendableError> {
    scheduler
        .cancel_pending(
            Some(user_id),
            &[
                kinds::KICK_INACTIVE,
                kinds::RECURRENT_PAYMENT_RETRY,
                kinds::EXTRA_PLAN_PAYMENT_RETRY,
            ],
        )
        .await
}

/// Cancels pending extra-plan actions (retry and reset) once the extra plan
/// has been paid for or superseded.
pub async fn cancel_extra_punishments<S: ActionStoreImpl>(
    scheduler: &Scheduler<S>,
    user_id: i64,
) -> Result<usize, SendableError> {
    scheduler
        .cancel_pending(
            Some(user_id),
            &[kinds::EXTRA_PLAN_PAYMENT_RETRY, kinds::EXTRA_PLAN_RESET],
        )
        .await
}

/// Cancels everything billing-related for a user. Used after a kick, when no
/// further billing activity is expected at all.
pub async fn cancel_billing_actions<S: ActionStoreImpl>(
    scheduler: &Scheduler<S>,
    user_id: i64,
) -> Result<usize, SendableError> {
    scheduler
        .cancel_pending(
            Some(user_id),
            &[
                kinds::KICK_INACTIVE,
                kinds::RECURRENT_PAYMENT,
                kinds::RECURRENT_PAYMENT_RETRY,
                kinds::EXTRA_PLAN_PAYMENT_RETRY,
            ],
        )
        .await
}
