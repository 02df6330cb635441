use chrono::{DateTime, Utc};
use log::{error, info, warn};
use sekretar_database::interfaces::ActionStoreImpl;
use sekretar_models::errors::SendableError;
use sekretar_scheduler::{Action, Scheduler};
use serde::{Deserialize, Serialize};

use crate::collaborators::BillingEnv;
use crate::types::{AdvanceServiceState, ChargeError, PaymentReason, UserFlag};
use crate::{
    auto_kick_period, charge_retry_period, kinds, sweeps, CHARGE_RETRIES_COUNT,
    POST_KICK_SWEEP_DELAY,
};

/// Recurring subscription charge. On success, activates the next billing
/// period and re-schedules itself at that period's end with a fresh retry
/// budget. On failure, spends a retry (re-scheduled after
/// [`charge_retry_period`]) or, with the budget exhausted, escalates to
/// [`KickInactiveAction`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentPaymentAction {
    pub user_id: i64,
    pub retries_left: i64,
}

impl<S: ActionStoreImpl> Action<S> for RecurrentPaymentAction {
    const NAME: &'static str = kinds::RECURRENT_PAYMENT;

    type Ctx = BillingEnv;

    fn user_id(&self) -> Option<i64> {
        Some(self.user_id)
    }

    async fn run(
        mut self,
        scheduler: &Scheduler<S>,
        env: &BillingEnv,
        due: DateTime<Utc>,
    ) -> Result<(), SendableError> {
        let Some(user) = env.backend.find_user(self.user_id).await? else {
            warn!("User {} not found", self.user_id);
            return Ok(());
        };
        let Some(plan) = user.plan.clone() else {
            warn!(
                "No plan (subscription) for user {} ({}) -- cannot make recurrent payment",
                user.id, user.display_name
            );
            return Ok(());
        };

        let success = match env
            .gateway
            .charge(&user, &plan, PaymentReason::RegularPlanRecurrent)
            .await
        {
            Ok(receipt) => {
                let next_period_start = env
                    .backend
                    .activate_plan(user.id, plan.id, Some(receipt.transaction_id))
                    .await?;

                self.retries_left = CHARGE_RETRIES_COUNT;
                scheduler.schedule(&self, next_period_start).await?;

                env.backend
                    .set_flag(user.id, UserFlag::FailedRecurrentRecovered, true)
                    .await?;
                true
            }
            Err(ChargeError::Declined(reason)) => {
                info!("Recurrent charge declined for user {}: {}", user.id, reason);

                if self.retries_left > 0 {
                    self.retries_left -= 1;
                    scheduler.schedule(&self, due + charge_retry_period()).await?;
                } else {
                    scheduler
                        .schedule(
                            &KickInactiveAction { user_id: user.id },
                            due + auto_kick_period(),
                        )
                        .await?;
                }

                env.backend
                    .set_flag(user.id, UserFlag::FailedRecurrentRecovered, false)
                    .await?;
                false
            }
            // Only a decline spends the retry budget; a transport failure may
            // not have reached the gateway at all, so it goes to the
            // execution wrapper's crash policy and the action refires whole
            Err(err @ ChargeError::Gateway(_)) => return Err(err.into()),
        };

        if let Some(chat_id) = user.chat_id.as_deref() {
            notify_payment_outcome(env, chat_id, user.id, plan.id, plan.price, success, false)
                .await;
        }
        Ok(())
    }
}

/// Kept so rows persisted under the retired retry kind still decode; runs as
/// [`RecurrentPaymentAction`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyRecurrentPaymentRetryAction {
    pub user_id: i64,
    pub retries_left: i64,
}

impl<S: ActionStoreImpl> Action<S> for LegacyRecurrentPaymentRetryAction {
    const NAME: &'static str = kinds::RECURRENT_PAYMENT_RETRY;

    type Ctx = BillingEnv;

    fn user_id(&self) -> Option<i64> {
        Some(self.user_id)
    }

    async fn run(
        self,
        scheduler: &Scheduler<S>,
        env: &BillingEnv,
        due: DateTime<Utc>,
    ) -> Result<(), SendableError> {
        warn!(
            "Deprecated action kind {:?} used; running as {:?}",
            kinds::RECURRENT_PAYMENT_RETRY,
            kinds::RECURRENT_PAYMENT
        );
        RecurrentPaymentAction {
            user_id: self.user_id,
            retries_left: self.retries_left,
        }
        .run(scheduler, env, due)
        .await
    }
}

/// Charge retry for the extra plan, bounded by both a retry budget and a hard
/// deadline (the end of the billing period the extra plan would fit into).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraPlanPaymentRetryAction {
    pub user_id: i64,
    pub retries_left: i64,
    pub deadline: DateTime<Utc>,
}

impl<S: ActionStoreImpl> Action<S> for ExtraPlanPaymentRetryAction {
    const NAME: &'static str = kinds::EXTRA_PLAN_PAYMENT_RETRY;

    type Ctx = BillingEnv;

    fn user_id(&self) -> Option<i64> {
        Some(self.user_id)
    }

    async fn run(
        mut self,
        scheduler: &Scheduler<S>,
        env: &BillingEnv,
        due: DateTime<Utc>,
    ) -> Result<(), SendableError> {
        if Utc::now() > self.deadline {
            info!("Extra plan payment expired for user {}", self.user_id);
            env.backend
                .set_advance_state(self.user_id, AdvanceServiceState::Unused)
                .await?;
            return Ok(());
        }

        let Some(user) = env.backend.find_user(self.user_id).await? else {
            warn!("User {} not found", self.user_id);
            return Ok(());
        };

        let extra_plan = env.backend.extra_plan().await?;

        let success = match env
            .gateway
            .charge(&user, &extra_plan, PaymentReason::ExtraPlanAutoRetry)
            .await
        {
            Ok(receipt) => {
                env.backend
                    .activate_extra_plan(user.id, extra_plan.id, Some(receipt.transaction_id))
                    .await?;
                env.backend
                    .set_flag(user.id, UserFlag::FailedExtraRecovered, true)
                    .await?;
                true
            }
            Err(ChargeError::Declined(reason)) => {
                info!("Extra plan charge declined for user {}: {}", user.id, reason);

                if self.retries_left > 0 {
                    self.retries_left -= 1;
                    scheduler.schedule(&self, due + charge_retry_period()).await?;
                }

                env.backend
                    .set_flag(user.id, UserFlag::FailedExtraRecovered, false)
                    .await?;
                false
            }
            Err(err @ ChargeError::Gateway(_)) => return Err(err.into()),
        };

        if let Some(chat_id) = user.chat_id.as_deref() {
            notify_payment_outcome(
                env,
                chat_id,
                user.id,
                extra_plan.id,
                extra_plan.price,
                success,
                true,
            )
            .await;
        }
        Ok(())
    }
}

/// Fires when an unpaid extra plan runs out: resets the advance-service
/// marker so the user can be offered the service again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraPlanResetAction {
    pub user_id: i64,
}

impl<S: ActionStoreImpl> Action<S> for ExtraPlanResetAction {
    const NAME: &'static str = kinds::EXTRA_PLAN_RESET;

    type Ctx = BillingEnv;

    fn user_id(&self) -> Option<i64> {
        Some(self.user_id)
    }

    async fn run(
        self,
        _scheduler: &Scheduler<S>,
        env: &BillingEnv,
        _due: DateTime<Utc>,
    ) -> Result<(), SendableError> {
        if env.backend.find_user(self.user_id).await?.is_none() {
            warn!("User {} not found", self.user_id);
            return Ok(());
        }

        info!(
            "Extra plan expired for user {}; resetting advance service state",
            self.user_id
        );
        env.backend
            .set_advance_state(self.user_id, AdvanceServiceState::Unused)
            .await?;
        Ok(())
    }
}

/// Final escalation after payment retries ran dry: unsubscribe the user,
/// notify them, and sweep away the rest of their pending billing actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KickInactiveAction {
    pub user_id: i64,
}

impl<S: ActionStoreImpl> Action<S> for KickInactiveAction {
    const NAME: &'static str = kinds::KICK_INACTIVE;

    type Ctx = BillingEnv;

    fn user_id(&self) -> Option<i64> {
        Some(self.user_id)
    }

    async fn run(
        self,
        scheduler: &Scheduler<S>,
        env: &BillingEnv,
        _due: DateTime<Utc>,
    ) -> Result<(), SendableError> {
        let Some(user) = env.backend.find_user(self.user_id).await? else {
            warn!("User {} not found", self.user_id);
            return Ok(());
        };
        let Some(plan) = user.plan.clone() else {
            warn!(
                "No plan for user {} ({}) -- cannot kick..?",
                user.id, user.display_name
            );
            return Ok(());
        };

        let has_number = user.virtual_number.is_some();
        env.backend.unsubscribe(user.id).await?;

        if let Some(chat_id) = user.chat_id.as_deref() {
            if let Err(err) = env.notifier.user_kicked(chat_id, plan.id, has_number).await {
                error!("Failed to notify user {} of kick: {}", user.id, err);
            }
        }

        // The sweep is deferred so it cannot cancel this action's own row
        // before the wrapper marks it done
        let scheduler = scheduler.clone();
        let user_id = self.user_id;
        tokio::spawn(async move {
            tokio::time::sleep(POST_KICK_SWEEP_DELAY).await;
            if let Err(err) = sweeps::cancel_billing_actions(&scheduler, user_id).await {
                error!(
                    "Failed to cancel billing actions for user {}: {}",
                    user_id, err
                );
            }
        });
        Ok(())
    }
}

/// Reports a payment outcome to the user's chat. Delivery failures are
/// logged; they never affect the action that charged the payment.
async fn notify_payment_outcome(
    env: &BillingEnv,
    chat_id: &str,
    user_id: i64,
    plan_id: i64,
    price: i64,
    success: bool,
    is_extra: bool,
) {
    let result = if success {
        env.notifier.payment_succeeded(chat_id, plan_id, price).await
    } else {
        env.notifier
            .payment_failed(chat_id, plan_id, price, is_extra)
            .await
    };

    if let Err(err) = result {
        error!(
            "Failed to inform user {} of payment status (plan {}, success: {}): {}",
            user_id, plan_id, success, err
        );
    }
}
