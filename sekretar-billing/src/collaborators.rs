use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sekretar_models::errors::SendableError;

use crate::types::{
    AdvanceServiceState, ChargeError, ChargeReceipt, PaymentReason, PlanInfo, UserAccount, UserFlag,
};

/// Payment gateway boundary. The only recoverable failure is
/// [`ChargeError::Declined`]; everything else is reported as
/// [`ChargeError::Gateway`].
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        user: &UserAccount,
        plan: &PlanInfo,
        reason: PaymentReason,
    ) -> Result<ChargeReceipt, ChargeError>;
}

/// Outbound user notifications (delivered by the bot front-end). Failures
/// here must never fail the action that triggered them.
#[async_trait]
pub trait UserNotifier: Send + Sync {
    async fn payment_succeeded(
        &self,
        chat_id: &str,
        plan_id: i64,
        price: i64,
    ) -> Result<(), SendableError>;

    async fn payment_failed(
        &self,
        chat_id: &str,
        plan_id: i64,
        price: i64,
        is_extra: bool,
    ) -> Result<(), SendableError>;

    async fn user_kicked(
        &self,
        chat_id: &str,
        plan_id: i64,
        has_number: bool,
    ) -> Result<(), SendableError>;
}

/// Thin view over the backend's user/plan state. The ORM layer behind it is
/// out of scope here; billing actions only consume this surface.
#[async_trait]
pub trait BillingBackend: Send + Sync {
    async fn find_user(&self, user_id: i64) -> Result<Option<UserAccount>, SendableError>;

    async fn extra_plan(&self) -> Result<PlanInfo, SendableError>;

    /// Activates the next billing period for the user's plan. Returns the
    /// period's end, which is when the following recurrent charge is due.
    async fn activate_plan(
        &self,
        user_id: i64,
        plan_id: i64,
        transaction_id: Option<i64>,
    ) -> Result<DateTime<Utc>, SendableError>;

    /// Activates the extra plan inside the current billing period.
    async fn activate_extra_plan(
        &self,
        user_id: i64,
        plan_id: i64,
        transaction_id: Option<i64>,
    ) -> Result<(), SendableError>;

    async fn unsubscribe(&self, user_id: i64) -> Result<(), SendableError>;

    async fn set_flag(
        &self,
        user_id: i64,
        flag: UserFlag,
        value: bool,
    ) -> Result<(), SendableError>;

    async fn set_advance_state(
        &self,
        user_id: i64,
        state: AdvanceServiceState,
    ) -> Result<(), SendableError>;
}

/// Context handed to every billing action at fire time.
pub struct BillingEnv {
    pub backend: Arc<dyn BillingBackend>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn UserNotifier>,
}
