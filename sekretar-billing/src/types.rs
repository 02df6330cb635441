use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Narrow view of a user record, as served by the backend's internal API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub display_name: String,
    /// Messaging-bot chat to notify about billing outcomes, if linked.
    pub chat_id: Option<String>,
    /// Saved card token for recurring charges.
    pub payment_token: Option<String>,
    /// Assigned virtual number, if the plan granted one.
    pub virtual_number: Option<String>,
    /// Current subscription plan, if any.
    pub plan: Option<PlanInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInfo {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub is_extra: bool,
}

/// State of the provision of service in advance (a single unpaid extra
/// service is allowed before payment clears).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceServiceState {
    Unused,
    InProgress,
    Notified,
}

/// Markers stored on the user so that retry affordances in the bot UI can
/// tell whether a failed payment has since been resolved by another path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserFlag {
    FailedRecurrentRecovered,
    FailedExtraRecovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentReason {
    RegularPlanRecurrent,
    ExtraPlanAutoRetry,
}

impl PaymentReason {
    pub fn describe(&self) -> &'static str {
        match self {
            PaymentReason::RegularPlanRecurrent => "Recurring subscription charge",
            PaymentReason::ExtraPlanAutoRetry => "Extra plan automatic retry",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChargeReceipt {
    pub transaction_id: i64,
}

#[derive(Debug, Error)]
pub enum ChargeError {
    /// The gateway processed the request and refused the charge. Recoverable:
    /// the owning action decides whether to spend a retry.
    #[error("payment declined: {0}")]
    Declined(String),
    /// Transport-level or gateway-side failure; the charge may not have been
    /// attempted at all.
    #[error("gateway request failed: {0}")]
    Gateway(String),
}
