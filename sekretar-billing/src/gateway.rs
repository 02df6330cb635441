use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Url;
use sekretar_models::errors::SendableError;
use serde::{Deserialize, Serialize};

use crate::collaborators::PaymentGateway;
use crate::types::{ChargeError, ChargeReceipt, PaymentReason, PlanInfo, UserAccount};

/// CloudPayments-style token-charge client. A processed-but-refused charge
/// maps to [`ChargeError::Declined`]; transport and HTTP-level failures map
/// to [`ChargeError::Gateway`].
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    public_id: String,
    api_secret: String,
}

#[derive(Serialize)]
struct ChargeRequest<'a> {
    #[serde(rename = "Amount")]
    amount: i64,
    #[serde(rename = "Currency")]
    currency: &'a str,
    #[serde(rename = "AccountId")]
    account_id: String,
    #[serde(rename = "Token")]
    token: &'a str,
    #[serde(rename = "Description")]
    description: &'a str,
}

#[derive(Deserialize)]
struct ChargeResponse {
    #[serde(rename = "Success")]
    success: bool,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Model")]
    model: Option<ChargeModel>,
}

#[derive(Deserialize)]
struct ChargeModel {
    #[serde(rename = "TransactionId")]
    transaction_id: i64,
    #[serde(rename = "CardHolderMessage")]
    card_holder_message: Option<String>,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        public_id: String,
        api_secret: String,
        timeout: Duration,
    ) -> Result<Self, SendableError> {
        let base_url = Url::parse(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| -> SendableError { Box::new(err) })?;

        Ok(Self {
            client,
            base_url,
            public_id,
            api_secret,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn charge(
        &self,
        user: &UserAccount,
        plan: &PlanInfo,
        reason: PaymentReason,
    ) -> Result<ChargeReceipt, ChargeError> {
        let Some(token) = user.payment_token.as_deref() else {
            return Err(ChargeError::Declined(format!(
                "no saved payment token for user {}",
                user.id
            )));
        };

        let url = self
            .base_url
            .join("payments/tokens/charge")
            .map_err(|err| ChargeError::Gateway(err.to_string()))?;
        let payload = ChargeRequest {
            amount: plan.price,
            currency: "RUB",
            account_id: user.id.to_string(),
            token,
            description: reason.describe(),
        };

        let response = self
            .client
            .post(url)
            .basic_auth(&self.public_id, Some(&self.api_secret))
            .json(&payload)
            .send()
            .await
            .map_err(|err| ChargeError::Gateway(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChargeError::Gateway(format!(
                "charge request returned {}",
                status
            )));
        }

        let body = response
            .json::<ChargeResponse>()
            .await
            .map_err(|err| ChargeError::Gateway(err.to_string()))?;

        match body.model {
            Some(model) if body.success => {
                debug!(
                    "Charged plan {} for user {} (transaction {})",
                    plan.id, user.id, model.transaction_id
                );
                Ok(ChargeReceipt {
                    transaction_id: model.transaction_id,
                })
            }
            Some(model) => Err(ChargeError::Declined(
                model
                    .card_holder_message
                    .or(body.message)
                    .unwrap_or_else(|| "charge refused".into()),
            )),
            None => Err(ChargeError::Declined(
                body.message.unwrap_or_else(|| "charge refused".into()),
            )),
        }
    }
}
