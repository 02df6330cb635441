use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Url;
use sekretar_models::errors::{RuntimeError, SendableError};
use serde::{Deserialize, Serialize};

use crate::collaborators::{BillingBackend, UserNotifier};
use crate::types::{AdvanceServiceState, PlanInfo, UserAccount, UserFlag};

/// Client for the backend's internal HTTP API. The scheduler runs as a
/// sidecar next to the main backend process; user/plan state and bot
/// notifications stay on the backend's side of the fence.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: Url,
    auth_token: String,
}

#[derive(Serialize)]
struct ActivationRequest {
    plan_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<i64>,
}

#[derive(Deserialize)]
struct ActivationResponse {
    next_charge_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct FlagRequest {
    flag: UserFlag,
    value: bool,
}

#[derive(Serialize)]
struct AdvanceStateRequest {
    state: AdvanceServiceState,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum NotificationRequest<'a> {
    PaymentSucceeded {
        chat_id: &'a str,
        plan_id: i64,
        price: i64,
    },
    PaymentFailed {
        chat_id: &'a str,
        plan_id: i64,
        price: i64,
        is_extra: bool,
    },
    UserKicked {
        chat_id: &'a str,
        plan_id: i64,
        has_number: bool,
    },
}

impl BackendClient {
    pub fn new(
        base_url: &str,
        auth_token: String,
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
            auth_token,
        })
    }

    fn build_url(&self, path: &str) -> Result<Url, SendableError> {
        let joined = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| -> SendableError { Box::new(err) })?;
        Ok(joined)
    }

    async fn post_json<T: Serialize>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<reqwest::Response, SendableError> {
        let url = self.build_url(path)?;
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.auth_token)
            .json(payload)
            .send()
            .await
            .map_err(|err| -> SendableError { Box::new(err) })?;
        handle_response(url, response).await
    }
}

#[async_trait]
impl BillingBackend for BackendClient {
    async fn find_user(&self, user_id: i64) -> Result<Option<UserAccount>, SendableError> {
        let url = self.build_url(&format!("/internal/users/{user_id}"))?;
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|err| -> SendableError { Box::new(err) })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = handle_response(url, response).await?;
        let user = response
            .json::<UserAccount>()
            .await
            .map_err(|err| -> SendableError { Box::new(err) })?;
        debug!("Fetched user {} from backend API", user.id);
        Ok(Some(user))
    }

    async fn extra_plan(&self) -> Result<PlanInfo, SendableError> {
        let url = self.build_url("/internal/plans/extra")?;
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|err| -> SendableError { Box::new(err) })?;
        let response = handle_response(url, response).await?;
        let plan = response
            .json::<PlanInfo>()
            .await
            .map_err(|err| -> SendableError { Box::new(err) })?;
        Ok(plan)
    }

    async fn activate_plan(
        &self,
        user_id: i64,
        plan_id: i64,
        transaction_id: Option<i64>,
    ) -> Result<DateTime<Utc>, SendableError> {
        let response = self
            .post_json(
                &format!("/internal/users/{user_id}/activations"),
                &ActivationRequest {
                    plan_id,
                    transaction_id,
                },
            )
            .await?;
        let body = response
            .json::<ActivationResponse>()
            .await
            .map_err(|err| -> SendableError { Box::new(err) })?;
        Ok(body.next_charge_at)
    }

    async fn activate_extra_plan(
        &self,
        user_id: i64,
        plan_id: i64,
        transaction_id: Option<i64>,
    ) -> Result<(), SendableError> {
        self.post_json(
            &format!("/internal/users/{user_id}/extra_activations"),
            &ActivationRequest {
                plan_id,
                transaction_id,
            },
        )
        .await?;
        Ok(())
    }

    async fn unsubscribe(&self, user_id: i64) -> Result<(), SendableError> {
        self.post_json(
            &format!("/internal/users/{user_id}/unsubscribe"),
            &serde_json::json!({}),
        )
        .await?;
        Ok(())
    }

    async fn set_flag(
        &self,
        user_id: i64,
        flag: UserFlag,
        value: bool,
    ) -> Result<(), SendableError> {
        self.post_json(
            &format!("/internal/users/{user_id}/flags"),
            &FlagRequest { flag, value },
        )
        .await?;
        Ok(())
    }

    async fn set_advance_state(
        &self,
        user_id: i64,
        state: AdvanceServiceState,
    ) -> Result<(), SendableError> {
        self.post_json(
            &format!("/internal/users/{user_id}/advance_state"),
            &AdvanceStateRequest { state },
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserNotifier for BackendClient {
    async fn payment_succeeded(
        &self,
        chat_id: &str,
        plan_id: i64,
        price: i64,
    ) -> Result<(), SendableError> {
        self.post_json(
            "/internal/notifications",
            &NotificationRequest::PaymentSucceeded {
                chat_id,
                plan_id,
                price,
            },
        )
        .await?;
        Ok(())
    }

    async fn payment_failed(
        &self,
        chat_id: &str,
        plan_id: i64,
        price: i64,
        is_extra: bool,
    ) -> Result<(), SendableError> {
        self.post_json(
            "/internal/notifications",
            &NotificationRequest::PaymentFailed {
                chat_id,
                plan_id,
                price,
                is_extra,
            },
        )
        .await?;
        Ok(())
    }

    async fn user_kicked(
        &self,
        chat_id: &str,
        plan_id: i64,
        has_number: bool,
    ) -> Result<(), SendableError> {
        self.post_json(
            "/internal/notifications",
            &NotificationRequest::UserKicked {
                chat_id,
                plan_id,
                has_number,
            },
        )
        .await?;
        Ok(())
    }
}

async fn handle_response(
    url: Url,
    response: reqwest::Response,
) -> Result<reqwest::Response, SendableError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read body>".into());
        Err(Box::new(RuntimeError::new(
            format!("billing.backend_api.{}", status.as_u16()),
            format!("{} {}: {}", status.as_str(), url, body),
        )))
    }
}
