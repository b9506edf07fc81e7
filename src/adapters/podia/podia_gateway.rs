//! Podia commerce gateway.
//!
//! Response bodies vary between API revisions (ids as numbers or strings,
//! product as an id or a nested object, expiry as `expires_at` or
//! `current_period_end`), so they are read leniently from raw JSON.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::domain::foundation::{ChatUserId, ExternalUserId, ProductId, SubscriptionId};
use crate::domain::subscriber::SubscriptionStatus;
use crate::domain::webhook::{string_at, timestamp_at};
use crate::ports::{CommerceGateway, CommerceSubscription, CommerceUser, GatewayError};

/// Podia API configuration.
#[derive(Clone)]
pub struct PodiaConfig {
    api_token: SecretString,
    api_base_url: String,
    timeout: Duration,
}

impl PodiaConfig {
    pub fn new(api_token: SecretString) -> Self {
        Self {
            api_token,
            api_base_url: "https://api.podia.com/v1".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Podia adapter implementing `CommerceGateway`.
pub struct PodiaCommerceGateway {
    config: PodiaConfig,
    http_client: reqwest::Client,
}

impl PodiaCommerceGateway {
    pub fn new(config: PodiaConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, http_client })
    }

    /// GETs `path`, returning `None` on 404.
    async fn get_json(&self, path: &str) -> Result<Option<Value>, GatewayError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.api_token.expose_secret())
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.config.timeout))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_server_error() {
            return Err(GatewayError::Unavailable(format!("Podia API returned {}", status)));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| {
                GatewayError::InvalidResponse(format!("Failed to parse Podia response: {}", e))
            })
    }
}

fn map_transport_error(err: reqwest::Error, timeout: Duration) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(timeout)
    } else {
        GatewayError::Unavailable(err.to_string())
    }
}

/// Extracts active or trialing subscriptions from a `/subscriptions` body.
fn parse_active_subscriptions(body: &Value) -> Vec<CommerceSubscription> {
    let items = body
        .get("subscriptions")
        .or_else(|| body.get("data"))
        .and_then(Value::as_array)
        .or_else(|| body.as_array());

    items
        .into_iter()
        .flatten()
        .filter_map(|item| {
            let status = string_at(item, &["status"]).and_then(|s| SubscriptionStatus::parse(&s))?;
            if !status.is_active() {
                return None;
            }
            let subscription_id =
                string_at(item, &["id"]).and_then(|id| SubscriptionId::new(id).ok())?;
            let product_id = string_at(item, &["product_id"])
                .or_else(|| string_at(item, &["product", "id"]))
                .and_then(|id| ProductId::new(id).ok());
            let Some(product_id) = product_id else {
                tracing::warn!(
                    subscription_id = %subscription_id,
                    "Podia subscription has no product id, skipping"
                );
                return None;
            };
            let expires_at = timestamp_at(item, "expires_at")
                .or_else(|| timestamp_at(item, "current_period_end"));

            Some(CommerceSubscription {
                subscription_id,
                product_id,
                status,
                expires_at,
            })
        })
        .collect()
}

/// Extracts the profile fields from a `/users/{id}` body.
fn parse_user(body: &Value) -> CommerceUser {
    let user = body.get("user").unwrap_or(body);
    let chat_user_id = string_at(user, &["custom_fields", "discord_id"])
        .or_else(|| string_at(user, &["integrations", "discord", "user_id"]))
        .or_else(|| string_at(user, &["metadata", "discord_id"]))
        .and_then(|id| ChatUserId::new(id).ok());

    CommerceUser {
        email: string_at(user, &["email"]),
        chat_user_id,
    }
}

#[async_trait]
impl CommerceGateway for PodiaCommerceGateway {
    async fn active_subscriptions(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Vec<CommerceSubscription>, GatewayError> {
        let path = format!("/users/{}/subscriptions", external_user_id);
        let subscriptions = self
            .get_json(&path)
            .await?
            .map(|body| parse_active_subscriptions(&body))
            .unwrap_or_default();

        tracing::debug!(
            external_user_id = %external_user_id,
            count = subscriptions.len(),
            "Fetched active subscriptions"
        );
        Ok(subscriptions)
    }

    async fn get_user(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<CommerceUser>, GatewayError> {
        let path = format!("/users/{}", external_user_id);
        Ok(self.get_json(&path).await?.map(|body| parse_user(&body)))
    }
}
