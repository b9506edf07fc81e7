//! Inbound commerce webhook events.
//!
//! The body is `{ "type": "...", "data": { ... } }`. The `data` shape varies
//! by event and by platform revision, so fields are read leniently from the
//! raw JSON rather than through a strict schema.

use serde::Deserialize;
use serde_json::Value;

use super::WebhookError;
use crate::domain::foundation::{ExternalUserId, ProductId, SubscriptionId, Timestamp};
use crate::domain::subscriber::SubscriptionStatus;

/// Classification of a webhook event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionCanceled,
    SubscriptionExpired,
    UserUpdated,
    Unknown(String),
}

impl EventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "subscription.created" => EventKind::SubscriptionCreated,
            "subscription.updated" => EventKind::SubscriptionUpdated,
            "subscription.canceled" | "subscription.cancelled" => EventKind::SubscriptionCanceled,
            "subscription.expired" => EventKind::SubscriptionExpired,
            "user.updated" => EventKind::UserUpdated,
            other => EventKind::Unknown(other.to_string()),
        }
    }
}

/// Subscription details carried by a subscription event.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadSubscription {
    pub subscription_id: SubscriptionId,
    pub product_id: Option<ProductId>,
    pub status: SubscriptionStatus,
    pub expires_at: Option<Timestamp>,
}

/// A webhook delivery, parsed but not yet interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

impl WebhookEvent {
    /// Parses a raw body.
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(body).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from_type(&self.event_type)
    }

    /// Commerce user the event refers to.
    ///
    /// Subscription events carry `user_id` or `customer.id`; user events
    /// carry the user as the object itself (`id`).
    pub fn external_user_id(&self) -> Result<ExternalUserId, WebhookError> {
        let raw = string_at(&self.data, &["user_id"])
            .or_else(|| string_at(&self.data, &["customer", "id"]))
            .or_else(|| match self.kind() {
                EventKind::UserUpdated => string_at(&self.data, &["id"]),
                _ => None,
            })
            .ok_or(WebhookError::MissingField("user_id"))?;
        ExternalUserId::new(raw).map_err(|_| WebhookError::MissingField("user_id"))
    }

    /// The subscription carried by the payload, when it has an id and a known status.
    pub fn subscription(&self) -> Option<PayloadSubscription> {
        let subscription_id = string_at(&self.data, &["id"])
            .or_else(|| string_at(&self.data, &["subscription_id"]))
            .and_then(|id| SubscriptionId::new(id).ok())?;
        let status = string_at(&self.data, &["status"])
            .and_then(|s| SubscriptionStatus::parse(&s))?;
        let product_id = string_at(&self.data, &["product_id"])
            .or_else(|| string_at(&self.data, &["product", "id"]))
            .and_then(|id| ProductId::new(id).ok());
        let expires_at = timestamp_at(&self.data, "expires_at")
            .or_else(|| timestamp_at(&self.data, "current_period_end"));

        Some(PayloadSubscription {
            subscription_id,
            product_id,
            status,
            expires_at,
        })
    }
}

/// Reads a string (or integer, rendered as a string) at a nested path.
pub(crate) fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    match current {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads an RFC 3339 string or unix-seconds number.
pub(crate) fn timestamp_at(value: &Value, key: &str) -> Option<Timestamp> {
    match value.get(key)? {
        Value::String(s) => Timestamp::parse_rfc3339(s),
        Value::Number(n) => n.as_i64().and_then(Timestamp::from_unix_secs),
        _ => None,
    }
}
