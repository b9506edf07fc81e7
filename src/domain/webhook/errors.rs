//! Webhook error types for commerce webhook handling.

use thiserror::Error;

/// Errors that occur while verifying or interpreting a webhook delivery.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WebhookError {
    /// Signature missing or not matching the configured secret.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body is not a `{type, data}` JSON document.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

impl WebhookError {
    /// Only signature failures are rejected; everything else is acknowledged
    /// so the sender does not retry a delivery that can never succeed.
    pub fn rejects_delivery(&self) -> bool {
        matches!(self, WebhookError::InvalidSignature)
    }
}
