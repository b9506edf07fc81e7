//! Request and response DTOs for the access API.
//!
//! JSON field names are camelCase.

use serde::{Deserialize, Serialize};

use crate::application::handlers::{
    ItemResult, LinkChatIdentityResult, ReconciliationResult, RevokeAccessResult, StepOutcome,
    UpdateMetricsResult,
};
use crate::domain::foundation::{Timestamp, ValidationError};
use crate::domain::subscriber::Subscriber;
use crate::domain::tiers::{CommunityTier, MetricsPatch};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /user/:id/metrics`. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetricsRequest {
    pub rank_score: Option<i64>,
    pub earnings: Option<f64>,
    pub follower_count: Option<i64>,
}

impl UpdateMetricsRequest {
    pub fn into_patch(self) -> Result<MetricsPatch, ValidationError> {
        let count = |field: &str, value: Option<i64>| match value {
            Some(v) if v < 0 => Err(ValidationError::negative(field, v as f64)),
            Some(v) => Ok(Some(v as u64)),
            None => Ok(None),
        };
        let patch = MetricsPatch {
            rank_score: count("rankScore", self.rank_score)?,
            earnings: self.earnings,
            follower_count: count("followerCount", self.follower_count)?,
        };
        patch.validate()?;
        Ok(patch)
    }
}

/// Body of `POST /user/:id/link-chat`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkChatRequest {
    pub chat_user_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub access_gateway_ready: bool,
    pub timestamp: Timestamp,
}

/// One role/channel pair and what happened to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessItemResponse {
    pub source: String,
    pub role_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ItemResult> for AccessItemResponse {
    fn from(result: &ItemResult) -> Self {
        let error = [Some(&result.role), result.channel.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|step| match step {
                StepOutcome::Failed { reason } => Some(reason.clone()),
                _ => None,
            });
        Self {
            source: result.item.source.to_string(),
            role_id: result.item.role_id.to_string(),
            channel_id: result.item.channel_id.as_ref().map(ToString::to_string),
            role: result.role.as_str(),
            channel: result.channel.as_ref().map(StepOutcome::as_str),
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResponse {
    pub external_user_id: String,
    pub chat_user_id: Option<String>,
    pub status: &'static str,
    pub tiers: Vec<CommunityTier>,
    pub grants_issued: usize,
    pub failures: usize,
    pub items: Vec<AccessItemResponse>,
    pub skipped_products: Vec<String>,
}

impl From<&ReconciliationResult> for ReconciliationResponse {
    fn from(result: &ReconciliationResult) -> Self {
        Self {
            external_user_id: result.external_user_id.to_string(),
            chat_user_id: result.chat_user_id.as_ref().map(ToString::to_string),
            status: result.status.as_str(),
            tiers: result.tiers.iter().copied().collect(),
            grants_issued: result.grants_issued(),
            failures: result.failures(),
            items: result.items.iter().map(AccessItemResponse::from).collect(),
            skipped_products: result.skipped_products.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationResponse {
    pub external_user_id: String,
    pub chat_user_id: Option<String>,
    pub status: &'static str,
    pub revocations: usize,
    pub failures: usize,
    pub items: Vec<AccessItemResponse>,
    pub subscription_cleared: bool,
}

impl From<&RevokeAccessResult> for RevocationResponse {
    fn from(result: &RevokeAccessResult) -> Self {
        let revocation = &result.revocation;
        Self {
            external_user_id: revocation.external_user_id.to_string(),
            chat_user_id: revocation.chat_user_id.as_ref().map(ToString::to_string),
            status: revocation.status.as_str(),
            revocations: revocation.revocations(),
            failures: revocation.failures(),
            items: revocation.items.iter().map(AccessItemResponse::from).collect(),
            subscription_cleared: result.subscription_cleared,
        }
    }
}

/// Response of the metrics and link endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberUpdateResponse {
    pub subscriber: Subscriber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<ReconciliationResponse>,
}

impl From<UpdateMetricsResult> for SubscriberUpdateResponse {
    fn from(result: UpdateMetricsResult) -> Self {
        Self {
            reconciliation: result.reconciliation.as_ref().map(ReconciliationResponse::from),
            subscriber: result.subscriber,
        }
    }
}

impl From<LinkChatIdentityResult> for SubscriberUpdateResponse {
    fn from(result: LinkChatIdentityResult) -> Self {
        Self {
            reconciliation: result.reconciliation.as_ref().map(ReconciliationResponse::from),
            subscriber: result.subscriber,
        }
    }
}

/// Standard error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Error code for programmatic handling.
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metrics_request_accepts_partial_camel_case_body() {
        let request: UpdateMetricsRequest =
            serde_json::from_value(json!({"earnings": 6000})).unwrap();
        let patch = request.into_patch().unwrap();
        assert_eq!(patch.earnings, Some(6000.0));
        assert_eq!(patch.rank_score, None);

        let request: UpdateMetricsRequest =
            serde_json::from_value(json!({"rankScore": 12, "followerCount": 3})).unwrap();
        let patch = request.into_patch().unwrap();
        assert_eq!(patch.rank_score, Some(12));
        assert_eq!(patch.follower_count, Some(3));
    }

    #[test]
    fn negative_counts_are_rejected() {
        let request = UpdateMetricsRequest {
            follower_count: Some(-1),
            ..Default::default()
        };
        assert!(request.into_patch().is_err());

        let request = UpdateMetricsRequest {
            earnings: Some(-0.5),
            ..Default::default()
        };
        assert!(request.into_patch().is_err());
    }

    #[test]
    fn link_request_uses_camel_case() {
        let request: LinkChatRequest =
            serde_json::from_value(json!({"chatUserId": "1234"})).unwrap();
        assert_eq!(request.chat_user_id, "1234");
    }

    #[test]
    fn health_response_shape() {
        let json = serde_json::to_value(HealthResponse {
            status: "ok",
            access_gateway_ready: true,
            timestamp: Timestamp::now(),
        })
        .unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["accessGatewayReady"], true);
        assert!(json["timestamp"].is_string());
    }
}
