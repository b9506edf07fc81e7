//! EventRouter - verifies, classifies and dispatches commerce webhooks.
//!
//! The router decides *what* to do with an event; the reconciliation engine
//! decides *how* access changes. Senders get a 200 for everything except a
//! failed signature, so most outcomes here are values rather than errors.

use std::sync::Arc;

use thiserror::Error;

use crate::application::handlers::access::ChatIdentityResolver;
use crate::application::handlers::reconciliation::{
    ReconciliationEngine, ReconciliationError, ReconciliationStatus,
};
use crate::domain::catalog::ProductCatalog;
use crate::domain::foundation::{DomainError, ErrorCode, ExternalUserId};
use crate::domain::subscriber::{SubscriberPatch, SubscriptionUpdate};
use crate::domain::webhook::{EventKind, WebhookError, WebhookEvent, WebhookVerifier};
use crate::ports::SubscriberStore;

/// What happened to a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Subscription state was reconciled against live access.
    Reconciled { status: ReconciliationStatus },
    /// Access was revoked after a cancellation or expiry.
    Revoked { status: ReconciliationStatus },
    /// The event was recorded but access could not be applied yet.
    Deferred { reason: String },
    /// Nothing to do (unknown type, malformed body, no subscription).
    Ignored { reason: String },
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Reconciled { .. } => "reconciled",
            WebhookOutcome::Revoked { .. } => "revoked",
            WebhookOutcome::Deferred { .. } => "deferred",
            WebhookOutcome::Ignored { .. } => "ignored",
        }
    }

    fn ignored(reason: impl Into<String>) -> Self {
        WebhookOutcome::Ignored { reason: reason.into() }
    }
}

/// Failures that change the response to the sender.
#[derive(Debug, Error)]
pub enum WebhookHandlingError {
    #[error(transparent)]
    Rejected(WebhookError),

    #[error("Store error: {0}")]
    Store(#[from] DomainError),
}

impl WebhookHandlingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            WebhookHandlingError::Rejected(_) => ErrorCode::InvalidSignature,
            WebhookHandlingError::Store(e) => e.code,
        }
    }
}

pub struct EventRouter {
    engine: Arc<ReconciliationEngine>,
    store: Arc<dyn SubscriberStore>,
    resolver: Arc<ChatIdentityResolver>,
    catalog: Arc<ProductCatalog>,
    /// `None` accepts every delivery unverified.
    verifier: Option<WebhookVerifier>,
}

impl EventRouter {
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        store: Arc<dyn SubscriberStore>,
        resolver: Arc<ChatIdentityResolver>,
        catalog: Arc<ProductCatalog>,
        verifier: Option<WebhookVerifier>,
    ) -> Self {
        if verifier.is_none() {
            tracing::warn!("No webhook secret configured, accepting unsigned deliveries");
        }
        Self {
            engine,
            store,
            resolver,
            catalog,
            verifier,
        }
    }

    /// Handles one raw delivery.
    pub async fn handle(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, WebhookHandlingError> {
        // 1. Verify
        if let Some(verifier) = &self.verifier {
            verifier.verify(body, signature).map_err(|e| {
                tracing::warn!(error = %e, "Rejected webhook delivery");
                WebhookHandlingError::Rejected(e)
            })?;
        }

        // 2. Parse and classify
        let event = match WebhookEvent::parse(body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed webhook body");
                return Ok(WebhookOutcome::ignored(e.to_string()));
            }
        };
        let kind = event.kind();
        if let EventKind::Unknown(event_type) = &kind {
            tracing::info!(event_type = %event_type, "Unhandled webhook event type");
            return Ok(WebhookOutcome::ignored(format!("unhandled event type {}", event_type)));
        }
        let external_user_id = match event.external_user_id() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    event_type = %event.event_type,
                    error = %e,
                    "Webhook without user id"
                );
                return Ok(WebhookOutcome::ignored(e.to_string()));
            }
        };

        tracing::info!(
            event_type = %event.event_type,
            external_user_id = %external_user_id,
            "Processing webhook event"
        );

        // 3. Every identified user gets a record, whatever the event does next
        self.store.upsert(&external_user_id, SubscriberPatch::default()).await?;

        // 4. Dispatch
        let outcome = match kind {
            EventKind::SubscriptionCreated | EventKind::SubscriptionUpdated => {
                self.on_subscription_changed(&event, &external_user_id).await?
            }
            EventKind::SubscriptionCanceled | EventKind::SubscriptionExpired => {
                self.on_subscription_ended(&external_user_id).await?
            }
            EventKind::UserUpdated => self.on_user_updated(&external_user_id).await?,
            EventKind::Unknown(_) => WebhookOutcome::ignored("unhandled event type"),
        };

        tracing::info!(
            event_type = %event.event_type,
            external_user_id = %external_user_id,
            outcome = outcome.as_str(),
            "Webhook event handled"
        );
        Ok(outcome)
    }

    async fn on_subscription_changed(
        &self,
        event: &WebhookEvent,
        external_user_id: &ExternalUserId,
    ) -> Result<WebhookOutcome, WebhookHandlingError> {
        self.resolver.ensure_linked(external_user_id).await?;

        let result = match self.engine.reconcile(external_user_id).await {
            Ok(result) => result,
            Err(e) => return deferred(external_user_id, e),
        };

        if result.status == ReconciliationStatus::PendingLink {
            self.record_payload_subscription(event, external_user_id).await?;
            return Ok(WebhookOutcome::Deferred {
                reason: "chat identity not linked".to_string(),
            });
        }
        Ok(WebhookOutcome::Reconciled { status: result.status })
    }

    async fn on_subscription_ended(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<WebhookOutcome, WebhookHandlingError> {
        self.store.clear_subscription(external_user_id).await?;

        match self.engine.revoke(external_user_id, None).await {
            Ok(result) => Ok(WebhookOutcome::Revoked { status: result.status }),
            Err(e) => deferred(external_user_id, e),
        }
    }

    async fn on_user_updated(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<WebhookOutcome, WebhookHandlingError> {
        self.resolver.refresh(external_user_id).await?;

        let has_subscription = self
            .store
            .get_by_external_id(external_user_id)
            .await?
            .map(|s| s.has_active_subscription())
            .unwrap_or(false);
        if !has_subscription {
            return Ok(WebhookOutcome::ignored("no active subscription"));
        }

        match self.engine.reconcile(external_user_id).await {
            Ok(result) => Ok(WebhookOutcome::Reconciled { status: result.status }),
            Err(e) => deferred(external_user_id, e),
        }
    }

    /// Stores the event's subscription so a later link can grant access.
    async fn record_payload_subscription(
        &self,
        event: &WebhookEvent,
        external_user_id: &ExternalUserId,
    ) -> Result<(), DomainError> {
        let Some(payload) = event.subscription().filter(|s| s.status.is_active()) else {
            return Ok(());
        };
        let Some(expires_at) = payload.expires_at else {
            tracing::debug!(
                external_user_id = %external_user_id,
                "Payload subscription has no expiry, not recorded"
            );
            return Ok(());
        };
        let tier_level = payload
            .product_id
            .as_ref()
            .and_then(|id| self.catalog.lookup_by_external_product_id(id))
            .and_then(|product| product.tier_level);

        self.store
            .upsert(
                external_user_id,
                SubscriberPatch::subscription(SubscriptionUpdate {
                    subscription_id: payload.subscription_id,
                    status: payload.status,
                    expires_at,
                    tier_level,
                }),
            )
            .await?;
        tracing::info!(
            external_user_id = %external_user_id,
            "Recorded subscription pending chat link"
        );
        Ok(())
    }
}

/// Upstream outages defer the event; store failures propagate.
fn deferred(
    external_user_id: &ExternalUserId,
    err: ReconciliationError,
) -> Result<WebhookOutcome, WebhookHandlingError> {
    match err {
        ReconciliationError::UpstreamUnavailable(e) => {
            tracing::error!(
                external_user_id = %external_user_id,
                error = %e,
                "Upstream unavailable, event deferred"
            );
            Ok(WebhookOutcome::Deferred { reason: e.to_string() })
        }
        ReconciliationError::Store(e) => Err(WebhookHandlingError::Store(e)),
    }
}
