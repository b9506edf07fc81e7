//! Subscriber aggregate - join of commerce identity, chat identity,
//! current subscription and performance metrics.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::SubscriptionStatus;
use crate::domain::foundation::{ChatUserId, ExternalUserId, SubscriptionId, Timestamp};
use crate::domain::tiers::{compute_tiers, CommunityTier, Metrics, MetricsPatch, TierLevel};

/// Persistent subscriber record, keyed by the commerce user id.
///
/// # Invariants
///
/// - `subscription_status` active or trialing implies `subscription_id` and
///   `expires_at` are both present. Subscription fields only change together
///   through [`SubscriptionUpdate`] or [`Subscriber::clear_subscription`].
/// - `updated_at` strictly advances on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub external_user_id: ExternalUserId,
    pub chat_user_id: Option<ChatUserId>,
    pub email: Option<String>,
    pub metrics: Metrics,
    pub active_tier_level: Option<TierLevel>,
    pub subscription_id: Option<SubscriptionId>,
    pub subscription_status: SubscriptionStatus,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Subscription fields written as a single unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpdate {
    pub subscription_id: SubscriptionId,
    pub status: SubscriptionStatus,
    pub expires_at: Timestamp,
    pub tier_level: Option<TierLevel>,
}

/// Field-level merge for a subscriber. Unset fields keep the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriberPatch {
    pub metrics: MetricsPatch,
    pub email: Option<String>,
    pub subscription: Option<SubscriptionUpdate>,
}

impl SubscriberPatch {
    pub fn metrics(metrics: MetricsPatch) -> Self {
        Self {
            metrics,
            ..Default::default()
        }
    }

    pub fn subscription(update: SubscriptionUpdate) -> Self {
        Self {
            subscription: Some(update),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

impl Subscriber {
    /// Creates an empty record for a first-seen commerce user.
    pub fn new(external_user_id: ExternalUserId, now: Timestamp) -> Self {
        Self {
            external_user_id,
            chat_user_id: None,
            email: None,
            metrics: Metrics::default(),
            active_tier_level: None,
            subscription_id: None,
            subscription_status: SubscriptionStatus::None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the subscriber currently holds an active or trialing subscription.
    pub fn has_active_subscription(&self) -> bool {
        self.subscription_status.is_active()
    }

    /// `active` subscription whose expiry has already passed. Trials are
    /// left to the commerce platform's own lifecycle events.
    pub fn is_expired(&self, now: &Timestamp) -> bool {
        self.subscription_status == SubscriptionStatus::Active
            && self
                .expires_at
                .map(|expires_at| expires_at.is_before(now))
                .unwrap_or(false)
    }

    /// Tiers implied by stored metrics and the recorded tier level.
    pub fn tiers(&self) -> BTreeSet<CommunityTier> {
        compute_tiers(&self.metrics, self.active_tier_level)
    }

    /// Merges `patch` into the record.
    pub fn apply(&mut self, patch: &SubscriberPatch) {
        patch.metrics.apply_to(&mut self.metrics);
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(update) = &patch.subscription {
            self.subscription_id = Some(update.subscription_id.clone());
            self.subscription_status = update.status;
            self.expires_at = Some(update.expires_at);
            self.active_tier_level = update.tier_level;
        }
        self.touch();
    }

    /// Clears subscription fields, keeping metrics and identity links.
    pub fn clear_subscription(&mut self) {
        self.subscription_id = None;
        self.subscription_status = SubscriptionStatus::None;
        self.expires_at = None;
        self.active_tier_level = None;
        self.touch();
    }

    /// Sets the chat identity.
    pub fn link_chat(&mut self, chat_user_id: ChatUserId) {
        self.chat_user_id = Some(chat_user_id);
        self.touch();
    }

    /// Drops the chat identity (another record claimed it).
    pub fn unlink_chat(&mut self) {
        self.chat_user_id = None;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::advanced_past(&self.updated_at);
    }
}
