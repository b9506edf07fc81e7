//! Commerce gateway port.
//!
//! Read-only view of the commerce platform: a user's currently active
//! subscriptions and their profile. Results are never cached.

use async_trait::async_trait;

use super::GatewayError;
use crate::domain::foundation::{ChatUserId, ExternalUserId, ProductId, SubscriptionId, Timestamp};
use crate::domain::subscriber::SubscriptionStatus;

/// A subscription the commerce platform reports as active or trialing.
#[derive(Debug, Clone, PartialEq)]
pub struct CommerceSubscription {
    pub subscription_id: SubscriptionId,
    pub product_id: ProductId,
    pub status: SubscriptionStatus,
    pub expires_at: Option<Timestamp>,
}

/// Commerce user profile fields the reconciler cares about.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommerceUser {
    pub email: Option<String>,
    /// Chat identity declared on the commerce profile, if any.
    pub chat_user_id: Option<ChatUserId>,
}

#[async_trait]
pub trait CommerceGateway: Send + Sync {
    /// Active and trialing subscriptions. Unknown user is an empty list.
    async fn active_subscriptions(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Vec<CommerceSubscription>, GatewayError>;

    /// User profile, `None` when the platform does not know the user.
    async fn get_user(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<CommerceUser>, GatewayError>;
}
