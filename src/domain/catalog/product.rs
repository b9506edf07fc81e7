//! Catalog product and tier grant definitions.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ChannelId, ProductId, RoleId};
use crate::domain::tiers::{CommunityTier, TierLevel};

/// Kind of purchasable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductCategory {
    /// Recurring membership with a tier level (masterclass levels).
    SubscriptionTier,
    /// Single purchase service (coaching sessions).
    OneOffService,
}

/// Immutable catalog entry mapping a commerce product to chat-platform access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub external_product_id: ProductId,
    pub access_role_id: RoleId,
    pub category: ProductCategory,
    #[serde(default)]
    pub tier_level: Option<TierLevel>,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Product {
    /// Returns true if this is a subscription-tier product.
    pub fn is_subscription_tier(&self) -> bool {
        self.category == ProductCategory::SubscriptionTier
    }

    /// Name for logs, falling back to the product id.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.external_product_id.as_str())
    }
}

/// Role and optional channel granted for a community tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierGrant {
    pub tier: CommunityTier,
    pub access_role_id: RoleId,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
}
