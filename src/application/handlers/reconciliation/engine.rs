//! ReconciliationEngine - converges live chat access to commerce state.
//!
//! Every pass re-reads commerce subscriptions and live member state, so
//! concurrent or repeated passes for the same subscriber converge without
//! coordination. Grants are additive; only `revoke` removes access.

use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::catalog::{Product, ProductCatalog};
use crate::domain::foundation::{ChannelId, ChatUserId, ExternalUserId, ProductId};
use crate::domain::subscriber::{Subscriber, SubscriberPatch, SubscriptionUpdate};
use crate::domain::tiers::{compute_tiers, CommunityTier};
use crate::ports::{
    AccessGateway, CommerceGateway, CommerceSubscription, GatewayError, MemberSnapshot,
    SubscriberStore,
};

use super::result::status_from;
use super::{
    AccessItem, GrantSource, ItemResult, ReconciliationError, ReconciliationResult,
    ReconciliationStatus, RevocationResult, StepOutcome,
};

/// Core orchestrator for grants and revocations.
pub struct ReconciliationEngine {
    catalog: Arc<ProductCatalog>,
    store: Arc<dyn SubscriberStore>,
    commerce: Arc<dyn CommerceGateway>,
    access: Arc<dyn AccessGateway>,
    call_timeout: Duration,
}

/// An active subscription resolved against the catalog.
struct ResolvedSubscription<'a> {
    subscription: CommerceSubscription,
    product: &'a Product,
}

impl ReconciliationEngine {
    pub fn new(
        catalog: Arc<ProductCatalog>,
        store: Arc<dyn SubscriberStore>,
        commerce: Arc<dyn CommerceGateway>,
        access: Arc<dyn AccessGateway>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            store,
            commerce,
            access,
            call_timeout,
        }
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Converges the subscriber's chat access to their active subscriptions
    /// and metric-derived tiers.
    pub async fn reconcile(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<ReconciliationResult, ReconciliationError> {
        // 1. Subscriber and chat identity
        let linked = self.linked_subscriber(external_user_id).await?;
        let Some((subscriber, chat_user_id)) = linked else {
            tracing::info!(
                external_user_id = %external_user_id,
                "No chat identity linked, reconciliation pending"
            );
            return Ok(ReconciliationResult::without_access(
                external_user_id.clone(),
                None,
                ReconciliationStatus::PendingLink,
            ));
        };

        // 2. Live commerce subscriptions
        let subscriptions = self
            .call(self.commerce.active_subscriptions(external_user_id))
            .await?;

        // 3. Resolve via catalog
        let mut resolved = Vec::new();
        let mut skipped_products = Vec::new();
        for subscription in subscriptions {
            match self.catalog.lookup_by_external_product_id(&subscription.product_id) {
                Some(product) => resolved.push(ResolvedSubscription { subscription, product }),
                None => {
                    tracing::warn!(
                        external_user_id = %external_user_id,
                        product_id = %subscription.product_id,
                        "Active subscription for unknown product, skipping"
                    );
                    skipped_products.push(subscription.product_id);
                }
            }
        }

        // 4. Derived grant set
        let highest_level = resolved
            .iter()
            .filter_map(|r| r.product.tier_level)
            .max_by_key(|level| level.rank());
        let tiers = match highest_level {
            Some(level) => compute_tiers(&subscriber.metrics, Some(level)),
            None => BTreeSet::new(),
        };
        let items = self.grant_set(&resolved, &tiers);

        // 5-6. Diff against live state and converge
        let channels = channels_of(&items);
        let snapshot = self
            .call(self.access.get_member(&chat_user_id, &channels))
            .await?;

        let (status, item_results) = match snapshot {
            None => {
                tracing::warn!(
                    external_user_id = %external_user_id,
                    chat_user_id = %chat_user_id,
                    "Chat member not found in community"
                );
                (ReconciliationStatus::MemberNotFound, Vec::new())
            }
            Some(mut snapshot) => {
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    results.push(self.grant_item(&chat_user_id, item, &mut snapshot).await);
                }
                (status_from(&results), results)
            }
        };

        // 7. Record the primary subscription
        if let Some(update) = primary_subscription(&resolved) {
            self.store
                .upsert(external_user_id, SubscriberPatch::subscription(update))
                .await?;
        }

        let result = ReconciliationResult {
            external_user_id: external_user_id.clone(),
            chat_user_id: Some(chat_user_id),
            status,
            items: item_results,
            skipped_products,
            tiers,
        };

        tracing::info!(
            external_user_id = %external_user_id,
            status = %result.status,
            grants = result.grants_issued(),
            failures = result.failures(),
            skipped = result.skipped_products.len(),
            "Reconciliation finished"
        );
        Ok(result)
    }

    /// Removes access. With `product_id`, only that product's role and
    /// channel; otherwise every catalog product and tier grant the member holds.
    pub async fn revoke(
        &self,
        external_user_id: &ExternalUserId,
        product_id: Option<&ProductId>,
    ) -> Result<RevocationResult, ReconciliationError> {
        let Some((_, chat_user_id)) = self.linked_subscriber(external_user_id).await? else {
            tracing::info!(
                external_user_id = %external_user_id,
                "No chat identity linked, nothing to revoke"
            );
            return Ok(RevocationResult::without_access(
                external_user_id.clone(),
                None,
                ReconciliationStatus::PendingLink,
            ));
        };

        let mut skipped_products = Vec::new();
        let candidates: Vec<AccessItem> = match product_id {
            Some(product_id) => match self.catalog.lookup_by_external_product_id(product_id) {
                Some(product) => vec![product_item(product)],
                None => {
                    tracing::warn!(product_id = %product_id, "Revocation for unknown product");
                    skipped_products.push(product_id.clone());
                    Vec::new()
                }
            },
            None => self
                .catalog
                .products()
                .iter()
                .map(product_item)
                .chain(self.catalog.tier_grants().into_iter().map(|grant| AccessItem {
                    source: GrantSource::Tier(grant.tier),
                    role_id: grant.access_role_id.clone(),
                    channel_id: grant.channel_id.clone(),
                }))
                .collect(),
        };

        let channels = channels_of(&candidates);
        let Some(mut snapshot) = self
            .call(self.access.get_member(&chat_user_id, &channels))
            .await?
        else {
            return Ok(RevocationResult {
                skipped_products,
                ..RevocationResult::without_access(
                    external_user_id.clone(),
                    Some(chat_user_id),
                    ReconciliationStatus::MemberNotFound,
                )
            });
        };

        let mut items = Vec::new();
        for item in candidates {
            if let Some(result) = self.revoke_item(&chat_user_id, item, &mut snapshot).await {
                items.push(result);
            }
        }

        let result = RevocationResult {
            external_user_id: external_user_id.clone(),
            chat_user_id: Some(chat_user_id),
            status: status_from(&items),
            items,
            skipped_products,
        };

        tracing::info!(
            external_user_id = %external_user_id,
            status = %result.status,
            revocations = result.revocations(),
            failures = result.failures(),
            "Revocation finished"
        );
        Ok(result)
    }

    /// Loads the subscriber, returning it only if a chat identity is linked.
    async fn linked_subscriber(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<(Subscriber, ChatUserId)>, ReconciliationError> {
        let subscriber = self.store.get_by_external_id(external_user_id).await?;
        Ok(subscriber.and_then(|s| {
            let chat_user_id = s.chat_user_id.clone()?;
            Some((s, chat_user_id))
        }))
    }

    /// Product pairs, then tier grants, without duplicate roles.
    fn grant_set(
        &self,
        resolved: &[ResolvedSubscription<'_>],
        tiers: &BTreeSet<CommunityTier>,
    ) -> Vec<AccessItem> {
        let mut seen_roles = HashSet::new();
        let mut items = Vec::new();

        for r in resolved {
            if seen_roles.insert(r.product.access_role_id.clone()) {
                items.push(product_item(r.product));
            }
        }

        for tier in tiers {
            match self.catalog.tier_grant(*tier) {
                Some(grant) => {
                    if seen_roles.insert(grant.access_role_id.clone()) {
                        items.push(AccessItem {
                            source: GrantSource::Tier(*tier),
                            role_id: grant.access_role_id.clone(),
                            channel_id: grant.channel_id.clone(),
                        });
                    }
                }
                None => tracing::warn!(tier = %tier, "No grant configured for tier, skipping"),
            }
        }
        items
    }

    async fn grant_item(
        &self,
        user: &ChatUserId,
        item: AccessItem,
        snapshot: &mut MemberSnapshot,
    ) -> ItemResult {
        let role = if snapshot.has_role(&item.role_id) {
            StepOutcome::AlreadyHeld
        } else {
            match self.call(self.access.grant_role(user, &item.role_id)).await {
                Ok(()) => {
                    snapshot.roles.insert(item.role_id.clone());
                    tracing::info!(
                        chat_user_id = %user,
                        role_id = %item.role_id,
                        source = %item.source,
                        "Granted role"
                    );
                    StepOutcome::Granted
                }
                Err(e) => {
                    tracing::warn!(
                        chat_user_id = %user,
                        role_id = %item.role_id,
                        error = %e,
                        "Failed to grant role"
                    );
                    StepOutcome::Failed { reason: e.to_string() }
                }
            }
        };

        let channel = match (&item.channel_id, role.is_failure()) {
            (None, _) | (Some(_), true) => None,
            (Some(channel_id), false) => Some(if snapshot.can_view(channel_id) {
                StepOutcome::AlreadyHeld
            } else {
                match self.call(self.access.grant_channel_view(user, channel_id)).await {
                    Ok(()) => {
                        snapshot.visible_channels.insert(channel_id.clone());
                        StepOutcome::Granted
                    }
                    Err(e) => {
                        tracing::warn!(
                            chat_user_id = %user,
                            channel_id = %channel_id,
                            error = %e,
                            "Failed to grant channel view"
                        );
                        StepOutcome::Failed { reason: e.to_string() }
                    }
                }
            }),
        };

        ItemResult { item, role, channel }
    }

    /// Revokes what the member holds of `item`; `None` when nothing is held.
    async fn revoke_item(
        &self,
        user: &ChatUserId,
        item: AccessItem,
        snapshot: &mut MemberSnapshot,
    ) -> Option<ItemResult> {
        let holds_role = snapshot.has_role(&item.role_id);
        let sees_channel = item
            .channel_id
            .as_ref()
            .map(|c| snapshot.can_view(c))
            .unwrap_or(false);
        if !holds_role && !sees_channel {
            return None;
        }

        let role = if holds_role {
            match self.call(self.access.revoke_role(user, &item.role_id)).await {
                Ok(()) => {
                    snapshot.roles.remove(&item.role_id);
                    tracing::info!(
                        chat_user_id = %user,
                        role_id = %item.role_id,
                        source = %item.source,
                        "Revoked role"
                    );
                    StepOutcome::Revoked
                }
                Err(e) => {
                    tracing::warn!(
                        chat_user_id = %user,
                        role_id = %item.role_id,
                        error = %e,
                        "Failed to revoke role"
                    );
                    StepOutcome::Failed { reason: e.to_string() }
                }
            }
        } else {
            StepOutcome::NotHeld
        };

        let channel = match (&item.channel_id, role.is_failure()) {
            (None, _) | (Some(_), true) => None,
            (Some(_), false) if !sees_channel => Some(StepOutcome::NotHeld),
            (Some(channel_id), false) => Some(
                match self.call(self.access.revoke_channel_view(user, channel_id)).await {
                    Ok(()) => {
                        snapshot.visible_channels.remove(channel_id);
                        StepOutcome::Revoked
                    }
                    Err(e) => {
                        tracing::warn!(
                            chat_user_id = %user,
                            channel_id = %channel_id,
                            error = %e,
                            "Failed to revoke channel view"
                        );
                        StepOutcome::Failed { reason: e.to_string() }
                    }
                },
            ),
        };

        Some(ItemResult { item, role, channel })
    }

    /// Awaits an external call under the configured deadline.
    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .unwrap_or(Err(GatewayError::Timeout(self.call_timeout)))
    }
}

fn product_item(product: &Product) -> AccessItem {
    AccessItem {
        source: GrantSource::Product(product.external_product_id.clone()),
        role_id: product.access_role_id.clone(),
        channel_id: product.channel_id.clone(),
    }
}

fn channels_of(items: &[AccessItem]) -> Vec<ChannelId> {
    let mut channels: Vec<ChannelId> = items.iter().filter_map(|i| i.channel_id.clone()).collect();
    channels.sort();
    channels.dedup();
    channels
}

/// The subscription recorded on the subscriber: the highest-level
/// subscription-tier product, else the latest-expiring catalogued one.
/// Subscriptions without an expiry cannot satisfy the record invariant
/// and are not recorded.
fn primary_subscription(resolved: &[ResolvedSubscription<'_>]) -> Option<SubscriptionUpdate> {
    let with_expiry = || resolved.iter().filter(|r| r.subscription.expires_at.is_some());

    let chosen = with_expiry()
        .filter(|r| r.product.is_subscription_tier())
        .max_by_key(|r| (r.product.tier_level.map(|l| l.rank()), r.subscription.expires_at))
        .or_else(|| with_expiry().max_by_key(|r| r.subscription.expires_at))?;

    Some(SubscriptionUpdate {
        subscription_id: chosen.subscription.subscription_id.clone(),
        status: chosen.subscription.status,
        expires_at: chosen.subscription.expires_at?,
        tier_level: chosen.product.tier_level,
    })
}
