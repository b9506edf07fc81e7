//! Shared fixtures and mock ports for application handler tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::storage::InMemorySubscriberStore;
use crate::domain::catalog::{Product, ProductCatalog, ProductCategory, TierGrant};
use crate::domain::foundation::{
    ChannelId, ChatUserId, ExternalUserId, ProductId, RoleId, SubscriptionId, Timestamp,
};
use crate::domain::subscriber::SubscriptionStatus;
use crate::domain::tiers::{CommunityTier, TierLevel};
use crate::ports::{
    AccessGateway, CommerceGateway, CommerceSubscription, CommerceUser, GatewayError,
    MemberSnapshot,
};

use super::reconciliation::ReconciliationEngine;

pub(crate) const CALL_TIMEOUT: Duration = Duration::from_millis(200);

pub(crate) fn uid(id: &str) -> ExternalUserId {
    ExternalUserId::new(id).unwrap()
}

pub(crate) fn chat(id: &str) -> ChatUserId {
    ChatUserId::new(id).unwrap()
}

pub(crate) fn role(id: &str) -> RoleId {
    RoleId::new(id).unwrap()
}

pub(crate) fn channel(id: &str) -> ChannelId {
    ChannelId::new(id).unwrap()
}

pub(crate) fn pid(id: &str) -> ProductId {
    ProductId::new(id).unwrap()
}

fn product(
    id: &str,
    category: ProductCategory,
    level: Option<TierLevel>,
    with_channel: bool,
) -> Product {
    Product {
        external_product_id: pid(id),
        access_role_id: role(&format!("role-{}", id)),
        category,
        tier_level: level,
        channel_id: with_channel.then(|| channel(&format!("chan-{}", id))),
        name: None,
    }
}

/// Three masterclass levels, two coaching services and grants for every tier.
pub(crate) fn test_catalog() -> Arc<ProductCatalog> {
    let products = vec![
        product("mc-beginner", ProductCategory::SubscriptionTier, Some(TierLevel::Beginner), true),
        product(
            "mc-intermediate",
            ProductCategory::SubscriptionTier,
            Some(TierLevel::Intermediate),
            false,
        ),
        product("mc-advanced", ProductCategory::SubscriptionTier, Some(TierLevel::Advanced), true),
        product("coaching-1", ProductCategory::OneOffService, None, true),
        product("coaching-2", ProductCategory::OneOffService, None, true),
    ];
    let tier_grants = vec![
        TierGrant {
            tier: CommunityTier::Basic,
            access_role_id: role("role-basic"),
            channel_id: Some(channel("chan-basic")),
        },
        TierGrant {
            tier: CommunityTier::Elite,
            access_role_id: role("role-elite"),
            channel_id: Some(channel("chan-elite")),
        },
        TierGrant {
            tier: CommunityTier::Apex,
            access_role_id: role("role-apex"),
            channel_id: None,
        },
    ];
    Arc::new(ProductCatalog::new(products, tier_grants).unwrap())
}

pub(crate) fn active_sub(id: &str, product_id: &str, days: i64) -> CommerceSubscription {
    CommerceSubscription {
        subscription_id: SubscriptionId::new(id).unwrap(),
        product_id: pid(product_id),
        status: SubscriptionStatus::Active,
        expires_at: Some(Timestamp::now().add_days(days)),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Mock Access Gateway
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AccessCall {
    GrantRole(ChatUserId, RoleId),
    RevokeRole(ChatUserId, RoleId),
    GrantChannel(ChatUserId, ChannelId),
    RevokeChannel(ChatUserId, ChannelId),
}

/// Stateful fake: grants and revokes change what `get_member` reports.
#[derive(Default)]
pub(crate) struct MockAccessGateway {
    members: Mutex<HashMap<ChatUserId, MemberSnapshot>>,
    calls: Mutex<Vec<AccessCall>>,
    failing_roles: Mutex<HashSet<RoleId>>,
    failing_channels: Mutex<HashSet<ChannelId>>,
    hanging_roles: Mutex<HashSet<RoleId>>,
    member_lookup_fails: AtomicBool,
    member_lookups: AtomicUsize,
}

impl MockAccessGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_member(self, user: ChatUserId) -> Self {
        self.members.lock().unwrap().insert(user, MemberSnapshot::default());
        self
    }

    pub(crate) fn fail_role(&self, role_id: RoleId) {
        self.failing_roles.lock().unwrap().insert(role_id);
    }

    pub(crate) fn fail_channel(&self, channel_id: ChannelId) {
        self.failing_channels.lock().unwrap().insert(channel_id);
    }

    /// Role grants for `role_id` never complete.
    pub(crate) fn hang_role(&self, role_id: RoleId) {
        self.hanging_roles.lock().unwrap().insert(role_id);
    }

    pub(crate) fn fail_member_lookup(&self) {
        self.member_lookup_fails.store(true, Ordering::SeqCst);
    }

    /// Clears every injected failure.
    pub(crate) fn heal(&self) {
        self.failing_roles.lock().unwrap().clear();
        self.failing_channels.lock().unwrap().clear();
        self.hanging_roles.lock().unwrap().clear();
        self.member_lookup_fails.store(false, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<AccessCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub(crate) fn member_lookups(&self) -> usize {
        self.member_lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn grant_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, AccessCall::GrantRole(..) | AccessCall::GrantChannel(..)))
            .count()
    }

    pub(crate) fn revoke_role_calls(&self) -> Vec<RoleId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                AccessCall::RevokeRole(_, role_id) => Some(role_id),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn roles_of(&self, user: &ChatUserId) -> HashSet<RoleId> {
        self.members
            .lock()
            .unwrap()
            .get(user)
            .map(|m| m.roles.clone())
            .unwrap_or_default()
    }

    pub(crate) fn channels_of(&self, user: &ChatUserId) -> HashSet<ChannelId> {
        self.members
            .lock()
            .unwrap()
            .get(user)
            .map(|m| m.visible_channels.clone())
            .unwrap_or_default()
    }

    /// Seeds a role directly, bypassing call recording.
    pub(crate) fn seed_role(&self, user: &ChatUserId, role_id: RoleId) {
        if let Some(member) = self.members.lock().unwrap().get_mut(user) {
            member.roles.insert(role_id);
        }
    }

    pub(crate) fn seed_channel(&self, user: &ChatUserId, channel_id: ChannelId) {
        if let Some(member) = self.members.lock().unwrap().get_mut(user) {
            member.visible_channels.insert(channel_id);
        }
    }

    fn record(&self, call: AccessCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn rejected() -> GatewayError {
        GatewayError::Rejected {
            status: 403,
            message: "Missing Permissions".to_string(),
        }
    }
}

#[async_trait]
impl AccessGateway for MockAccessGateway {
    async fn get_member(
        &self,
        user: &ChatUserId,
        channels: &[ChannelId],
    ) -> Result<Option<MemberSnapshot>, GatewayError> {
        self.member_lookups.fetch_add(1, Ordering::SeqCst);
        if self.member_lookup_fails.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("simulated outage".to_string()));
        }
        Ok(self.members.lock().unwrap().get(user).map(|member| MemberSnapshot {
            roles: member.roles.clone(),
            visible_channels: member
                .visible_channels
                .iter()
                .filter(|c| channels.contains(c))
                .cloned()
                .collect(),
        }))
    }

    async fn grant_role(&self, user: &ChatUserId, role_id: &RoleId) -> Result<(), GatewayError> {
        self.record(AccessCall::GrantRole(user.clone(), role_id.clone()));
        let hangs = self.hanging_roles.lock().unwrap().contains(role_id);
        if hangs {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing_roles.lock().unwrap().contains(role_id) {
            return Err(Self::rejected());
        }
        self.seed_role(user, role_id.clone());
        Ok(())
    }

    async fn revoke_role(&self, user: &ChatUserId, role_id: &RoleId) -> Result<(), GatewayError> {
        self.record(AccessCall::RevokeRole(user.clone(), role_id.clone()));
        if self.failing_roles.lock().unwrap().contains(role_id) {
            return Err(Self::rejected());
        }
        if let Some(member) = self.members.lock().unwrap().get_mut(user) {
            member.roles.remove(role_id);
        }
        Ok(())
    }

    async fn grant_channel_view(
        &self,
        user: &ChatUserId,
        channel_id: &ChannelId,
    ) -> Result<(), GatewayError> {
        self.record(AccessCall::GrantChannel(user.clone(), channel_id.clone()));
        if self.failing_channels.lock().unwrap().contains(channel_id) {
            return Err(Self::rejected());
        }
        self.seed_channel(user, channel_id.clone());
        Ok(())
    }

    async fn revoke_channel_view(
        &self,
        user: &ChatUserId,
        channel_id: &ChannelId,
    ) -> Result<(), GatewayError> {
        self.record(AccessCall::RevokeChannel(user.clone(), channel_id.clone()));
        if self.failing_channels.lock().unwrap().contains(channel_id) {
            return Err(Self::rejected());
        }
        if let Some(member) = self.members.lock().unwrap().get_mut(user) {
            member.visible_channels.remove(channel_id);
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Mock Commerce Gateway
// ════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub(crate) struct MockCommerceGateway {
    subscriptions: Mutex<HashMap<ExternalUserId, Vec<CommerceSubscription>>>,
    users: Mutex<HashMap<ExternalUserId, CommerceUser>>,
    unavailable: AtomicBool,
    subscription_fetches: AtomicUsize,
}

impl MockCommerceGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_subscriptions(&self, user: &ExternalUserId, subs: Vec<CommerceSubscription>) {
        self.subscriptions.lock().unwrap().insert(user.clone(), subs);
    }

    pub(crate) fn set_user(&self, user: &ExternalUserId, profile: CommerceUser) {
        self.users.lock().unwrap().insert(user.clone(), profile);
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn subscription_fetches(&self) -> usize {
        self.subscription_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommerceGateway for MockCommerceGateway {
    async fn active_subscriptions(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Vec<CommerceSubscription>, GatewayError> {
        self.subscription_fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("simulated outage".to_string()));
        }
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .get(external_user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_user(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<CommerceUser>, GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("simulated outage".to_string()));
        }
        Ok(self.users.lock().unwrap().get(external_user_id).cloned())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Wiring
// ════════════════════════════════════════════════════════════════════════════

pub(crate) struct Harness {
    pub catalog: Arc<ProductCatalog>,
    pub store: Arc<InMemorySubscriberStore>,
    pub commerce: Arc<MockCommerceGateway>,
    pub access: Arc<MockAccessGateway>,
    pub engine: Arc<ReconciliationEngine>,
}

impl Harness {
    /// Engine wired to fresh fakes; `members` are known to the chat platform.
    pub(crate) fn new(members: &[&str]) -> Self {
        let catalog = test_catalog();
        let store = Arc::new(InMemorySubscriberStore::new());
        let commerce = Arc::new(MockCommerceGateway::new());
        let access = Arc::new(members.iter().fold(MockAccessGateway::new(), |gateway, member| {
            gateway.with_member(chat(member))
        }));
        let engine = Arc::new(ReconciliationEngine::new(
            catalog.clone(),
            store.clone(),
            commerce.clone(),
            access.clone(),
            CALL_TIMEOUT,
        ));
        Self {
            catalog,
            store,
            commerce,
            access,
            engine,
        }
    }

    /// Stores a subscriber linked to `chat_id`.
    pub(crate) async fn linked(&self, external_id: &str, chat_id: &str) {
        use crate::ports::SubscriberStore;
        self.store
            .link_chat_identity(&uid(external_id), &chat(chat_id))
            .await
            .unwrap();
    }
}
