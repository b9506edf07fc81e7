//! In-Memory Subscriber Store Adapter
//!
//! Keeps subscriber records in process memory. Default store for
//! development and tests; used when no database URL is configured.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{ChatUserId, DomainError, ExternalUserId, Timestamp};
use crate::domain::subscriber::{Subscriber, SubscriberPatch};
use crate::ports::SubscriberStore;

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<ExternalUserId, Subscriber>,
    chat_index: HashMap<ChatUserId, ExternalUserId>,
}

/// In-memory storage for subscriber records.
///
/// Records and the chat-identity index share one lock so a relink is
/// observed atomically.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriberStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly (tests and fixtures).
    pub async fn insert(&self, subscriber: Subscriber) {
        let mut state = self.state.write().await;
        if let Some(chat) = &subscriber.chat_user_id {
            state
                .chat_index
                .insert(chat.clone(), subscriber.external_user_id.clone());
        }
        state
            .records
            .insert(subscriber.external_user_id.clone(), subscriber);
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscriberStore {
    async fn upsert(
        &self,
        external_user_id: &ExternalUserId,
        patch: SubscriberPatch,
    ) -> Result<Subscriber, DomainError> {
        patch.metrics.validate()?;

        let mut state = self.state.write().await;
        let record = state
            .records
            .entry(external_user_id.clone())
            .or_insert_with(|| Subscriber::new(external_user_id.clone(), Timestamp::now()));
        record.apply(&patch);
        Ok(record.clone())
    }

    async fn get_by_external_id(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<Subscriber>, DomainError> {
        Ok(self.state.read().await.records.get(external_user_id).cloned())
    }

    async fn get_by_chat_id(
        &self,
        chat_user_id: &ChatUserId,
    ) -> Result<Option<Subscriber>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .chat_index
            .get(chat_user_id)
            .and_then(|external_id| state.records.get(external_id))
            .cloned())
    }

    async fn list_expired(&self, now: Timestamp) -> Result<Vec<Subscriber>, DomainError> {
        let state = self.state.read().await;
        let mut expired: Vec<Subscriber> = state
            .records
            .values()
            .filter(|record| record.is_expired(&now))
            .cloned()
            .collect();
        expired.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        Ok(expired)
    }

    async fn clear_subscription(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<Subscriber>, DomainError> {
        let mut state = self.state.write().await;
        Ok(state.records.get_mut(external_user_id).map(|record| {
            record.clear_subscription();
            record.clone()
        }))
    }

    async fn link_chat_identity(
        &self,
        external_user_id: &ExternalUserId,
        chat_user_id: &ChatUserId,
    ) -> Result<Subscriber, DomainError> {
        let mut state = self.state.write().await;

        let previous_owner = state.chat_index.get(chat_user_id).cloned();
        if let Some(previous) = previous_owner.filter(|owner| owner != external_user_id) {
            if let Some(record) = state.records.get_mut(&previous) {
                record.unlink_chat();
            }
        }

        let record = state
            .records
            .entry(external_user_id.clone())
            .or_insert_with(|| Subscriber::new(external_user_id.clone(), Timestamp::now()));
        let stale_chat = record.chat_user_id.clone();
        record.link_chat(chat_user_id.clone());
        let linked = record.clone();

        if let Some(stale) = stale_chat.filter(|stale| stale != chat_user_id) {
            state.chat_index.remove(&stale);
        }
        state
            .chat_index
            .insert(chat_user_id.clone(), external_user_id.clone());

        Ok(linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SubscriptionId;
    use crate::domain::subscriber::{SubscriptionStatus, SubscriptionUpdate};
    use crate::domain::tiers::MetricsPatch;

    fn uid(id: &str) -> ExternalUserId {
        ExternalUserId::new(id).unwrap()
    }

    fn chat(id: &str) -> ChatUserId {
        ChatUserId::new(id).unwrap()
    }

    fn subscription(status: SubscriptionStatus, expires_at: Timestamp) -> SubscriberPatch {
        SubscriberPatch::subscription(SubscriptionUpdate {
            subscription_id: SubscriptionId::new("sub-1").unwrap(),
            status,
            expires_at,
            tier_level: None,
        })
    }

    // ══════════════════════════════════════════════════════════════
    // Upsert Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn upsert_creates_missing_record() {
        let store = InMemorySubscriberStore::new();

        let record = store.upsert(&uid("u1"), SubscriberPatch::default()).await.unwrap();

        assert_eq!(record.external_user_id, uid("u1"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn upsert_merges_fields_independently() {
        let store = InMemorySubscriberStore::new();
        let expires = Timestamp::now().add_days(30);

        store
            .upsert(&uid("u1"), subscription(SubscriptionStatus::Active, expires))
            .await
            .unwrap();
        let record = store
            .upsert(
                &uid("u1"),
                SubscriberPatch::metrics(MetricsPatch {
                    rank_score: Some(12_000),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();

        assert_eq!(record.subscription_status, SubscriptionStatus::Active);
        assert_eq!(record.expires_at, Some(expires));
        assert_eq!(record.metrics.rank_score, 12_000);
    }

    #[tokio::test]
    async fn upsert_rejects_negative_earnings() {
        let store = InMemorySubscriberStore::new();
        let result = store
            .upsert(
                &uid("u1"),
                SubscriberPatch::metrics(MetricsPatch {
                    earnings: Some(-10.0),
                    ..Default::default()
                }),
            )
            .await;

        assert!(result.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn upsert_advances_updated_at() {
        let store = InMemorySubscriberStore::new();
        let first = store.upsert(&uid("u1"), SubscriberPatch::default()).await.unwrap();
        let second = store.upsert(&uid("u1"), SubscriberPatch::default()).await.unwrap();

        assert!(second.updated_at.is_after(&first.updated_at));
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn concurrent_metric_and_subscription_updates_both_land() {
        let store = InMemorySubscriberStore::new();
        let expires = Timestamp::now().add_days(1);

        let metrics_store = store.clone();
        let metrics_task = tokio::spawn(async move {
            metrics_store
                .upsert(
                    &uid("u1"),
                    SubscriberPatch::metrics(MetricsPatch {
                        follower_count: Some(75_000),
                        ..Default::default()
                    }),
                )
                .await
        });
        let sub_store = store.clone();
        let sub_task = tokio::spawn(async move {
            sub_store
                .upsert(&uid("u1"), subscription(SubscriptionStatus::Active, expires))
                .await
        });
        metrics_task.await.unwrap().unwrap();
        sub_task.await.unwrap().unwrap();

        let record = store.get_by_external_id(&uid("u1")).await.unwrap().unwrap();
        assert_eq!(record.metrics.follower_count, 75_000);
        assert_eq!(record.subscription_status, SubscriptionStatus::Active);
    }

    // ══════════════════════════════════════════════════════════════
    // Expiry Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn list_expired_returns_only_active_past_expiry() {
        let store = InMemorySubscriberStore::new();
        let now = Timestamp::now();

        store
            .upsert(&uid("expired"), subscription(SubscriptionStatus::Active, now.minus_days(1)))
            .await
            .unwrap();
        store
            .upsert(&uid("current"), subscription(SubscriptionStatus::Active, now.add_days(1)))
            .await
            .unwrap();
        store
            .upsert(&uid("canceled"), subscription(SubscriptionStatus::Canceled, now.minus_days(1)))
            .await
            .unwrap();
        store
            .upsert(&uid("trialing"), subscription(SubscriptionStatus::Trialing, now.minus_days(1)))
            .await
            .unwrap();
        store.upsert(&uid("none"), SubscriberPatch::default()).await.unwrap();

        let expired = store.list_expired(now).await.unwrap();

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].external_user_id, uid("expired"));
    }

    #[tokio::test]
    async fn clear_subscription_keeps_record() {
        let store = InMemorySubscriberStore::new();
        store
            .upsert(
                &uid("u1"),
                subscription(SubscriptionStatus::Active, Timestamp::now().add_days(1)),
            )
            .await
            .unwrap();

        let cleared = store.clear_subscription(&uid("u1")).await.unwrap().unwrap();

        assert_eq!(cleared.subscription_status, SubscriptionStatus::None);
        assert!(store.get_by_external_id(&uid("u1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn clear_subscription_of_unknown_is_none() {
        let store = InMemorySubscriberStore::new();
        assert!(store.clear_subscription(&uid("ghost")).await.unwrap().is_none());
    }

    // ══════════════════════════════════════════════════════════════
    // Chat Link Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn link_then_lookup_by_chat_id() {
        let store = InMemorySubscriberStore::new();
        store.link_chat_identity(&uid("u1"), &chat("c1")).await.unwrap();

        let found = store.get_by_chat_id(&chat("c1")).await.unwrap().unwrap();
        assert_eq!(found.external_user_id, uid("u1"));
    }

    #[tokio::test]
    async fn last_link_wins() {
        let store = InMemorySubscriberStore::new();
        store.link_chat_identity(&uid("u1"), &chat("c1")).await.unwrap();
        store.link_chat_identity(&uid("u2"), &chat("c1")).await.unwrap();

        let owner = store.get_by_chat_id(&chat("c1")).await.unwrap().unwrap();
        assert_eq!(owner.external_user_id, uid("u2"));

        let previous = store.get_by_external_id(&uid("u1")).await.unwrap().unwrap();
        assert!(previous.chat_user_id.is_none());
    }

    #[tokio::test]
    async fn relinking_drops_stale_index_entry() {
        let store = InMemorySubscriberStore::new();
        store.link_chat_identity(&uid("u1"), &chat("c1")).await.unwrap();
        store.link_chat_identity(&uid("u1"), &chat("c2")).await.unwrap();

        assert!(store.get_by_chat_id(&chat("c1")).await.unwrap().is_none());
        assert!(store.get_by_chat_id(&chat("c2")).await.unwrap().is_some());
    }
}
