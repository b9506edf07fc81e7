//! Subscriber store port.
//!
//! Keyed persistence of subscriber records. Implementations merge patches
//! field by field so metric updates and subscription updates issued
//! concurrently never overwrite each other.

use async_trait::async_trait;

use crate::domain::foundation::{ChatUserId, DomainError, ExternalUserId, Timestamp};
use crate::domain::subscriber::{Subscriber, SubscriberPatch};

/// Repository port for subscriber records.
///
/// Not-found is a normal result (`None`), never an error. Errors are
/// reserved for storage failures (`DatabaseError`).
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Creates the record if absent, then merges `patch` into it.
    ///
    /// `updated_at` always advances. Returns the stored record.
    async fn upsert(
        &self,
        external_user_id: &ExternalUserId,
        patch: SubscriberPatch,
    ) -> Result<Subscriber, DomainError>;

    async fn get_by_external_id(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<Subscriber>, DomainError>;

    async fn get_by_chat_id(
        &self,
        chat_user_id: &ChatUserId,
    ) -> Result<Option<Subscriber>, DomainError>;

    /// Records with an active subscription whose `expires_at` is before `now`.
    async fn list_expired(&self, now: Timestamp) -> Result<Vec<Subscriber>, DomainError>;

    /// Clears subscription fields, keeping metrics and identity links.
    ///
    /// Returns `None` if no such record exists.
    async fn clear_subscription(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<Subscriber>, DomainError>;

    /// Links a chat identity, creating the record if absent.
    ///
    /// A chat identity belongs to at most one record; any previous owner
    /// is unlinked (last link wins).
    async fn link_chat_identity(
        &self,
        external_user_id: &ExternalUserId,
        chat_user_id: &ChatUserId,
    ) -> Result<Subscriber, DomainError>;
}
