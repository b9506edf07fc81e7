//! ChatIdentityResolver - links a commerce user to their chat identity
//! using the commerce user profile.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{ChatUserId, DomainError, ExternalUserId};
use crate::domain::subscriber::{Subscriber, SubscriberPatch};
use crate::ports::{CommerceGateway, GatewayError, SubscriberStore};

/// Resolves and stores the chat identity declared on a commerce profile.
///
/// Profile lookups are best effort: an unreachable commerce platform leaves
/// the record as it is and the caller proceeds with what is stored.
pub struct ChatIdentityResolver {
    store: Arc<dyn SubscriberStore>,
    commerce: Arc<dyn CommerceGateway>,
    call_timeout: Duration,
}

impl ChatIdentityResolver {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        commerce: Arc<dyn CommerceGateway>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            commerce,
            call_timeout,
        }
    }

    /// Returns the stored chat identity, consulting the commerce profile
    /// only when none is linked yet.
    pub async fn ensure_linked(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<ChatUserId>, DomainError> {
        let existing = self.store.get_by_external_id(external_user_id).await?;
        if let Some(chat_user_id) = existing.as_ref().and_then(|s| s.chat_user_id.clone()) {
            return Ok(Some(chat_user_id));
        }
        self.refresh_from_profile(external_user_id, existing).await
    }

    /// Re-reads the commerce profile and applies any chat identity or email
    /// it declares, even when a link already exists.
    pub async fn refresh(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<ChatUserId>, DomainError> {
        let existing = self.store.get_by_external_id(external_user_id).await?;
        self.refresh_from_profile(external_user_id, existing).await
    }

    async fn refresh_from_profile(
        &self,
        external_user_id: &ExternalUserId,
        existing: Option<Subscriber>,
    ) -> Result<Option<ChatUserId>, DomainError> {
        let stored_chat = existing.as_ref().and_then(|s| s.chat_user_id.clone());

        let lookup = self.commerce.get_user(external_user_id);
        let profile = match tokio::time::timeout(self.call_timeout, lookup)
            .await
            .unwrap_or(Err(GatewayError::Timeout(self.call_timeout)))
        {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::debug!(external_user_id = %external_user_id, "No commerce profile found");
                return Ok(stored_chat);
            }
            Err(e) => {
                tracing::warn!(
                    external_user_id = %external_user_id,
                    error = %e,
                    "Could not read commerce profile, keeping stored chat identity"
                );
                return Ok(stored_chat);
            }
        };

        if let Some(email) = profile.email {
            let known = existing.as_ref().and_then(|s| s.email.as_deref()) == Some(email.as_str());
            if !known {
                self.store
                    .upsert(external_user_id, SubscriberPatch::default().with_email(email))
                    .await?;
            }
        }

        match profile.chat_user_id {
            Some(chat_user_id) if stored_chat.as_ref() != Some(&chat_user_id) => {
                self.store.link_chat_identity(external_user_id, &chat_user_id).await?;
                tracing::info!(
                    external_user_id = %external_user_id,
                    chat_user_id = %chat_user_id,
                    "Linked chat identity from commerce profile"
                );
                Ok(Some(chat_user_id))
            }
            _ => Ok(stored_chat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::testing::*;
    use crate::ports::CommerceUser;

    fn resolver(h: &Harness) -> ChatIdentityResolver {
        ChatIdentityResolver::new(h.store.clone(), h.commerce.clone(), CALL_TIMEOUT)
    }

    #[tokio::test]
    async fn links_chat_identity_from_profile() {
        let h = Harness::new(&["c9"]);
        h.commerce.set_user(
            &uid("u1"),
            CommerceUser {
                email: Some("fan@example.com".into()),
                chat_user_id: Some(chat("c9")),
            },
        );

        let linked = resolver(&h).ensure_linked(&uid("u1")).await.unwrap();

        assert_eq!(linked, Some(chat("c9")));
        let stored = h.store.get_by_external_id(&uid("u1")).await.unwrap().unwrap();
        assert_eq!(stored.chat_user_id, Some(chat("c9")));
        assert_eq!(stored.email.as_deref(), Some("fan@example.com"));
    }

    #[tokio::test]
    async fn existing_link_skips_profile_lookup() {
        let h = Harness::new(&["c1"]);
        h.linked("u1", "c1").await;
        h.commerce.set_user(
            &uid("u1"),
            CommerceUser {
                email: None,
                chat_user_id: Some(chat("c2")),
            },
        );

        let linked = resolver(&h).ensure_linked(&uid("u1")).await.unwrap();

        assert_eq!(linked, Some(chat("c1")));
    }

    #[tokio::test]
    async fn refresh_replaces_changed_link() {
        let h = Harness::new(&["c1", "c2"]);
        h.linked("u1", "c1").await;
        h.commerce.set_user(
            &uid("u1"),
            CommerceUser {
                email: None,
                chat_user_id: Some(chat("c2")),
            },
        );

        let linked = resolver(&h).refresh(&uid("u1")).await.unwrap();

        assert_eq!(linked, Some(chat("c2")));
        assert!(h.store.get_by_chat_id(&chat("c1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commerce_outage_keeps_stored_state() {
        let h = Harness::new(&[]);
        h.commerce.set_unavailable(true);

        let linked = resolver(&h).ensure_linked(&uid("u1")).await.unwrap();

        assert_eq!(linked, None);
        assert!(h.store.get_by_external_id(&uid("u1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_without_chat_id_leaves_record_unlinked() {
        let h = Harness::new(&[]);
        h.commerce.set_user(&uid("u1"), CommerceUser::default());

        assert_eq!(resolver(&h).ensure_linked(&uid("u1")).await.unwrap(), None);
    }
}
