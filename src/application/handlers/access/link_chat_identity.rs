//! LinkChatIdentityHandler - associates a chat identity with a commerce user.

use std::sync::Arc;

use crate::application::handlers::reconciliation::{ReconciliationEngine, ReconciliationResult};
use crate::domain::foundation::{ChatUserId, ExternalUserId};
use crate::domain::subscriber::Subscriber;
use crate::ports::SubscriberStore;

use super::AccessCommandError;

#[derive(Debug, Clone)]
pub struct LinkChatIdentityCommand {
    pub external_user_id: ExternalUserId,
    pub chat_user_id: ChatUserId,
}

#[derive(Debug, Clone)]
pub struct LinkChatIdentityResult {
    pub subscriber: Subscriber,
    pub reconciliation: Option<ReconciliationResult>,
}

/// Links the identity, then grants whatever the recorded subscription entitles.
///
/// A chat identity belongs to one subscriber; linking it again moves it.
pub struct LinkChatIdentityHandler {
    store: Arc<dyn SubscriberStore>,
    engine: Arc<ReconciliationEngine>,
}

impl LinkChatIdentityHandler {
    pub fn new(store: Arc<dyn SubscriberStore>, engine: Arc<ReconciliationEngine>) -> Self {
        Self { store, engine }
    }

    pub async fn handle(
        &self,
        cmd: LinkChatIdentityCommand,
    ) -> Result<LinkChatIdentityResult, AccessCommandError> {
        let subscriber = self
            .store
            .link_chat_identity(&cmd.external_user_id, &cmd.chat_user_id)
            .await?;

        tracing::info!(
            external_user_id = %cmd.external_user_id,
            chat_user_id = %cmd.chat_user_id,
            "Chat identity linked"
        );

        let reconciliation = if subscriber.has_active_subscription() {
            Some(self.engine.reconcile(&cmd.external_user_id).await?)
        } else {
            None
        };

        Ok(LinkChatIdentityResult {
            subscriber,
            reconciliation,
        })
    }
}
