//! SyncSubscriberHandler - on-demand full reconciliation.

use std::sync::Arc;

use crate::application::handlers::reconciliation::{ReconciliationEngine, ReconciliationResult};
use crate::domain::foundation::ExternalUserId;

use super::{AccessCommandError, ChatIdentityResolver};

#[derive(Debug, Clone)]
pub struct SyncSubscriberCommand {
    pub external_user_id: ExternalUserId,
}

/// Resolves a missing chat link from the commerce profile, then reconciles.
pub struct SyncSubscriberHandler {
    resolver: Arc<ChatIdentityResolver>,
    engine: Arc<ReconciliationEngine>,
}

impl SyncSubscriberHandler {
    pub fn new(resolver: Arc<ChatIdentityResolver>, engine: Arc<ReconciliationEngine>) -> Self {
        Self { resolver, engine }
    }

    pub async fn handle(
        &self,
        cmd: SyncSubscriberCommand,
    ) -> Result<ReconciliationResult, AccessCommandError> {
        self.resolver.ensure_linked(&cmd.external_user_id).await?;
        Ok(self.engine.reconcile(&cmd.external_user_id).await?)
    }
}
