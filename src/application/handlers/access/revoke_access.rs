//! RevokeAccessHandler - removes all access and clears the subscription.

use std::sync::Arc;

use crate::application::handlers::reconciliation::{ReconciliationEngine, RevocationResult};
use crate::domain::foundation::ExternalUserId;
use crate::ports::SubscriberStore;

use super::AccessCommandError;

#[derive(Debug, Clone)]
pub struct RevokeAccessCommand {
    pub external_user_id: ExternalUserId,
}

#[derive(Debug, Clone)]
pub struct RevokeAccessResult {
    pub revocation: RevocationResult,
    /// False when a revoke step failed; the subscription stays recorded so
    /// the expiration sweep or a repeated request can finish the job.
    pub subscription_cleared: bool,
}

pub struct RevokeAccessHandler {
    store: Arc<dyn SubscriberStore>,
    engine: Arc<ReconciliationEngine>,
}

impl RevokeAccessHandler {
    pub fn new(store: Arc<dyn SubscriberStore>, engine: Arc<ReconciliationEngine>) -> Self {
        Self { store, engine }
    }

    pub async fn handle(
        &self,
        cmd: RevokeAccessCommand,
    ) -> Result<RevokeAccessResult, AccessCommandError> {
        let revocation = self.engine.revoke(&cmd.external_user_id, None).await?;

        let subscription_cleared = if revocation.is_complete() {
            self.store.clear_subscription(&cmd.external_user_id).await?;
            true
        } else {
            tracing::warn!(
                external_user_id = %cmd.external_user_id,
                failures = revocation.failures(),
                "Revocation incomplete, subscription left in place"
            );
            false
        };

        Ok(RevokeAccessResult {
            revocation,
            subscription_cleared,
        })
    }
}
