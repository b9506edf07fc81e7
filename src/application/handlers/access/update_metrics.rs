//! UpdateMetricsHandler - merges creator metrics and re-derives tier access.

use std::sync::Arc;

use crate::application::handlers::reconciliation::{ReconciliationEngine, ReconciliationResult};
use crate::domain::foundation::ExternalUserId;
use crate::domain::subscriber::{Subscriber, SubscriberPatch};
use crate::domain::tiers::MetricsPatch;
use crate::ports::SubscriberStore;

use super::AccessCommandError;

/// Command to merge metrics into a subscriber record.
#[derive(Debug, Clone)]
pub struct UpdateMetricsCommand {
    pub external_user_id: ExternalUserId,
    pub metrics: MetricsPatch,
}

#[derive(Debug, Clone)]
pub struct UpdateMetricsResult {
    pub subscriber: Subscriber,
    /// Present when the subscriber had an active subscription.
    pub reconciliation: Option<ReconciliationResult>,
}

pub struct UpdateMetricsHandler {
    store: Arc<dyn SubscriberStore>,
    engine: Arc<ReconciliationEngine>,
}

impl UpdateMetricsHandler {
    pub fn new(store: Arc<dyn SubscriberStore>, engine: Arc<ReconciliationEngine>) -> Self {
        Self { store, engine }
    }

    pub async fn handle(
        &self,
        cmd: UpdateMetricsCommand,
    ) -> Result<UpdateMetricsResult, AccessCommandError> {
        cmd.metrics.validate()?;

        let subscriber = self
            .store
            .upsert(&cmd.external_user_id, SubscriberPatch::metrics(cmd.metrics))
            .await?;

        if !subscriber.has_active_subscription() {
            tracing::debug!(
                external_user_id = %cmd.external_user_id,
                "Metrics stored, no active subscription"
            );
            return Ok(UpdateMetricsResult {
                subscriber,
                reconciliation: None,
            });
        }

        let reconciliation = self.engine.reconcile(&cmd.external_user_id).await?;
        Ok(UpdateMetricsResult {
            subscriber,
            reconciliation: Some(reconciliation),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::testing::*;
    use crate::domain::foundation::ErrorCode;

    fn handler(h: &Harness) -> UpdateMetricsHandler {
        UpdateMetricsHandler::new(h.store.clone(), h.engine.clone())
    }

    fn earnings(value: f64) -> MetricsPatch {
        MetricsPatch {
            earnings: Some(value),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn stores_metrics_without_reconciling_inactive_subscriber() {
        let h = Harness::new(&["c1"]);

        let result = handler(&h)
            .handle(UpdateMetricsCommand {
                external_user_id: uid("u1"),
                metrics: earnings(3_000.0),
            })
            .await
            .unwrap();

        assert_eq!(result.subscriber.metrics.earnings, 3_000.0);
        assert!(result.reconciliation.is_none());
        assert_eq!(h.commerce.subscription_fetches(), 0);
    }

    #[tokio::test]
    async fn crossing_a_threshold_grants_the_new_tier() {
        let h = Harness::new(&["c1"]);
        h.linked("u1", "c1").await;
        h.commerce
            .set_subscriptions(&uid("u1"), vec![active_sub("s1", "mc-beginner", 30)]);
        h.engine.reconcile(&uid("u1")).await.unwrap();
        assert!(!h.access.roles_of(&chat("c1")).contains(&role("role-basic")));

        let result = handler(&h)
            .handle(UpdateMetricsCommand {
                external_user_id: uid("u1"),
                metrics: earnings(2_500.0),
            })
            .await
            .unwrap();

        assert!(result.reconciliation.is_some());
        assert!(h.access.roles_of(&chat("c1")).contains(&role("role-basic")));
    }

    #[tokio::test]
    async fn negative_earnings_are_rejected_before_storing() {
        let h = Harness::new(&[]);

        let err = handler(&h)
            .handle(UpdateMetricsCommand {
                external_user_id: uid("u1"),
                metrics: earnings(-5.0),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert!(h.store.is_empty().await);
    }
}
