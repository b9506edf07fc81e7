//! ExpirationSweeper - background job that removes access for subscriptions
//! that ran out without a cancellation webhook.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 1h | Time between sweeps |
//! | `initial_delay` | 60s | Wait before the first sweep |
//!
//! Each record is revoked and then cleared. A record whose revocation was
//! incomplete stays in place and is retried on the next sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use uuid::Uuid;

use crate::application::handlers::reconciliation::ReconciliationEngine;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::SubscriberStore;

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval: Duration,
    pub initial_delay: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            initial_delay: Duration::from_secs(60),
        }
    }
}

impl SweeperConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

/// Counts from one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired records found.
    pub expired: usize,
    /// Revoked and cleared.
    pub cleared: usize,
    /// Left for the next sweep.
    pub failed: usize,
}

pub struct ExpirationSweeper {
    store: Arc<dyn SubscriberStore>,
    engine: Arc<ReconciliationEngine>,
    config: SweeperConfig,
}

impl ExpirationSweeper {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        engine: Arc<ReconciliationEngine>,
        config: SweeperConfig,
    ) -> Self {
        Self { store, engine, config }
    }

    /// Runs sweeps until the shutdown signal flips to `true`.
    ///
    /// Sweeps run inline in this loop, so they never overlap; a tick that
    /// comes due during a slow sweep is skipped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
            _ = time::sleep(self.config.initial_delay) => {}
        }

        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            "Expiration sweeper started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Expiration sweeper stopped");
                        return;
                    }
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once(Timestamp::now()).await {
                        tracing::error!(error = %e, "Expiration sweep failed");
                    }
                }
            }
        }
    }

    /// One sweep over records expired as of `now`.
    ///
    /// Only a failure to list expired records is an error; per-record
    /// failures are logged and counted.
    pub async fn sweep_once(&self, now: Timestamp) -> Result<SweepReport, DomainError> {
        let sweep_id = Uuid::new_v4();
        let expired = self.store.list_expired(now).await?;
        let mut report = SweepReport {
            expired: expired.len(),
            ..Default::default()
        };

        for subscriber in expired {
            let external_user_id = subscriber.external_user_id;

            let revocation = match self.engine.revoke(&external_user_id, None).await {
                Ok(revocation) => revocation,
                Err(e) => {
                    tracing::warn!(
                        %sweep_id,
                        external_user_id = %external_user_id,
                        error = %e,
                        "Revocation failed"
                    );
                    report.failed += 1;
                    continue;
                }
            };
            if !revocation.is_complete() {
                tracing::warn!(
                    %sweep_id,
                    external_user_id = %external_user_id,
                    failures = revocation.failures(),
                    "Revocation incomplete, retrying next sweep"
                );
                report.failed += 1;
                continue;
            }

            match self.store.clear_subscription(&external_user_id).await {
                Ok(_) => report.cleared += 1,
                Err(e) => {
                    tracing::warn!(
                        %sweep_id,
                        external_user_id = %external_user_id,
                        error = %e,
                        "Failed to clear subscription"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.expired > 0 {
            tracing::info!(
                %sweep_id,
                expired = report.expired,
                cleared = report.cleared,
                failed = report.failed,
                "Expiration sweep finished"
            );
        } else {
            tracing::debug!(%sweep_id, "Expiration sweep found nothing");
        }
        Ok(report)
    }
}
