//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod access;
pub mod expiration;
pub mod reconciliation;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

pub use access::{
    AccessCommandError, ChatIdentityResolver, GetSubscriberHandler, GetSubscriberQuery,
    LinkChatIdentityCommand, LinkChatIdentityHandler, LinkChatIdentityResult, RevokeAccessCommand,
    RevokeAccessHandler, RevokeAccessResult, SyncSubscriberCommand, SyncSubscriberHandler,
    UpdateMetricsCommand, UpdateMetricsHandler, UpdateMetricsResult,
};
pub use expiration::{ExpirationSweeper, SweepReport, SweeperConfig};
pub use reconciliation::{
    AccessItem, GrantSource, ItemResult, ReconciliationEngine, ReconciliationError,
    ReconciliationResult, ReconciliationStatus, RevocationResult, StepOutcome,
};
pub use webhook::{EventRouter, WebhookHandlingError, WebhookOutcome};
