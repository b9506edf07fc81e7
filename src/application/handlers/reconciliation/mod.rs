//! Reconciliation handlers.
//!
//! Computes the access grant set for a subscriber and drives the access
//! gateway to it, one item at a time.

mod engine;
mod errors;
mod result;

pub use engine::ReconciliationEngine;
pub use errors::ReconciliationError;
pub use result::{
    AccessItem, GrantSource, ItemResult, ReconciliationResult, ReconciliationStatus,
    RevocationResult, StepOutcome,
};
