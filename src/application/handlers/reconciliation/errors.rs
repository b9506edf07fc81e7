//! Reconciliation errors.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::GatewayError;

/// Failures that abort a whole reconciliation or revocation pass.
///
/// Item-level failures are not errors; they are folded into the result.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// Commerce subscriptions or live member state could not be read.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] GatewayError),

    /// Subscriber store failed.
    #[error("Store error: {0}")]
    Store(#[from] DomainError),
}

impl ReconciliationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ReconciliationError::UpstreamUnavailable(_) => ErrorCode::UpstreamUnavailable,
            ReconciliationError::Store(err) => err.code,
        }
    }
}
