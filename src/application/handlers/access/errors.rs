//! Errors for the subscriber access command handlers.

use thiserror::Error;

use crate::application::handlers::reconciliation::ReconciliationError;
use crate::domain::foundation::{DomainError, ErrorCode, ExternalUserId, ValidationError};

#[derive(Debug, Error)]
pub enum AccessCommandError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Subscriber not found: {0}")]
    NotFound(ExternalUserId),

    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),

    #[error("Store error: {0}")]
    Store(#[from] DomainError),
}

impl AccessCommandError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AccessCommandError::Validation(_) => ErrorCode::ValidationFailed,
            AccessCommandError::NotFound(_) => ErrorCode::SubscriberNotFound,
            AccessCommandError::Reconciliation(e) => e.code(),
            AccessCommandError::Store(e) => e.code,
        }
    }
}
