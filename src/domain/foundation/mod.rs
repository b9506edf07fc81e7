//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the reconciliation domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ChannelId, ChatUserId, ExternalUserId, ProductId, RoleId, SubscriptionId};
pub use timestamp::Timestamp;
