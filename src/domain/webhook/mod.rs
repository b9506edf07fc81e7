//! Commerce webhook domain module.
//!
//! Signature verification and classification of inbound events.

mod errors;
mod event;
mod verifier;

pub use errors::WebhookError;
pub use event::{EventKind, PayloadSubscription, WebhookEvent};
pub(crate) use event::{string_at, timestamp_at};
pub use verifier::WebhookVerifier;

#[cfg(test)]
pub(crate) use verifier::sign_payload;
