//! Commerce webhook handling.

mod event_router;

pub use event_router::{EventRouter, WebhookHandlingError, WebhookOutcome};
