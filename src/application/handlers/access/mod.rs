//! Subscriber access command and query handlers.

mod chat_identity;
mod errors;
mod get_subscriber;
mod link_chat_identity;
mod revoke_access;
mod sync_subscriber;
mod update_metrics;

pub use chat_identity::ChatIdentityResolver;
pub use errors::AccessCommandError;
pub use get_subscriber::{GetSubscriberHandler, GetSubscriberQuery};
pub use link_chat_identity::{
    LinkChatIdentityCommand, LinkChatIdentityHandler, LinkChatIdentityResult,
};
pub use revoke_access::{RevokeAccessCommand, RevokeAccessHandler, RevokeAccessResult};
pub use sync_subscriber::{SyncSubscriberCommand, SyncSubscriberHandler};
pub use update_metrics::{UpdateMetricsCommand, UpdateMetricsHandler, UpdateMetricsResult};
