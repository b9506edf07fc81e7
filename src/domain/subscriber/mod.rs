//! Subscriber domain module.
//!
//! The subscriber record joins a commerce identity with a chat identity,
//! the current subscription and performance metrics.

mod status;
mod subscriber;

pub use status::SubscriptionStatus;
pub use subscriber::{Subscriber, SubscriberPatch, SubscriptionUpdate};
