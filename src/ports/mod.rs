//! Ports - Interfaces for external dependencies.
//!
//! Ports define the contracts the reconciliation core depends on.
//! Adapters provide concrete implementations.
//!
//! # Ports
//!
//! - `SubscriberStore` - Subscriber persistence
//! - `CommerceGateway` - Commerce platform reads
//! - `AccessGateway` - Chat platform role/channel mutations

mod access_gateway;
mod commerce_gateway;
mod gateway_error;
mod subscriber_store;

pub use access_gateway::{AccessGateway, MemberSnapshot};
pub use commerce_gateway::{CommerceGateway, CommerceSubscription, CommerceUser};
pub use gateway_error::GatewayError;
pub use subscriber_store::SubscriberStore;
