//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `podia` - Commerce platform reads (`CommerceGateway`)
//! - `discord` - Chat platform role and channel mutations (`AccessGateway`)
//! - `storage` - In-memory `SubscriberStore`
//! - `postgres` - PostgreSQL `SubscriberStore`
//! - `http` - Axum REST API

pub mod discord;
pub mod http;
pub mod podia;
pub mod postgres;
pub mod storage;

pub use discord::{DiscordAccessGateway, DiscordConfig};
pub use podia::{PodiaCommerceGateway, PodiaConfig};
pub use postgres::PostgresSubscriberStore;
pub use storage::InMemorySubscriberStore;
