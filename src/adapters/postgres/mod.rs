//! PostgreSQL adapters - Database implementations for store ports.
//!
//! - `PostgresSubscriberStore` - Subscriber records keyed by commerce user id

mod subscriber_store;

pub use subscriber_store::PostgresSubscriberStore;
