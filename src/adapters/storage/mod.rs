//! Storage Adapters
//!
//! In-process implementations of the `SubscriberStore` port.
//!
//! ## Available Adapters
//!
//! - **InMemorySubscriberStore** - Keeps subscribers in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::InMemorySubscriberStore;
//!
//! let store: Arc<dyn SubscriberStore> = Arc::new(InMemorySubscriberStore::new());
//! ```

mod in_memory_subscriber_store;

pub use in_memory_subscriber_store::InMemorySubscriberStore;
