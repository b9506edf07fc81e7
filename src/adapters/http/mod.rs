//! HTTP adapters - REST API implementations.

pub mod access;

// Re-export key types for convenience
pub use access::{access_router, app, AppState};
