//! Commerce platform adapter (Podia REST API).
//!
//! Implements `CommerceGateway` over `GET /users/{id}/subscriptions` and
//! `GET /users/{id}` with bearer-token auth.

mod podia_gateway;

pub use podia_gateway::{PodiaCommerceGateway, PodiaConfig};
