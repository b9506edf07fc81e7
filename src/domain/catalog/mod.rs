//! Product catalog domain module.
//!
//! Maps commerce products and community tiers to chat-platform roles and
//! private channels.

mod errors;
mod product;
mod product_catalog;

pub use errors::CatalogError;
pub use product::{Product, ProductCategory, TierGrant};
pub use product_catalog::ProductCatalog;
