//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `tiers` - Metric thresholds and community tiers
//! - `catalog` - Product catalog and tier grants
//! - `subscriber` - Subscriber record and its merge rules
//! - `webhook` - Commerce webhook verification and classification

pub mod catalog;
pub mod foundation;
pub mod subscriber;
pub mod tiers;
pub mod webhook;
