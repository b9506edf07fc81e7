//! Tiers domain module.
//!
//! Fixed, hard-coded policy mapping performance metrics to cumulative
//! community tiers.
//!
//! # Module Structure
//!
//! - `tier` - CommunityTier and TierLevel
//! - `metrics` - Metrics and partial metric updates
//! - `calculator` - The threshold policy

mod calculator;
mod metrics;
mod tier;

pub use calculator::{compute_tiers, metric_tier};
pub use metrics::{Metrics, MetricsPatch};
pub use tier::{CommunityTier, TierLevel};
