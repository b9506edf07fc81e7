//! Tier calculator - derives community tiers from metrics.
//!
//! Each tier qualifies when any one of its signals crosses its bar. Tiers
//! are cumulative, and a declared tier level from a subscription-tier
//! product can raise the floor independently of metrics.
//!
//! | Tier  | Rank score | Earnings | Followers |
//! |-------|-----------:|---------:|----------:|
//! | APEX  |          - |   10,000 |   500,000 |
//! | ELITE |     10,000 |    5,000 |   100,000 |
//! | BASIC |      5,000 |    2,500 |    50,000 |

use std::collections::BTreeSet;

use super::{CommunityTier, Metrics, TierLevel};

const APEX_EARNINGS: f64 = 10_000.0;
const APEX_FOLLOWERS: u64 = 500_000;

const ELITE_RANK_SCORE: u64 = 10_000;
const ELITE_EARNINGS: f64 = 5_000.0;
const ELITE_FOLLOWERS: u64 = 100_000;

const BASIC_RANK_SCORE: u64 = 5_000;
const BASIC_EARNINGS: f64 = 2_500.0;
const BASIC_FOLLOWERS: u64 = 50_000;

/// Highest tier the metrics alone qualify for.
pub fn metric_tier(metrics: &Metrics) -> Option<CommunityTier> {
    let apex = metrics.earnings >= APEX_EARNINGS || metrics.follower_count >= APEX_FOLLOWERS;
    let elite = metrics.rank_score >= ELITE_RANK_SCORE
        || metrics.earnings >= ELITE_EARNINGS
        || metrics.follower_count >= ELITE_FOLLOWERS;
    let basic = metrics.rank_score >= BASIC_RANK_SCORE
        || metrics.earnings >= BASIC_EARNINGS
        || metrics.follower_count >= BASIC_FOLLOWERS;

    if apex {
        Some(CommunityTier::Apex)
    } else if elite {
        Some(CommunityTier::Elite)
    } else if basic {
        Some(CommunityTier::Basic)
    } else {
        None
    }
}

/// Computes the full set of tiers held for `metrics` and an optional declared level.
///
/// The result is empty when neither the metrics nor the declared level
/// reach `BASIC`.
pub fn compute_tiers(
    metrics: &Metrics,
    declared_level: Option<TierLevel>,
) -> BTreeSet<CommunityTier> {
    let declared_floor = declared_level.and_then(|level| level.tier_floor());
    match metric_tier(metrics).max(declared_floor) {
        Some(top) => top.and_below().collect(),
        None => BTreeSet::new(),
    }
}
