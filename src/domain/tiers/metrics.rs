//! Performance metrics tracked per subscriber.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Performance signals feeding the tier calculator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Competitive ranking score.
    pub rank_score: u64,
    /// Lifetime earnings in whole currency units.
    pub earnings: f64,
    /// Audience size across platforms.
    pub follower_count: u64,
}

impl Metrics {
    pub fn new(rank_score: u64, earnings: f64, follower_count: u64) -> Self {
        Self {
            rank_score,
            earnings,
            follower_count,
        }
    }
}

/// Partial metric update. `None` fields keep their stored value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricsPatch {
    pub rank_score: Option<u64>,
    pub earnings: Option<f64>,
    pub follower_count: Option<u64>,
}

impl MetricsPatch {
    /// Validates that every provided value is a finite, non-negative number.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(earnings) = self.earnings {
            if !earnings.is_finite() || earnings < 0.0 {
                return Err(ValidationError::negative("earnings", earnings));
            }
        }
        Ok(())
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.rank_score.is_none() && self.earnings.is_none() && self.follower_count.is_none()
    }

    /// Applies the set fields onto `metrics`.
    pub fn apply_to(&self, metrics: &mut Metrics) {
        if let Some(rank_score) = self.rank_score {
            metrics.rank_score = rank_score;
        }
        if let Some(earnings) = self.earnings {
            metrics.earnings = earnings;
        }
        if let Some(follower_count) = self.follower_count {
            metrics.follower_count = follower_count;
        }
    }
}
