//! Community tier and declared tier level definitions.

use serde::{Deserialize, Serialize};

/// Cumulative community-access tier derived from performance metrics.
///
/// Variants are declared in ascending order so the derived `Ord` matches
/// tier precedence: holding a tier implies holding every tier below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommunityTier {
    Basic,
    Elite,
    Apex,
}

impl CommunityTier {
    /// All tiers, lowest first.
    pub const ALL: [CommunityTier; 3] =
        [CommunityTier::Basic, CommunityTier::Elite, CommunityTier::Apex];

    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            CommunityTier::Basic => "BASIC",
            CommunityTier::Elite => "ELITE",
            CommunityTier::Apex => "APEX",
        }
    }

    /// Returns every tier at or below this one, lowest first.
    pub fn and_below(self) -> impl Iterator<Item = CommunityTier> {
        Self::ALL.into_iter().filter(move |tier| *tier <= self)
    }
}

impl std::fmt::Display for CommunityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Level of a subscription-tier product (legacy manual tier assignment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl TierLevel {
    /// Returns the numeric rank of this level for comparison.
    ///
    /// Higher rank = higher priority when several subscription-tier products
    /// are active at once.
    pub fn rank(&self) -> u8 {
        match self {
            TierLevel::Beginner => 1,
            TierLevel::Intermediate => 2,
            TierLevel::Advanced => 3,
        }
    }

    /// The community tier this level guarantees regardless of metrics.
    pub fn tier_floor(&self) -> Option<CommunityTier> {
        match self {
            TierLevel::Beginner => None,
            TierLevel::Intermediate => Some(CommunityTier::Basic),
            TierLevel::Advanced => Some(CommunityTier::Elite),
        }
    }

    /// Returns the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TierLevel::Beginner => "beginner",
            TierLevel::Intermediate => "intermediate",
            TierLevel::Advanced => "advanced",
        }
    }

    /// Parses a wire name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "beginner" => Some(TierLevel::Beginner),
            "intermediate" => Some(TierLevel::Intermediate),
            "advanced" => Some(TierLevel::Advanced),
            _ => None,
        }
    }
}
