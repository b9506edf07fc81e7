//! Structured outcomes of reconciliation and revocation passes.

use std::collections::BTreeSet;
use std::fmt;

use crate::domain::foundation::{ChannelId, ChatUserId, ExternalUserId, ProductId, RoleId};
use crate::domain::tiers::CommunityTier;

/// Overall status of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationStatus {
    /// Every item reached its target state.
    Converged,
    /// At least one item failed; the others were still processed.
    PartialFailure,
    /// Subscriber unknown or has no chat identity; nothing was touched.
    PendingLink,
    /// Chat identity is not a member of the community.
    MemberNotFound,
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Converged => "converged",
            ReconciliationStatus::PartialFailure => "partial_failure",
            ReconciliationStatus::PendingLink => "pending_link",
            ReconciliationStatus::MemberNotFound => "member_not_found",
        }
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an access item is part of the grant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantSource {
    Product(ProductId),
    Tier(CommunityTier),
}

impl fmt::Display for GrantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantSource::Product(id) => write!(f, "product:{}", id),
            GrantSource::Tier(tier) => write!(f, "tier:{}", tier),
        }
    }
}

/// One `{role, channel?}` pair of the derived grant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessItem {
    pub source: GrantSource,
    pub role_id: RoleId,
    pub channel_id: Option<ChannelId>,
}

/// Outcome of one step (role or channel) of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Granted,
    AlreadyHeld,
    Revoked,
    NotHeld,
    Failed { reason: String },
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepOutcome::Granted => "granted",
            StepOutcome::AlreadyHeld => "already_held",
            StepOutcome::Revoked => "revoked",
            StepOutcome::NotHeld => "not_held",
            StepOutcome::Failed { .. } => "failed",
        }
    }
}

/// Per-item outcome. `channel` is `None` when the item has no channel or
/// the channel step was skipped because the role step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub item: AccessItem,
    pub role: StepOutcome,
    pub channel: Option<StepOutcome>,
}

impl ItemResult {
    pub fn is_failure(&self) -> bool {
        self.role.is_failure()
            || self
                .channel
                .as_ref()
                .map(StepOutcome::is_failure)
                .unwrap_or(false)
    }

    fn count(&self, wanted: fn(&StepOutcome) -> bool) -> usize {
        usize::from(wanted(&self.role)) + self.channel.iter().filter(|c| wanted(c)).count()
    }
}

/// Result of `ReconciliationEngine::reconcile`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationResult {
    pub external_user_id: ExternalUserId,
    pub chat_user_id: Option<ChatUserId>,
    pub status: ReconciliationStatus,
    pub items: Vec<ItemResult>,
    /// Active subscriptions whose product is not in the catalog.
    pub skipped_products: Vec<ProductId>,
    /// Community tiers held after this pass.
    pub tiers: BTreeSet<CommunityTier>,
}

impl ReconciliationResult {
    pub(crate) fn without_access(
        external_user_id: ExternalUserId,
        chat_user_id: Option<ChatUserId>,
        status: ReconciliationStatus,
    ) -> Self {
        Self {
            external_user_id,
            chat_user_id,
            status,
            items: Vec::new(),
            skipped_products: Vec::new(),
            tiers: BTreeSet::new(),
        }
    }

    /// Number of grant calls that succeeded (role and channel steps).
    pub fn grants_issued(&self) -> usize {
        self.items
            .iter()
            .map(|item| item.count(|o| matches!(o, StepOutcome::Granted)))
            .sum()
    }

    /// Number of items with a failed step.
    pub fn failures(&self) -> usize {
        self.items.iter().filter(|item| item.is_failure()).count()
    }

    /// Role ids that are held after this pass.
    pub fn held_roles(&self) -> BTreeSet<RoleId> {
        self.items
            .iter()
            .filter(|item| matches!(item.role, StepOutcome::Granted | StepOutcome::AlreadyHeld))
            .map(|item| item.item.role_id.clone())
            .collect()
    }
}

/// Result of `ReconciliationEngine::revoke`.
#[derive(Debug, Clone, PartialEq)]
pub struct RevocationResult {
    pub external_user_id: ExternalUserId,
    pub chat_user_id: Option<ChatUserId>,
    pub status: ReconciliationStatus,
    pub items: Vec<ItemResult>,
    /// Requested product ids not present in the catalog.
    pub skipped_products: Vec<ProductId>,
}

impl RevocationResult {
    pub(crate) fn without_access(
        external_user_id: ExternalUserId,
        chat_user_id: Option<ChatUserId>,
        status: ReconciliationStatus,
    ) -> Self {
        Self {
            external_user_id,
            chat_user_id,
            status,
            items: Vec::new(),
            skipped_products: Vec::new(),
        }
    }

    /// Number of revoke calls that succeeded (role and channel steps).
    pub fn revocations(&self) -> usize {
        self.items
            .iter()
            .map(|item| item.count(|o| matches!(o, StepOutcome::Revoked)))
            .sum()
    }

    pub fn failures(&self) -> usize {
        self.items.iter().filter(|item| item.is_failure()).count()
    }

    /// True when nothing is left to retry.
    pub fn is_complete(&self) -> bool {
        !matches!(self.status, ReconciliationStatus::PartialFailure)
    }
}

/// Overall status from per-item outcomes.
pub(crate) fn status_from(items: &[ItemResult]) -> ReconciliationStatus {
    if items.iter().any(ItemResult::is_failure) {
        ReconciliationStatus::PartialFailure
    } else {
        ReconciliationStatus::Converged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(role: StepOutcome, channel: Option<StepOutcome>) -> ItemResult {
        ItemResult {
            item: AccessItem {
                source: GrantSource::Tier(CommunityTier::Basic),
                role_id: RoleId::new("r").unwrap(),
                channel_id: None,
            },
            role,
            channel,
        }
    }

    #[test]
    fn channel_failure_fails_the_item() {
        let result = item(
            StepOutcome::Granted,
            Some(StepOutcome::Failed {
                reason: "denied".into(),
            }),
        );
        assert!(result.is_failure());
    }

    #[test]
    fn status_reflects_any_failure() {
        let ok = item(StepOutcome::AlreadyHeld, None);
        let failed = item(
            StepOutcome::Failed {
                reason: "timeout".into(),
            },
            None,
        );
        assert_eq!(status_from(&[ok.clone()]), ReconciliationStatus::Converged);
        assert_eq!(status_from(&[ok, failed]), ReconciliationStatus::PartialFailure);
        assert_eq!(status_from(&[]), ReconciliationStatus::Converged);
    }

    #[test]
    fn grants_count_role_and_channel_steps() {
        let result = ReconciliationResult {
            external_user_id: ExternalUserId::new("u").unwrap(),
            chat_user_id: None,
            status: ReconciliationStatus::Converged,
            items: vec![
                item(StepOutcome::Granted, Some(StepOutcome::Granted)),
                item(StepOutcome::AlreadyHeld, Some(StepOutcome::AlreadyHeld)),
            ],
            skipped_products: vec![],
            tiers: BTreeSet::new(),
        };
        assert_eq!(result.grants_issued(), 2);
        assert_eq!(result.failures(), 0);
    }

    #[test]
    fn source_display() {
        assert_eq!(
            GrantSource::Product(ProductId::new("p1").unwrap()).to_string(),
            "product:p1"
        );
        assert_eq!(GrantSource::Tier(CommunityTier::Elite).to_string(), "tier:ELITE");
    }
}
