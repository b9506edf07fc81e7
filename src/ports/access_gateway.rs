//! Access gateway port.
//!
//! Grants and revokes roles and private-channel visibility on the chat
//! platform. Every mutation is idempotent on the platform side, but callers
//! still diff against [`MemberSnapshot`] to avoid redundant calls.

use std::collections::HashSet;

use async_trait::async_trait;

use super::GatewayError;
use crate::domain::foundation::{ChannelId, ChatUserId, RoleId};

/// Live access state of a chat member at read time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub roles: HashSet<RoleId>,
    /// Subset of the queried channels the member can currently see.
    pub visible_channels: HashSet<ChannelId>,
}

impl MemberSnapshot {
    pub fn has_role(&self, role_id: &RoleId) -> bool {
        self.roles.contains(role_id)
    }

    pub fn can_view(&self, channel_id: &ChannelId) -> bool {
        self.visible_channels.contains(channel_id)
    }
}

#[async_trait]
pub trait AccessGateway: Send + Sync {
    /// Reads the member's roles and which of `channels` they can view.
    ///
    /// Returns `None` when the user is not a member of the community.
    async fn get_member(
        &self,
        user: &ChatUserId,
        channels: &[ChannelId],
    ) -> Result<Option<MemberSnapshot>, GatewayError>;

    async fn grant_role(&self, user: &ChatUserId, role: &RoleId) -> Result<(), GatewayError>;

    async fn revoke_role(&self, user: &ChatUserId, role: &RoleId) -> Result<(), GatewayError>;

    async fn grant_channel_view(
        &self,
        user: &ChatUserId,
        channel: &ChannelId,
    ) -> Result<(), GatewayError>;

    async fn revoke_channel_view(
        &self,
        user: &ChatUserId,
        channel: &ChannelId,
    ) -> Result<(), GatewayError>;

    /// Whether the gateway has completed its startup handshake.
    fn is_ready(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn AccessGateway) {}
    }

    #[test]
    fn snapshot_queries() {
        let role = RoleId::new("r1").unwrap();
        let channel = ChannelId::new("c1").unwrap();
        let snapshot = MemberSnapshot {
            roles: [role.clone()].into_iter().collect(),
            visible_channels: HashSet::new(),
        };
        assert!(snapshot.has_role(&role));
        assert!(!snapshot.can_view(&channel));
    }
}
