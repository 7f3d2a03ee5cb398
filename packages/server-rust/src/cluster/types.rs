//! Cluster membership types.
//!
//! A history host is a ring member identified by a stable identity and reached
//! at an RPC address. Shard ownership is derived from the set of `Active`
//! members only.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Membership state of a history host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeState {
    Joining,
    Active,
    Leaving,
    Dead,
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// Identity and address of a host, as returned by ring lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
    pub identity: String,
    pub address: String,
}

impl HostInfo {
    #[must_use]
    pub fn new(identity: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            address: address.into(),
        }
    }
}

/// Information about a single cluster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub identity: String,
    pub address: String,
    pub state: NodeState,
    pub join_version: u64,
}

impl MemberInfo {
    /// Creates an `Active` member.
    #[must_use]
    pub fn active(identity: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            address: address.into(),
            state: NodeState::Active,
            join_version: 0,
        }
    }

    #[must_use]
    pub fn host_info(&self) -> HostInfo {
        HostInfo::new(self.identity.clone(), self.address.clone())
    }
}

/// Versioned snapshot of cluster membership.
///
/// The version advances on every membership change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersView {
    pub version: u64,
    pub members: Vec<MemberInfo>,
}

impl MembersView {
    #[must_use]
    pub fn new(version: u64, members: Vec<MemberInfo>) -> Self {
        Self { version, members }
    }

    /// Returns all members with `state == NodeState::Active`.
    pub fn active_members(&self) -> Vec<&MemberInfo> {
        self.members
            .iter()
            .filter(|m| m.state == NodeState::Active)
            .collect()
    }

    /// Finds a member by identity.
    pub fn get_member(&self, identity: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.identity == identity)
    }
}
