//! Membership resolver contract.
//!
//! The shard controller asks the resolver who owns each shard; the error
//! translator asks it where a moved shard went.

use tokio::sync::watch;

use super::types::{HostInfo, MemberInfo};

// ---------------------------------------------------------------------------
// MembershipError
// ---------------------------------------------------------------------------

/// Errors from membership lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    #[error("no active members in the ring")]
    NoMembers,

    #[error("membership lookup failed: {0}")]
    Lookup(String),
}

// ---------------------------------------------------------------------------
// MembershipResolver
// ---------------------------------------------------------------------------

/// Maps a key to the cluster member currently responsible for it.
pub trait MembershipResolver: Send + Sync {
    /// Returns the owner of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MembershipError::NoMembers`] when the ring is empty, or
    /// [`MembershipError::Lookup`] when the membership source is unavailable.
    fn lookup(&self, key: &str) -> Result<HostInfo, MembershipError>;

    /// Subscribes to ring changes. The value is the membership version and is
    /// bumped on every change.
    fn subscribe(&self) -> watch::Receiver<u64>;

    /// Returns the members the ring was built from.
    fn members(&self) -> Vec<MemberInfo>;
}
