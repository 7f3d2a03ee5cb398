//! Consistent-hash ring over active cluster members.
//!
//! Each active member is placed on the ring at `vnodes` points derived from
//! `blake3(identity#i)`. A key is owned by the first point at or after
//! `blake3(key)`, wrapping around. The ring hash is independent of the
//! workflow-ID shard hash: shards are placed on the ring by their decimal ID.
//!
//! Membership updates build a new ring and swap it in atomically, so lookups
//! never block and always see a complete ring.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::debug;

use super::traits::{MembershipError, MembershipResolver};
use super::types::{HostInfo, MemberInfo, MembersView};

/// Default number of virtual nodes per member.
pub const DEFAULT_VNODES: u32 = 64;

// ---------------------------------------------------------------------------
// Ring
// ---------------------------------------------------------------------------

/// Immutable ring snapshot.
#[derive(Debug, Default)]
struct Ring {
    /// `(point, index into hosts)`, sorted by point.
    points: Vec<(u64, usize)>,
    hosts: Vec<HostInfo>,
    members: Vec<MemberInfo>,
}

impl Ring {
    fn build(view: &MembersView, vnodes: u32) -> Self {
        let active = view.active_members();
        let mut points = Vec::with_capacity(active.len() * vnodes as usize);
        let mut hosts = Vec::with_capacity(active.len());

        for (idx, member) in active.iter().enumerate() {
            hosts.push(member.host_info());
            for i in 0..vnodes {
                points.push((ring_hash(&format!("{}#{i}", member.identity)), idx));
            }
        }
        points.sort_unstable();

        Self {
            points,
            hosts,
            members: view.members.clone(),
        }
    }

    fn lookup(&self, key: &str) -> Option<&HostInfo> {
        if self.points.is_empty() {
            return None;
        }
        let h = ring_hash(key);
        let pos = self.points.partition_point(|(p, _)| *p < h);
        let (_, idx) = self.points[pos % self.points.len()];
        self.hosts.get(idx)
    }
}

fn ring_hash(key: &str) -> u64 {
    let digest = blake3::hash(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}

// ---------------------------------------------------------------------------
// RingResolver
// ---------------------------------------------------------------------------

/// [`MembershipResolver`] backed by a consistent-hash ring.
pub struct RingResolver {
    ring: ArcSwap<Ring>,
    vnodes: u32,
    version: watch::Sender<u64>,
}

impl RingResolver {
    /// Builds a resolver from an initial membership view.
    #[must_use]
    pub fn new(view: &MembersView, vnodes: u32) -> Self {
        let vnodes = vnodes.max(1);
        let (version, _rx) = watch::channel(view.version);
        Self {
            ring: ArcSwap::from_pointee(Ring::build(view, vnodes)),
            vnodes,
            version,
        }
    }

    /// Replaces the ring with one built from `view` and notifies subscribers.
    pub fn update(&self, view: &MembersView) {
        let ring = Ring::build(view, self.vnodes);
        debug!(
            version = view.version,
            active = ring.hosts.len(),
            "membership ring updated"
        );
        self.ring.store(Arc::new(ring));
        self.version.send_replace(view.version);
    }

    /// Number of active hosts on the ring.
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.ring.load().hosts.len()
    }
}

impl MembershipResolver for RingResolver {
    fn lookup(&self, key: &str) -> Result<HostInfo, MembershipError> {
        self.ring
            .load()
            .lookup(key)
            .cloned()
            .ok_or(MembershipError::NoMembers)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn members(&self) -> Vec<MemberInfo> {
        self.ring.load().members.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::cluster::types::NodeState;

    fn view(version: u64, ids: &[&str]) -> MembersView {
        MembersView::new(
            version,
            ids.iter()
                .map(|id| MemberInfo::active(*id, format!("{id}:7934")))
                .collect(),
        )
    }

    #[test]
    fn empty_ring_has_no_members() {
        let resolver = RingResolver::new(&MembersView::default(), DEFAULT_VNODES);
        assert_eq!(resolver.lookup("0"), Err(MembershipError::NoMembers));
    }

    #[test]
    fn single_member_owns_everything() {
        let resolver = RingResolver::new(&view(1, &["a"]), DEFAULT_VNODES);
        for shard in 0..32 {
            let owner = resolver.lookup(&shard.to_string()).unwrap();
            assert_eq!(owner.identity, "a");
            assert_eq!(owner.address, "a:7934");
        }
    }

    #[test]
    fn lookup_is_deterministic_across_resolvers() {
        let r1 = RingResolver::new(&view(1, &["a", "b", "c"]), DEFAULT_VNODES);
        let r2 = RingResolver::new(&view(9, &["c", "a", "b"]), DEFAULT_VNODES);
        for shard in 0..64 {
            let key = shard.to_string();
            assert_eq!(r1.lookup(&key).unwrap(), r2.lookup(&key).unwrap());
        }
    }

    #[test]
    fn keys_spread_across_members() {
        let resolver = RingResolver::new(&view(1, &["a", "b", "c"]), DEFAULT_VNODES);
        let mut counts: HashMap<String, usize> = HashMap::new();
        for shard in 0..300 {
            let owner = resolver.lookup(&shard.to_string()).unwrap();
            *counts.entry(owner.identity).or_default() += 1;
        }
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn inactive_members_own_nothing() {
        let mut v = view(1, &["a", "b"]);
        v.members[1].state = NodeState::Leaving;
        let resolver = RingResolver::new(&v, DEFAULT_VNODES);
        assert_eq!(resolver.host_count(), 1);
        for shard in 0..32 {
            assert_eq!(resolver.lookup(&shard.to_string()).unwrap().identity, "a");
        }
        assert_eq!(resolver.members().len(), 2);
    }

    #[test]
    fn removing_a_member_only_moves_its_keys() {
        let resolver = RingResolver::new(&view(1, &["a", "b", "c"]), DEFAULT_VNODES);
        let before: Vec<HostInfo> = (0..200)
            .map(|s| resolver.lookup(&s.to_string()).unwrap())
            .collect();

        resolver.update(&view(2, &["a", "b"]));

        for (shard, old) in before.iter().enumerate() {
            let new = resolver.lookup(&shard.to_string()).unwrap();
            if old.identity != "c" {
                assert_eq!(&new, old);
            }
        }
    }

    #[tokio::test]
    async fn update_notifies_subscribers() {
        let resolver = RingResolver::new(&view(1, &["a"]), DEFAULT_VNODES);
        let mut rx = resolver.subscribe();
        assert_eq!(*rx.borrow_and_update(), 1);

        resolver.update(&view(2, &["a", "b"]));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 2);
        assert_eq!(resolver.host_count(), 2);
    }
}
