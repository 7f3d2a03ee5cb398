//! Shard assignment for workflow IDs.
//!
//! The history service splits the workflow-ID keyspace into a fixed number of
//! shards. `shard_of` is the shared contract between every history host and
//! every client that routes to them:
//!
//! - [`ShardId`]: dense shard identifier in `[0, number_of_shards)`
//! - [`shard_of`]: maps a workflow ID to its shard
//! - [`shard_key`]: the membership-ring key for a shard
//!
//! The shard a workflow lands on never changes for a fixed shard count. Only
//! the host owning that shard moves as membership changes.

use crate::hash::fnv1a_hash64;

/// Identifier of a single history shard.
pub type ShardId = u32;

// ---------------------------------------------------------------------------
// shard_of
// ---------------------------------------------------------------------------

/// Computes the shard responsible for a workflow ID.
///
/// # Panics
///
/// Panics if `number_of_shards` is zero.
///
/// # Examples
///
/// ```
/// use history_router_core::shard::shard_of;
///
/// let shard = shard_of("order-42", 16);
/// assert!(shard < 16);
/// assert_eq!(shard, shard_of("order-42", 16));
/// ```
#[must_use]
pub fn shard_of(workflow_id: &str, number_of_shards: u32) -> ShardId {
    assert!(number_of_shards > 0, "number_of_shards must be > 0");
    let shard = fnv1a_hash64(workflow_id) % u64::from(number_of_shards);
    // The remainder is strictly below a u32 value.
    #[allow(clippy::cast_possible_truncation)]
    let shard = shard as u32;
    shard
}

/// Returns the key under which a shard is looked up on the membership ring.
///
/// Ring placement hashes this key, not the workflow ID, so the two hash
/// functions stay independent.
#[must_use]
pub fn shard_key(shard_id: ShardId) -> String {
    shard_id.to_string()
}

/// Iterates over every shard ID for the given shard count.
pub fn all_shards(number_of_shards: u32) -> impl Iterator<Item = ShardId> {
    0..number_of_shards
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn shard_of_is_in_range() {
        for i in 0..500 {
            assert!(shard_of(&format!("wf-{i}"), 7) < 7);
        }
    }

    #[test]
    fn single_shard_maps_everything_to_zero() {
        assert_eq!(shard_of("anything", 1), 0);
        assert_eq!(shard_of("", 1), 0);
    }

    #[test]
    fn shard_of_spreads_across_shards() {
        let mut seen = std::collections::HashSet::new();
        for i in 0..1000 {
            seen.insert(shard_of(&format!("workflow-{i}"), 16));
        }
        assert_eq!(seen.len(), 16);
    }

    #[test]
    #[should_panic(expected = "number_of_shards must be > 0")]
    fn zero_shards_panics() {
        let _ = shard_of("wf", 0);
    }

    #[test]
    fn shard_key_is_decimal_id() {
        assert_eq!(shard_key(0), "0");
        assert_eq!(shard_key(42), "42");
    }

    #[test]
    fn all_shards_covers_range() {
        let ids: Vec<ShardId> = all_shards(4).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    proptest! {
        #[test]
        fn shard_of_is_stable(workflow_id in ".*", shards in 1u32..4096) {
            let first = shard_of(&workflow_id, shards);
            prop_assert!(first < shards);
            prop_assert_eq!(first, shard_of(&workflow_id, shards));
        }
    }
}
