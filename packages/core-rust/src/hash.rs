//! FNV-1a hash utilities for shard assignment.
//!
//! Provides a 64-bit FNV-1a hash over the UTF-8 bytes of a string. Every host
//! in a cluster must map a workflow ID to the same shard, so the function is
//! pure and depends on nothing but its input.

/// FNV-1a offset basis (64-bit).
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a prime (64-bit).
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Computes a 64-bit FNV-1a hash of a string's UTF-8 bytes.
///
/// # Examples
///
/// ```
/// use history_router_core::hash::fnv1a_hash64;
///
/// assert_eq!(fnv1a_hash64(""), 0xcbf2_9ce4_8422_2325); // FNV offset basis
/// assert_eq!(fnv1a_hash64("a"), 0xaf63_dc4c_8601_ec8c);
/// ```
#[must_use]
pub fn fnv1a_hash64(s: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in s.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
