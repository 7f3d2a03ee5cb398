//! Cluster membership: member types, the resolver contract, and the hash ring
//! used to place shards on hosts.

pub mod ring;
pub mod traits;
pub mod types;

pub use ring::{RingResolver, DEFAULT_VNODES};
pub use traits::{MembershipError, MembershipResolver};
pub use types::{HostInfo, MemberInfo, MembersView, NodeState};
