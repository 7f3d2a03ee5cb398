//! History router core: message schemas, shard assignment, and the task token codec.

pub mod hash;
pub mod messages;
pub mod shard;
pub mod task_token;

pub use shard::{shard_of, ShardId};
pub use task_token::{JsonTaskTokenSerializer, TaskToken, TaskTokenSerializer, TokenError};
