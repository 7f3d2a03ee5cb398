//! History router server: shard ownership, shard lifecycle control, and the
//! history RPC gateway.

pub mod cluster;
pub mod network;
pub mod persistence;
pub mod service;
pub mod shard;
pub mod testing;

pub use service::{HistoryHandler, HistoryService, ServerConfig, ServiceError};
