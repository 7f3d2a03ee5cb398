//! The history RPC service.
//!
//! Calls flow through a tower pipeline:
//!
//! 1. **Gateway** (`gateway`): typed entry points, call IDs, deadlines, in-flight tracking
//! 2. **Middleware** (`middleware`): metrics, deadline, startup barrier, validation, rate limit
//! 3. **Routing** (`router`): token decoding, shard lookup, engine invocation
//! 4. **Translation** (`translate`): storage and controller faults to caller-visible errors
//!
//! `lifecycle` assembles the pieces and orders start/stop; `replication`
//! feeds replicated history and domain changes into the same gateway.

pub mod barrier;
pub mod config;
pub mod domain_cache;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod middleware;
pub mod operation;
pub mod rate_limit;
pub mod replication;
pub mod router;
pub mod translate;

// Re-export key types for convenient access.
pub use barrier::StartupBarrier;
pub use config::ServerConfig;
pub use domain_cache::{DomainCache, DomainEntry, LocalDomainCache, Merge};
pub use error::{ErrorKind, FaultCategory, ServiceError};
pub use gateway::HistoryHandler;
pub use lifecycle::HistoryService;
pub use operation::{
    CallTarget, FromResponse, HistoryCall, Operation, OperationContext, OperationResponse,
    RpcMethod,
};
pub use rate_limit::{RateLimiter, TokenBucket};
pub use replication::{DomainReplicator, ReplicationTaskHandler};
pub use router::ShardRouter;
pub use translate::ErrorTranslator;
