//! Tower middleware layers for the dispatch pipeline.
//!
//! - [`metrics`]: request counting, latency, and per-kind error counters
//! - [`timeout`]: per-call deadline enforcement
//! - [`barrier`]: parks calls until startup completes
//! - [`validate`]: required-field checks
//! - [`rate_limit`]: token-bucket admission control
//! - [`pipeline`]: composes all layers around the shard router

pub mod barrier;
pub mod metrics;
pub mod pipeline;
pub mod rate_limit;
pub mod timeout;
pub mod validate;

pub use barrier::BarrierLayer;
pub use metrics::MetricsLayer;
pub use pipeline::{build_history_pipeline, HistoryPipeline};
pub use rate_limit::RateLimitLayer;
pub use timeout::TimeoutLayer;
pub use validate::{validate_call, ValidateLayer};
