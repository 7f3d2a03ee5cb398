use std::time::Duration;

use anyhow::ensure;

use crate::cluster::{HostInfo, DEFAULT_VNODES};

/// History host configuration.
///
/// Controls shard count, admission control, call deadlines, and shutdown
/// draining.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Identity of this host on the membership ring.
    pub host_identity: String,
    /// Address callers are redirected to when this host owns a shard.
    pub host_address: String,
    /// Fixed size of the shard ID space. Must be equal on every host.
    pub number_of_shards: u32,
    /// Sustained calls per second admitted by the host-wide rate limiter.
    pub rps: u32,
    /// Extra calls the limiter admits in a burst on top of `rps`.
    pub burst: u32,
    /// Deadline applied to a call when the caller does not supply one.
    pub default_call_timeout: Duration,
    /// Upper bound on waiting for in-flight calls during stop.
    pub drain_timeout: Duration,
    /// Virtual nodes per member on the membership ring.
    pub ring_vnodes: u32,
}

impl ServerConfig {
    #[must_use]
    pub fn host(&self) -> HostInfo {
        HostInfo::new(self.host_identity.clone(), self.host_address.clone())
    }

    /// Rejects settings no host can run with.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero shard count, a zero vnode count, or an
    /// empty host identity.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.number_of_shards > 0, "number_of_shards must be at least 1");
        ensure!(self.ring_vnodes > 0, "ring_vnodes must be at least 1");
        ensure!(!self.host_identity.is_empty(), "host_identity must be set");
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host_identity: "history-0".to_string(),
            host_address: "127.0.0.1:7934".to_string(),
            number_of_shards: 16,
            rps: 3000,
            burst: 0,
            default_call_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(10),
            ring_vnodes: DEFAULT_VNODES,
        }
    }
}
