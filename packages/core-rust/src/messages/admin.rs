//! Operational surfaces: health and host introspection.

use serde::{Deserialize, Serialize};

/// Result of a health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
}

impl HealthStatus {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            ok: true,
            msg: "OK".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeHistoryHostRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub host_address: Option<String>,
}

/// Domain cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCacheInfo {
    pub num_of_items_in_cache_by_id: u64,
    pub num_of_items_in_cache_by_name: u64,
}

/// Read-only snapshot of a history host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeHistoryHostResponse {
    pub number_of_shards: u32,
    pub shard_ids: Vec<u32>,
    pub domain_cache: DomainCacheInfo,
    pub shard_controller_status: String,
    pub address: String,
}
