//! Cross-cluster replication task wire types.
//!
//! The active cluster publishes one [`ReplicationTask`] per domain change or
//! per batch of appended history events. Every field is optional on the wire;
//! consumers reject tasks whose required attributes are missing.

use serde::{Deserialize, Serialize};

use super::shared::History;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplicationTaskType {
    Domain,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DomainOperation {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DomainStatus {
    #[default]
    Registered,
    Deprecated,
    Deleted,
}

// ---------------------------------------------------------------------------
// Domain attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainInfo {
    pub name: String,
    #[serde(default)]
    pub status: DomainStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainConfiguration {
    pub workflow_execution_retention_period_in_days: i32,
    #[serde(default)]
    pub emit_metric: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainReplicationConfiguration {
    pub active_cluster_name: String,
    #[serde(default)]
    pub clusters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainTaskAttributes {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub domain_operation: Option<DomainOperation>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub info: Option<DomainInfo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub config: Option<DomainConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub replication_config: Option<DomainReplicationConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub config_version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failover_version: Option<i64>,
}

// ---------------------------------------------------------------------------
// History attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTaskAttributes {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub domain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub first_event_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_event_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub history: Option<History>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub new_run_history: Option<History>,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationTask {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub task_type: Option<ReplicationTaskType>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub domain_task_attributes: Option<DomainTaskAttributes>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub history_task_attributes: Option<HistoryTaskAttributes>,
}
