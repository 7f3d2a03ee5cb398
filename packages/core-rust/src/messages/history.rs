//! Request and response types for every history-service RPC.
//!
//! Each request is domain-scoped: the frontend resolves the domain name to
//! `domain_uuid` before calling a history host. Worker-facing calls wrap the
//! original frontend request in a `*_request` field.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::shared::{
    DataBlob, History, ParentExecutionInfo, ReplicationInfo, TaskList, WorkflowExecution,
    WorkflowType,
};

// ---------------------------------------------------------------------------
// Activity tasks
// ---------------------------------------------------------------------------

/// Heartbeat sent by an activity worker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityHeartbeat {
    #[serde(with = "serde_bytes", default)]
    pub task_token: Vec<u8>,
    #[serde(with = "serde_bytes", default)]
    pub details: Vec<u8>,
    #[serde(default)]
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActivityTaskHeartbeatRequest {
    pub domain_uuid: String,
    pub heartbeat_request: ActivityHeartbeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActivityTaskHeartbeatResponse {
    pub cancel_requested: bool,
}

/// Poll request of an activity worker, forwarded by matching.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollForActivityTaskRequest {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub task_list: Option<TaskList>,
    #[serde(default)]
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActivityTaskStartedRequest {
    pub domain_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_execution: Option<WorkflowExecution>,
    pub schedule_id: i64,
    pub task_id: i64,
    #[serde(default)]
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub poll_request: Option<PollForActivityTaskRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActivityTaskStartedResponse {
    #[serde(with = "serde_bytes", default)]
    pub scheduled_event: Vec<u8>,
    pub started_timestamp: i64,
    pub attempt: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTaskCompleted {
    #[serde(with = "serde_bytes", default)]
    pub task_token: Vec<u8>,
    #[serde(with = "serde_bytes", default)]
    pub result: Vec<u8>,
    #[serde(default)]
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondActivityTaskCompletedRequest {
    pub domain_uuid: String,
    pub complete_request: ActivityTaskCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTaskFailed {
    #[serde(with = "serde_bytes", default)]
    pub task_token: Vec<u8>,
    #[serde(default)]
    pub reason: String,
    #[serde(with = "serde_bytes", default)]
    pub details: Vec<u8>,
    #[serde(default)]
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondActivityTaskFailedRequest {
    pub domain_uuid: String,
    pub failed_request: ActivityTaskFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTaskCanceled {
    #[serde(with = "serde_bytes", default)]
    pub task_token: Vec<u8>,
    #[serde(with = "serde_bytes", default)]
    pub details: Vec<u8>,
    #[serde(default)]
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondActivityTaskCanceledRequest {
    pub domain_uuid: String,
    pub cancel_request: ActivityTaskCanceled,
}

// ---------------------------------------------------------------------------
// Decision tasks
// ---------------------------------------------------------------------------

/// Poll request of a decision worker, forwarded by matching.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollForDecisionTaskRequest {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub task_list: Option<TaskList>,
    #[serde(default)]
    pub identity: String,
}

impl PollForDecisionTaskRequest {
    /// Name of the polled task list, empty when unset.
    #[must_use]
    pub fn task_list_name(&self) -> &str {
        self.task_list.as_ref().map_or("", |tl| tl.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDecisionTaskStartedRequest {
    pub domain_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_execution: Option<WorkflowExecution>,
    pub schedule_id: i64,
    pub task_id: i64,
    #[serde(default)]
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub poll_request: Option<PollForDecisionTaskRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDecisionTaskStartedResponse {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_type: Option<WorkflowType>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub previous_started_event_id: Option<i64>,
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
    pub next_event_id: i64,
    pub attempt: i64,
    #[serde(default)]
    pub sticky_execution_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionTaskCompleted {
    #[serde(with = "serde_bytes", default)]
    pub task_token: Vec<u8>,
    #[serde(with = "serde_bytes", default)]
    pub decisions: Vec<u8>,
    #[serde(with = "serde_bytes", default)]
    pub execution_context: Vec<u8>,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub return_new_decision_task: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondDecisionTaskCompletedRequest {
    pub domain_uuid: String,
    pub complete_request: DecisionTaskCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondDecisionTaskCompletedResponse {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub started_response: Option<RecordDecisionTaskStartedResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionTaskFailed {
    #[serde(with = "serde_bytes", default)]
    pub task_token: Vec<u8>,
    #[serde(default)]
    pub cause: String,
    #[serde(with = "serde_bytes", default)]
    pub details: Vec<u8>,
    #[serde(default)]
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondDecisionTaskFailedRequest {
    pub domain_uuid: String,
    pub failed_request: DecisionTaskFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDecisionTaskRequest {
    pub domain_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_execution: Option<WorkflowExecution>,
    #[serde(default)]
    pub is_first_decision: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetStickyTaskListRequest {
    pub domain_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub execution: Option<WorkflowExecution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetStickyTaskListResponse {}

// ---------------------------------------------------------------------------
// Workflow lifecycle
// ---------------------------------------------------------------------------

/// Frontend start request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflow {
    pub domain: String,
    pub workflow_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_type: Option<WorkflowType>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub task_list: Option<TaskList>,
    #[serde(with = "serde_bytes", default)]
    pub input: Vec<u8>,
    pub execution_start_to_close_timeout_seconds: i32,
    pub task_start_to_close_timeout_seconds: i32,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowExecutionRequest {
    pub domain_uuid: String,
    pub start_request: StartWorkflow,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_execution_info: Option<ParentExecutionInfo>,
    #[serde(default)]
    pub attempt: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowExecutionResponse {
    pub run_id: String,
}

/// Frontend signal-with-start request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalWithStartWorkflow {
    pub domain: String,
    pub workflow_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_type: Option<WorkflowType>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub task_list: Option<TaskList>,
    #[serde(with = "serde_bytes", default)]
    pub input: Vec<u8>,
    pub execution_start_to_close_timeout_seconds: i32,
    pub task_start_to_close_timeout_seconds: i32,
    pub signal_name: String,
    #[serde(with = "serde_bytes", default)]
    pub signal_input: Vec<u8>,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalWithStartWorkflowExecutionRequest {
    pub domain_uuid: String,
    pub signal_with_start_request: SignalWithStartWorkflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalWorkflow {
    pub domain: String,
    pub workflow_execution: WorkflowExecution,
    pub signal_name: String,
    #[serde(with = "serde_bytes", default)]
    pub input: Vec<u8>,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalWorkflowExecutionRequest {
    pub domain_uuid: String,
    pub signal_request: SignalWorkflow,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_workflow_execution: Option<WorkflowExecution>,
    #[serde(default)]
    pub child_workflow_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveSignalMutableStateRequest {
    pub domain_uuid: String,
    pub workflow_execution: WorkflowExecution,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelWorkflow {
    pub domain: String,
    pub workflow_execution: WorkflowExecution,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCancelWorkflowExecutionRequest {
    pub domain_uuid: String,
    pub cancel_request: CancelWorkflow,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_initiated_event_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_workflow_execution: Option<WorkflowExecution>,
    #[serde(default)]
    pub child_workflow_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateWorkflow {
    pub domain: String,
    pub workflow_execution: WorkflowExecution,
    #[serde(default)]
    pub reason: String,
    #[serde(with = "serde_bytes", default)]
    pub details: Vec<u8>,
    #[serde(default)]
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateWorkflowExecutionRequest {
    pub domain_uuid: String,
    pub terminate_request: TerminateWorkflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetWorkflow {
    pub domain: String,
    pub workflow_execution: WorkflowExecution,
    #[serde(default)]
    pub reason: String,
    pub decision_finish_event_id: i64,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetWorkflowExecutionRequest {
    pub domain_uuid: String,
    pub reset_request: ResetWorkflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetWorkflowExecutionResponse {
    pub run_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordChildExecutionCompletedRequest {
    pub domain_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_execution: Option<WorkflowExecution>,
    pub initiated_id: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub completed_execution: Option<WorkflowExecution>,
    #[serde(with = "serde_bytes", default)]
    pub completion_event: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Queries and mutable state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeMutableStateRequest {
    pub domain_uuid: String,
    pub execution: WorkflowExecution,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeMutableStateResponse {
    #[serde(default)]
    pub mutable_state_in_cache: String,
    #[serde(default)]
    pub mutable_state_in_database: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMutableStateRequest {
    pub domain_uuid: String,
    pub execution: WorkflowExecution,
    #[serde(default)]
    pub expected_next_event_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMutableStateResponse {
    pub execution: WorkflowExecution,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_type: Option<WorkflowType>,
    pub next_event_id: i64,
    pub last_first_event_id: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub task_list: Option<TaskList>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sticky_task_list: Option<TaskList>,
    #[serde(default)]
    pub is_workflow_running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeWorkflow {
    pub domain: String,
    pub execution: WorkflowExecution,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeWorkflowExecutionRequest {
    pub domain_uuid: String,
    pub request: DescribeWorkflow,
}

/// A pending activity as reported by describe.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingActivityInfo {
    pub activity_id: String,
    pub state: String,
    pub attempt: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeWorkflowExecutionResponse {
    pub execution: WorkflowExecution,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_type: Option<WorkflowType>,
    pub start_time: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub close_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub close_status: Option<String>,
    pub history_length: i64,
    #[serde(default)]
    pub pending_activities: Vec<PendingActivityInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowQuery {
    pub query_type: String,
    #[serde(with = "serde_bytes", default)]
    pub query_args: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryWorkflow {
    pub domain: String,
    pub execution: WorkflowExecution,
    pub query: WorkflowQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryWorkflowRequest {
    pub domain_uuid: String,
    pub query_request: QueryWorkflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryWorkflowResponse {
    #[serde(with = "serde_bytes", default)]
    pub query_result: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Cross-cluster replication
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicateEventsRequest {
    pub source_cluster: String,
    pub domain_uuid: String,
    pub workflow_execution: WorkflowExecution,
    pub first_event_id: i64,
    pub next_event_id: i64,
    pub version: i64,
    #[serde(default)]
    pub replication_info: HashMap<String, ReplicationInfo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub history: Option<History>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub new_run_history: Option<History>,
    #[serde(default)]
    pub force_buffer_events: bool,
    #[serde(default)]
    pub reset_workflow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicateRawEventsRequest {
    pub domain_uuid: String,
    pub workflow_execution: WorkflowExecution,
    #[serde(default)]
    pub replication_info: HashMap<String, ReplicationInfo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub history: Option<DataBlob>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub new_run_history: Option<DataBlob>,
}

/// Shard-level replication heartbeat from a remote cluster.
///
/// Every field is optional on the wire; the gateway rejects missing ones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncShardStatusRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_cluster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shard_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<i64>,
}

/// Activity state copied from the active cluster.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncActivityRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub domain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run_id: Option<String>,
    pub version: i64,
    pub scheduled_id: i64,
    pub scheduled_time: i64,
    pub started_id: i64,
    pub started_time: i64,
    pub last_heartbeat_time: i64,
    #[serde(with = "serde_bytes", default)]
    pub details: Vec<u8>,
    pub attempt: i32,
}
