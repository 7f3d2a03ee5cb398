//! Message schemas for the history service.
//!
//! All types serialize with camelCase field names. Opaque engine payloads are
//! byte strings (`serde_bytes`) so they survive compact binary encodings.

pub mod admin;
pub mod history;
pub mod replication;
pub mod shared;

pub use admin::{
    DescribeHistoryHostRequest, DescribeHistoryHostResponse, DomainCacheInfo, HealthStatus,
};

pub use history::{
    ActivityHeartbeat, ActivityTaskCanceled, ActivityTaskCompleted, ActivityTaskFailed,
    CancelWorkflow, DecisionTaskCompleted, DecisionTaskFailed, DescribeMutableStateRequest,
    DescribeMutableStateResponse, DescribeWorkflow, DescribeWorkflowExecutionRequest,
    DescribeWorkflowExecutionResponse, GetMutableStateRequest, GetMutableStateResponse,
    PendingActivityInfo, PollForActivityTaskRequest, PollForDecisionTaskRequest, QueryWorkflow,
    QueryWorkflowRequest, QueryWorkflowResponse, RecordActivityTaskHeartbeatRequest,
    RecordActivityTaskHeartbeatResponse, RecordActivityTaskStartedRequest,
    RecordActivityTaskStartedResponse, RecordChildExecutionCompletedRequest,
    RecordDecisionTaskStartedRequest, RecordDecisionTaskStartedResponse,
    RemoveSignalMutableStateRequest, ReplicateEventsRequest, ReplicateRawEventsRequest,
    RequestCancelWorkflowExecutionRequest, ResetStickyTaskListRequest,
    ResetStickyTaskListResponse, ResetWorkflow, ResetWorkflowExecutionRequest,
    ResetWorkflowExecutionResponse, RespondActivityTaskCanceledRequest,
    RespondActivityTaskCompletedRequest, RespondActivityTaskFailedRequest,
    RespondDecisionTaskCompletedRequest, RespondDecisionTaskCompletedResponse,
    RespondDecisionTaskFailedRequest, ScheduleDecisionTaskRequest, SignalWithStartWorkflow,
    SignalWithStartWorkflowExecutionRequest, SignalWorkflow, SignalWorkflowExecutionRequest,
    StartWorkflow, StartWorkflowExecutionRequest, StartWorkflowExecutionResponse,
    SyncActivityRequest, SyncShardStatusRequest, TerminateWorkflow,
    TerminateWorkflowExecutionRequest, WorkflowQuery,
};

pub use replication::{
    DomainConfiguration, DomainInfo, DomainOperation, DomainReplicationConfiguration,
    DomainStatus, DomainTaskAttributes, HistoryTaskAttributes, ReplicationTask,
    ReplicationTaskType,
};

pub use shared::{
    DataBlob, EncodingType, History, HistoryEvent, ParentExecutionInfo, ReplicationInfo,
    TaskList, TaskListKind, WorkflowExecution, WorkflowType,
};
