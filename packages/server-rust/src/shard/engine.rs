//! Per-shard execution engine contract.
//!
//! The engine executes workflow-history state transitions for one shard. The
//! router only constructs engines through an [`EngineFactory`], calls exactly
//! one method per dispatched RPC, and releases the engine with
//! [`Engine::stop`] when the shard leaves this host.

use std::sync::Arc;

use async_trait::async_trait;
use history_router_core::messages::{
    DescribeMutableStateRequest, DescribeMutableStateResponse, DescribeWorkflowExecutionRequest,
    DescribeWorkflowExecutionResponse, GetMutableStateRequest, GetMutableStateResponse,
    QueryWorkflowRequest, QueryWorkflowResponse, RecordActivityTaskHeartbeatRequest,
    RecordActivityTaskHeartbeatResponse, RecordActivityTaskStartedRequest,
    RecordActivityTaskStartedResponse, RecordChildExecutionCompletedRequest,
    RecordDecisionTaskStartedRequest, RecordDecisionTaskStartedResponse,
    RemoveSignalMutableStateRequest, ReplicateEventsRequest, ReplicateRawEventsRequest,
    RequestCancelWorkflowExecutionRequest, ResetStickyTaskListRequest,
    ResetStickyTaskListResponse, ResetWorkflowExecutionRequest, ResetWorkflowExecutionResponse,
    RespondActivityTaskCanceledRequest, RespondActivityTaskCompletedRequest,
    RespondActivityTaskFailedRequest, RespondDecisionTaskCompletedRequest,
    RespondDecisionTaskCompletedResponse, RespondDecisionTaskFailedRequest,
    ScheduleDecisionTaskRequest, SignalWithStartWorkflowExecutionRequest,
    SignalWorkflowExecutionRequest, StartWorkflowExecutionRequest, StartWorkflowExecutionResponse,
    SyncActivityRequest, SyncShardStatusRequest, TerminateWorkflowExecutionRequest,
};
use history_router_core::ShardId;

use crate::cluster::HostInfo;
use crate::persistence::PersistenceError;
use crate::service::error::ServiceError;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Faults raised by an engine call.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A caller-visible error the engine already classified.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A storage fault the router must translate.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Anything else.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

// ---------------------------------------------------------------------------
// ShardContext
// ---------------------------------------------------------------------------

/// Everything an engine needs to know about the shard it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardContext {
    pub shard_id: ShardId,
    pub host: HostInfo,
    pub number_of_shards: u32,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// One engine instance serves exactly one shard.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn record_activity_task_heartbeat(
        &self,
        request: RecordActivityTaskHeartbeatRequest,
    ) -> EngineResult<RecordActivityTaskHeartbeatResponse>;

    async fn record_activity_task_started(
        &self,
        request: RecordActivityTaskStartedRequest,
    ) -> EngineResult<RecordActivityTaskStartedResponse>;

    async fn record_decision_task_started(
        &self,
        request: RecordDecisionTaskStartedRequest,
    ) -> EngineResult<RecordDecisionTaskStartedResponse>;

    async fn respond_activity_task_completed(
        &self,
        request: RespondActivityTaskCompletedRequest,
    ) -> EngineResult<()>;

    async fn respond_activity_task_failed(
        &self,
        request: RespondActivityTaskFailedRequest,
    ) -> EngineResult<()>;

    async fn respond_activity_task_canceled(
        &self,
        request: RespondActivityTaskCanceledRequest,
    ) -> EngineResult<()>;

    async fn respond_decision_task_completed(
        &self,
        request: RespondDecisionTaskCompletedRequest,
    ) -> EngineResult<RespondDecisionTaskCompletedResponse>;

    async fn respond_decision_task_failed(
        &self,
        request: RespondDecisionTaskFailedRequest,
    ) -> EngineResult<()>;

    async fn start_workflow_execution(
        &self,
        request: StartWorkflowExecutionRequest,
    ) -> EngineResult<StartWorkflowExecutionResponse>;

    async fn describe_mutable_state(
        &self,
        request: DescribeMutableStateRequest,
    ) -> EngineResult<DescribeMutableStateResponse>;

    async fn get_mutable_state(
        &self,
        request: GetMutableStateRequest,
    ) -> EngineResult<GetMutableStateResponse>;

    async fn describe_workflow_execution(
        &self,
        request: DescribeWorkflowExecutionRequest,
    ) -> EngineResult<DescribeWorkflowExecutionResponse>;

    async fn request_cancel_workflow_execution(
        &self,
        request: RequestCancelWorkflowExecutionRequest,
    ) -> EngineResult<()>;

    async fn signal_workflow_execution(
        &self,
        request: SignalWorkflowExecutionRequest,
    ) -> EngineResult<()>;

    async fn signal_with_start_workflow_execution(
        &self,
        request: SignalWithStartWorkflowExecutionRequest,
    ) -> EngineResult<StartWorkflowExecutionResponse>;

    async fn remove_signal_mutable_state(
        &self,
        request: RemoveSignalMutableStateRequest,
    ) -> EngineResult<()>;

    async fn query_workflow(&self, request: QueryWorkflowRequest)
        -> EngineResult<QueryWorkflowResponse>;

    async fn terminate_workflow_execution(
        &self,
        request: TerminateWorkflowExecutionRequest,
    ) -> EngineResult<()>;

    async fn reset_workflow_execution(
        &self,
        request: ResetWorkflowExecutionRequest,
    ) -> EngineResult<ResetWorkflowExecutionResponse>;

    async fn schedule_decision_task(&self, request: ScheduleDecisionTaskRequest)
        -> EngineResult<()>;

    async fn record_child_execution_completed(
        &self,
        request: RecordChildExecutionCompletedRequest,
    ) -> EngineResult<()>;

    async fn reset_sticky_task_list(
        &self,
        request: ResetStickyTaskListRequest,
    ) -> EngineResult<ResetStickyTaskListResponse>;

    async fn replicate_events(&self, request: ReplicateEventsRequest) -> EngineResult<()>;

    async fn replicate_raw_events(&self, request: ReplicateRawEventsRequest) -> EngineResult<()>;

    async fn sync_shard_status(&self, request: SyncShardStatusRequest) -> EngineResult<()>;

    async fn sync_activity(&self, request: SyncActivityRequest) -> EngineResult<()>;

    /// Flushes and closes the engine. Called once when the shard is released.
    async fn stop(&self) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// EngineFactory
// ---------------------------------------------------------------------------

/// Builds the engine for a newly acquired shard.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Constructs and fully initializes an engine. The controller installs the
    /// returned engine only after this resolves.
    async fn create_engine(&self, ctx: ShardContext) -> anyhow::Result<Arc<dyn Engine>>;
}
