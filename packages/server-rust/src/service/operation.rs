//! Operation types carried through the dispatch pipeline.
//!
//! Every history RPC is one [`HistoryCall`] variant. The variant table below
//! is the single place that binds an RPC to its request type, its engine
//! method and its response shape; [`invoke`] is generated from it.

use std::time::Duration;

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
    WorkflowExecution,
};

use crate::shard::{Engine, EngineResult};

// ---------------------------------------------------------------------------
// OperationResponse
// ---------------------------------------------------------------------------

/// Successful result of an engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResponse {
    RecordActivityTaskHeartbeat(RecordActivityTaskHeartbeatResponse),
    RecordActivityTaskStarted(RecordActivityTaskStartedResponse),
    RecordDecisionTaskStarted(RecordDecisionTaskStartedResponse),
    RespondDecisionTaskCompleted(RespondDecisionTaskCompletedResponse),
    /// Start and signal-with-start both answer with the new run.
    StartWorkflowExecution(StartWorkflowExecutionResponse),
    DescribeMutableState(DescribeMutableStateResponse),
    GetMutableState(GetMutableStateResponse),
    DescribeWorkflowExecution(DescribeWorkflowExecutionResponse),
    QueryWorkflow(QueryWorkflowResponse),
    ResetWorkflowExecution(ResetWorkflowExecutionResponse),
    ResetStickyTaskList(ResetStickyTaskListResponse),
    /// Calls with no response body.
    Empty,
}

impl OperationResponse {
    #[allow(clippy::needless_pass_by_value)]
    fn empty(_: ()) -> Self {
        Self::Empty
    }
}

/// Extracts a typed response from an [`OperationResponse`].
pub trait FromResponse: Sized {
    /// Returns `None` if the response has a different shape.
    fn from_response(response: OperationResponse) -> Option<Self>;
}

macro_rules! from_response {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl FromResponse for $ty {
                fn from_response(response: OperationResponse) -> Option<Self> {
                    match response {
                        OperationResponse::$variant(r) => Some(r),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_response! {
    RecordActivityTaskHeartbeat => RecordActivityTaskHeartbeatResponse,
    RecordActivityTaskStarted => RecordActivityTaskStartedResponse,
    RecordDecisionTaskStarted => RecordDecisionTaskStartedResponse,
    RespondDecisionTaskCompleted => RespondDecisionTaskCompletedResponse,
    StartWorkflowExecution => StartWorkflowExecutionResponse,
    DescribeMutableState => DescribeMutableStateResponse,
    GetMutableState => GetMutableStateResponse,
    DescribeWorkflowExecution => DescribeWorkflowExecutionResponse,
    QueryWorkflow => QueryWorkflowResponse,
    ResetWorkflowExecution => ResetWorkflowExecutionResponse,
    ResetStickyTaskList => ResetStickyTaskListResponse,
}

impl FromResponse for () {
    fn from_response(response: OperationResponse) -> Option<Self> {
        matches!(response, OperationResponse::Empty).then_some(())
    }
}

// ---------------------------------------------------------------------------
// RpcMethod / HistoryCall / invoke
// ---------------------------------------------------------------------------

macro_rules! history_calls {
    ($($variant:ident($req:ty) => $engine_fn:ident -> $wrap:path;)*) => {
        /// History RPC methods. The name doubles as the `operation` metrics label.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum RpcMethod {
            $($variant,)*
        }

        impl RpcMethod {
            /// Every method, in declaration order.
            pub const ALL: &'static [RpcMethod] = &[$(RpcMethod::$variant,)*];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)*
                }
            }
        }

        /// A history RPC with its request.
        #[derive(Debug, Clone)]
        pub enum HistoryCall {
            $($variant($req),)*
        }

        impl HistoryCall {
            #[must_use]
            pub fn method(&self) -> RpcMethod {
                match self {
                    $(Self::$variant(_) => RpcMethod::$variant,)*
                }
            }

            /// A call of the given method carrying an all-default request.
            #[cfg(test)]
            pub(crate) fn empty(method: RpcMethod) -> Self {
                match method {
                    $(RpcMethod::$variant => Self::$variant(<$req>::default()),)*
                }
            }
        }

        /// Calls exactly one engine method for `call`.
        ///
        /// # Errors
        ///
        /// Returns whatever fault the engine reports.
        pub async fn invoke(engine: &dyn Engine, call: HistoryCall) -> EngineResult<OperationResponse> {
            match call {
                $(HistoryCall::$variant(request) => engine.$engine_fn(request).await.map($wrap),)*
            }
        }
    };
}

history_calls! {
    RecordActivityTaskHeartbeat(RecordActivityTaskHeartbeatRequest) => record_activity_task_heartbeat -> OperationResponse::RecordActivityTaskHeartbeat;
    RecordActivityTaskStarted(RecordActivityTaskStartedRequest) => record_activity_task_started -> OperationResponse::RecordActivityTaskStarted;
    RecordDecisionTaskStarted(RecordDecisionTaskStartedRequest) => record_decision_task_started -> OperationResponse::RecordDecisionTaskStarted;
    RespondActivityTaskCompleted(RespondActivityTaskCompletedRequest) => respond_activity_task_completed -> OperationResponse::empty;
    RespondActivityTaskFailed(RespondActivityTaskFailedRequest) => respond_activity_task_failed -> OperationResponse::empty;
    RespondActivityTaskCanceled(RespondActivityTaskCanceledRequest) => respond_activity_task_canceled -> OperationResponse::empty;
    RespondDecisionTaskCompleted(RespondDecisionTaskCompletedRequest) => respond_decision_task_completed -> OperationResponse::RespondDecisionTaskCompleted;
    RespondDecisionTaskFailed(RespondDecisionTaskFailedRequest) => respond_decision_task_failed -> OperationResponse::empty;
    StartWorkflowExecution(StartWorkflowExecutionRequest) => start_workflow_execution -> OperationResponse::StartWorkflowExecution;
    DescribeMutableState(DescribeMutableStateRequest) => describe_mutable_state -> OperationResponse::DescribeMutableState;
    GetMutableState(GetMutableStateRequest) => get_mutable_state -> OperationResponse::GetMutableState;
    DescribeWorkflowExecution(DescribeWorkflowExecutionRequest) => describe_workflow_execution -> OperationResponse::DescribeWorkflowExecution;
    RequestCancelWorkflowExecution(RequestCancelWorkflowExecutionRequest) => request_cancel_workflow_execution -> OperationResponse::empty;
    SignalWorkflowExecution(SignalWorkflowExecutionRequest) => signal_workflow_execution -> OperationResponse::empty;
    SignalWithStartWorkflowExecution(SignalWithStartWorkflowExecutionRequest) => signal_with_start_workflow_execution -> OperationResponse::StartWorkflowExecution;
    RemoveSignalMutableState(RemoveSignalMutableStateRequest) => remove_signal_mutable_state -> OperationResponse::empty;
    QueryWorkflow(QueryWorkflowRequest) => query_workflow -> OperationResponse::QueryWorkflow;
    TerminateWorkflowExecution(TerminateWorkflowExecutionRequest) => terminate_workflow_execution -> OperationResponse::empty;
    ResetWorkflowExecution(ResetWorkflowExecutionRequest) => reset_workflow_execution -> OperationResponse::ResetWorkflowExecution;
    ScheduleDecisionTask(ScheduleDecisionTaskRequest) => schedule_decision_task -> OperationResponse::empty;
    RecordChildExecutionCompleted(RecordChildExecutionCompletedRequest) => record_child_execution_completed -> OperationResponse::empty;
    ResetStickyTaskList(ResetStickyTaskListRequest) => reset_sticky_task_list -> OperationResponse::ResetStickyTaskList;
    ReplicateEvents(ReplicateEventsRequest) => replicate_events -> OperationResponse::empty;
    ReplicateRawEvents(ReplicateRawEventsRequest) => replicate_raw_events -> OperationResponse::empty;
    SyncShardStatus(SyncShardStatusRequest) => sync_shard_status -> OperationResponse::empty;
    SyncActivity(SyncActivityRequest) => sync_activity -> OperationResponse::empty;
}

impl RpcMethod {
    /// Diagnostic calls skip admission control.
    #[must_use]
    pub fn is_rate_limited(self) -> bool {
        self != Self::DescribeMutableState
    }
}

impl std::fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HistoryCall {
    /// Domain the call is scoped to. Empty for calls that carry none.
    #[must_use]
    pub fn domain_id(&self) -> &str {
        match self {
            Self::RecordActivityTaskHeartbeat(r) => &r.domain_uuid,
            Self::RecordActivityTaskStarted(r) => &r.domain_uuid,
            Self::RecordDecisionTaskStarted(r) => &r.domain_uuid,
            Self::RespondActivityTaskCompleted(r) => &r.domain_uuid,
            Self::RespondActivityTaskFailed(r) => &r.domain_uuid,
            Self::RespondActivityTaskCanceled(r) => &r.domain_uuid,
            Self::RespondDecisionTaskCompleted(r) => &r.domain_uuid,
            Self::RespondDecisionTaskFailed(r) => &r.domain_uuid,
            Self::StartWorkflowExecution(r) => &r.domain_uuid,
            Self::DescribeMutableState(r) => &r.domain_uuid,
            Self::GetMutableState(r) => &r.domain_uuid,
            Self::DescribeWorkflowExecution(r) => &r.domain_uuid,
            Self::RequestCancelWorkflowExecution(r) => &r.domain_uuid,
            Self::SignalWorkflowExecution(r) => &r.domain_uuid,
            Self::SignalWithStartWorkflowExecution(r) => &r.domain_uuid,
            Self::RemoveSignalMutableState(r) => &r.domain_uuid,
            Self::QueryWorkflow(r) => &r.domain_uuid,
            Self::TerminateWorkflowExecution(r) => &r.domain_uuid,
            Self::ResetWorkflowExecution(r) => &r.domain_uuid,
            Self::ScheduleDecisionTask(r) => &r.domain_uuid,
            Self::RecordChildExecutionCompleted(r) => &r.domain_uuid,
            Self::ResetStickyTaskList(r) => &r.domain_uuid,
            Self::ReplicateEvents(r) => &r.domain_uuid,
            Self::ReplicateRawEvents(r) => &r.domain_uuid,
            Self::SyncShardStatus(_) => "",
            Self::SyncActivity(r) => r.domain_id.as_deref().unwrap_or(""),
        }
    }

    /// What the call names to locate its shard.
    #[must_use]
    pub fn target(&self) -> CallTarget<'_> {
        fn workflow(execution: Option<&WorkflowExecution>) -> CallTarget<'_> {
            CallTarget::Workflow(execution.map_or("", |e| e.workflow_id.as_str()))
        }

        match self {
            Self::RecordActivityTaskHeartbeat(r) => CallTarget::Token(&r.heartbeat_request.task_token),
            Self::RespondActivityTaskCompleted(r) => CallTarget::Token(&r.complete_request.task_token),
            Self::RespondActivityTaskFailed(r) => CallTarget::Token(&r.failed_request.task_token),
            Self::RespondActivityTaskCanceled(r) => CallTarget::Token(&r.cancel_request.task_token),
            Self::RespondDecisionTaskCompleted(r) => CallTarget::Token(&r.complete_request.task_token),
            Self::RespondDecisionTaskFailed(r) => CallTarget::Token(&r.failed_request.task_token),
            Self::RecordActivityTaskStarted(r) => workflow(r.workflow_execution.as_ref()),
            Self::RecordDecisionTaskStarted(r) => workflow(r.workflow_execution.as_ref()),
            Self::ScheduleDecisionTask(r) => workflow(r.workflow_execution.as_ref()),
            Self::RecordChildExecutionCompleted(r) => workflow(r.workflow_execution.as_ref()),
            Self::ResetStickyTaskList(r) => workflow(r.execution.as_ref()),
            Self::StartWorkflowExecution(r) => CallTarget::Workflow(&r.start_request.workflow_id),
            Self::SignalWithStartWorkflowExecution(r) => {
                CallTarget::Workflow(&r.signal_with_start_request.workflow_id)
            }
            Self::DescribeMutableState(r) => CallTarget::Workflow(&r.execution.workflow_id),
            Self::GetMutableState(r) => CallTarget::Workflow(&r.execution.workflow_id),
            Self::DescribeWorkflowExecution(r) => {
                CallTarget::Workflow(&r.request.execution.workflow_id)
            }
            Self::RequestCancelWorkflowExecution(r) => {
                CallTarget::Workflow(&r.cancel_request.workflow_execution.workflow_id)
            }
            Self::SignalWorkflowExecution(r) => {
                CallTarget::Workflow(&r.signal_request.workflow_execution.workflow_id)
            }
            Self::RemoveSignalMutableState(r) => {
                CallTarget::Workflow(&r.workflow_execution.workflow_id)
            }
            Self::QueryWorkflow(r) => CallTarget::Workflow(&r.query_request.execution.workflow_id),
            Self::TerminateWorkflowExecution(r) => {
                CallTarget::Workflow(&r.terminate_request.workflow_execution.workflow_id)
            }
            Self::ResetWorkflowExecution(r) => {
                CallTarget::Workflow(&r.reset_request.workflow_execution.workflow_id)
            }
            Self::ReplicateEvents(r) => CallTarget::Workflow(&r.workflow_execution.workflow_id),
            Self::ReplicateRawEvents(r) => CallTarget::Workflow(&r.workflow_execution.workflow_id),
            Self::SyncActivity(r) => CallTarget::Workflow(r.workflow_id.as_deref().unwrap_or("")),
            Self::SyncShardStatus(r) => CallTarget::Shard(r.shard_id),
        }
    }
}

/// How a call identifies its shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget<'a> {
    /// Shard of the named workflow.
    Workflow(&'a str),
    /// Shard of the workflow named inside an opaque task token.
    Token(&'a [u8]),
    /// Explicit shard ID, bypassing the workflow hash.
    Shard(Option<i64>),
}

// ---------------------------------------------------------------------------
// OperationContext / Operation
// ---------------------------------------------------------------------------

/// Context carried with every call through the pipeline.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub call_id: u64,
    pub method: RpcMethod,
    pub domain_id: String,
    /// Caller deadline, measured from pipeline entry.
    pub timeout: Duration,
}

/// A call and its context.
#[derive(Debug, Clone)]
pub struct Operation {
    pub ctx: OperationContext,
    pub call: HistoryCall,
}

impl Operation {
    #[must_use]
    pub fn new(call_id: u64, call: HistoryCall, timeout: Duration) -> Self {
        let ctx = OperationContext {
            call_id,
            method: call.method(),
            domain_id: call.domain_id().to_string(),
            timeout,
        };
        Self { ctx, call }
    }

    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        &self.ctx
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use history_router_core::messages::{StartWorkflow, SyncActivityRequest};

    use super::*;
    use crate::testing::RecordingEngine;

    #[tokio::test]
    async fn invoke_calls_exactly_the_matching_engine_method() {
        for method in RpcMethod::ALL {
            let engine = RecordingEngine::new(0);
            invoke(&engine, HistoryCall::empty(*method)).await.unwrap();
            assert_eq!(engine.calls(), vec![*method]);
        }
    }

    #[tokio::test]
    async fn responses_have_the_expected_shape() {
        let engine = RecordingEngine::new(0);
        let resp = invoke(&engine, HistoryCall::empty(RpcMethod::SignalWithStartWorkflowExecution))
            .await
            .unwrap();
        assert!(StartWorkflowExecutionResponse::from_response(resp).is_some());

        let resp = invoke(&engine, HistoryCall::empty(RpcMethod::SignalWorkflowExecution))
            .await
            .unwrap();
        assert_eq!(resp, OperationResponse::Empty);
        assert!(<()>::from_response(resp.clone()).is_some());
        assert!(QueryWorkflowResponse::from_response(resp).is_none());
    }

    #[test]
    fn method_names_are_unique() {
        let mut names: Vec<&str> = RpcMethod::ALL.iter().map(|m| m.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RpcMethod::ALL.len());
        assert_eq!(RpcMethod::SyncShardStatus.to_string(), "SyncShardStatus");
    }

    #[test]
    fn only_describe_mutable_state_skips_rate_limiting() {
        let exempt: Vec<RpcMethod> = RpcMethod::ALL
            .iter()
            .copied()
            .filter(|m| !m.is_rate_limited())
            .collect();
        assert_eq!(exempt, vec![RpcMethod::DescribeMutableState]);
    }

    #[test]
    fn operation_context_captures_domain() {
        let call = HistoryCall::StartWorkflowExecution(StartWorkflowExecutionRequest {
            domain_uuid: "d-1".to_string(),
            start_request: StartWorkflow {
                workflow_id: "wf".to_string(),
                ..StartWorkflow::default()
            },
            ..StartWorkflowExecutionRequest::default()
        });
        let op = Operation::new(9, call, Duration::from_secs(1));
        assert_eq!(op.ctx().call_id, 9);
        assert_eq!(op.ctx().method, RpcMethod::StartWorkflowExecution);
        assert_eq!(op.ctx().domain_id, "d-1");

        let sync = HistoryCall::SyncActivity(SyncActivityRequest {
            domain_id: Some("d-2".to_string()),
            ..SyncActivityRequest::default()
        });
        assert_eq!(sync.domain_id(), "d-2");
        assert_eq!(HistoryCall::empty(RpcMethod::SyncShardStatus).domain_id(), "");
    }

    #[test]
    fn targets() {
        let heartbeat = HistoryCall::RecordActivityTaskHeartbeat(RecordActivityTaskHeartbeatRequest {
            domain_uuid: "d".to_string(),
            heartbeat_request: history_router_core::messages::ActivityHeartbeat {
                task_token: b"tok".to_vec(),
                ..Default::default()
            },
        });
        assert_eq!(heartbeat.target(), CallTarget::Token(b"tok"));

        let schedule = HistoryCall::ScheduleDecisionTask(ScheduleDecisionTaskRequest {
            workflow_execution: Some(WorkflowExecution::current("wf-9")),
            ..ScheduleDecisionTaskRequest::default()
        });
        assert_eq!(schedule.target(), CallTarget::Workflow("wf-9"));
        assert_eq!(
            HistoryCall::empty(RpcMethod::ScheduleDecisionTask).target(),
            CallTarget::Workflow("")
        );

        let sync = HistoryCall::SyncShardStatus(SyncShardStatusRequest {
            shard_id: Some(3),
            ..SyncShardStatusRequest::default()
        });
        assert_eq!(sync.target(), CallTarget::Shard(Some(3)));
    }
}
