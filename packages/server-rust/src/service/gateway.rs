//! The history RPC gateway.
//!
//! [`HistoryHandler`] is the single entry point for every history RPC. Each
//! typed method wraps its request in a [`HistoryCall`], assigns a call ID and a
//! deadline, and drives it through the [`HistoryPipeline`]. Health and host
//! introspection bypass the pipeline but still wait for the startup barrier.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use history_router_core::messages::{
    DescribeHistoryHostRequest, DescribeHistoryHostResponse, DescribeMutableStateRequest,
    DescribeMutableStateResponse, DescribeWorkflowExecutionRequest,
    DescribeWorkflowExecutionResponse, GetMutableStateRequest, GetMutableStateResponse,
    HealthStatus, QueryWorkflowRequest, QueryWorkflowResponse, RecordActivityTaskHeartbeatRequest,
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
use tower::ServiceExt;
use tracing::debug;

use super::barrier::StartupBarrier;
use super::domain_cache::DomainCache;
use super::error::ServiceError;
use super::middleware::HistoryPipeline;
use super::operation::{FromResponse, HistoryCall, Operation, OperationResponse};
use crate::network::ShutdownController;
use crate::shard::ShardController;

const HEALTH_MESSAGE: &str = "history good";

// ---------------------------------------------------------------------------
// HistoryHandler
// ---------------------------------------------------------------------------

pub struct HistoryHandler {
    pipeline: HistoryPipeline,
    controller: Arc<ShardController>,
    barrier: StartupBarrier,
    domain_cache: Arc<dyn DomainCache>,
    shutdown: Arc<ShutdownController>,
    default_timeout: Duration,
    next_call_id: AtomicU64,
}

impl HistoryHandler {
    #[must_use]
    pub fn new(
        pipeline: HistoryPipeline,
        controller: Arc<ShardController>,
        barrier: StartupBarrier,
        domain_cache: Arc<dyn DomainCache>,
        shutdown: Arc<ShutdownController>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            controller,
            barrier,
            domain_cache,
            shutdown,
            default_timeout,
            next_call_id: AtomicU64::new(1),
        }
    }

    /// Runs one call through the pipeline.
    ///
    /// `timeout` overrides the configured default deadline. The call counts as
    /// in flight until it returns.
    ///
    /// # Errors
    ///
    /// Returns the classified fault for the call.
    pub async fn execute(
        &self,
        call: HistoryCall,
        timeout: Option<Duration>,
    ) -> Result<OperationResponse, ServiceError> {
        let _in_flight = self.shutdown.in_flight_guard();
        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let op = Operation::new(call_id, call, timeout.unwrap_or(self.default_timeout));
        self.pipeline.clone().oneshot(op).await
    }

    async fn submit<R: FromResponse>(&self, call: HistoryCall) -> Result<R, ServiceError> {
        let method = call.method();
        let response = self.execute(call, None).await?;
        R::from_response(response).ok_or_else(|| {
            ServiceError::internal(format!("unexpected response shape for {method}"))
        })
    }

    /// Reports the host healthy once startup completes.
    pub async fn health(&self) -> HealthStatus {
        self.barrier.wait().await;
        debug!("history health check endpoint reached");
        HealthStatus {
            ok: true,
            msg: HEALTH_MESSAGE.to_string(),
        }
    }

    /// Read-only snapshot of shard ownership and caches on this host.
    pub async fn describe_history_host(
        &self,
        _request: DescribeHistoryHostRequest,
    ) -> DescribeHistoryHostResponse {
        self.barrier.wait().await;
        let description = self.controller.describe();
        DescribeHistoryHostResponse {
            number_of_shards: u32::try_from(description.owned_shards.len()).unwrap_or(u32::MAX),
            shard_ids: description.owned_shards,
            domain_cache: self.domain_cache.cache_size_stats(),
            shard_controller_status: description.status.describe(),
            address: self.controller.host().address.clone(),
        }
    }
}

macro_rules! handler_methods {
    ($($name:ident($variant:ident, $req:ty) -> $resp:ty;)*) => {
        impl HistoryHandler {
            $(
                #[doc = concat!("Dispatches `", stringify!($variant), "` to the owning shard.")]
                ///
                /// # Errors
                ///
                /// Returns the classified fault for the call.
                pub async fn $name(&self, request: $req) -> Result<$resp, ServiceError> {
                    self.submit(HistoryCall::$variant(request)).await
                }
            )*
        }
    };
}

handler_methods! {
    record_activity_task_heartbeat(RecordActivityTaskHeartbeat, RecordActivityTaskHeartbeatRequest) -> RecordActivityTaskHeartbeatResponse;
    record_activity_task_started(RecordActivityTaskStarted, RecordActivityTaskStartedRequest) -> RecordActivityTaskStartedResponse;
    record_decision_task_started(RecordDecisionTaskStarted, RecordDecisionTaskStartedRequest) -> RecordDecisionTaskStartedResponse;
    respond_activity_task_completed(RespondActivityTaskCompleted, RespondActivityTaskCompletedRequest) -> ();
    respond_activity_task_failed(RespondActivityTaskFailed, RespondActivityTaskFailedRequest) -> ();
    respond_activity_task_canceled(RespondActivityTaskCanceled, RespondActivityTaskCanceledRequest) -> ();
    respond_decision_task_completed(RespondDecisionTaskCompleted, RespondDecisionTaskCompletedRequest) -> RespondDecisionTaskCompletedResponse;
    respond_decision_task_failed(RespondDecisionTaskFailed, RespondDecisionTaskFailedRequest) -> ();
    start_workflow_execution(StartWorkflowExecution, StartWorkflowExecutionRequest) -> StartWorkflowExecutionResponse;
    describe_mutable_state(DescribeMutableState, DescribeMutableStateRequest) -> DescribeMutableStateResponse;
    get_mutable_state(GetMutableState, GetMutableStateRequest) -> GetMutableStateResponse;
    describe_workflow_execution(DescribeWorkflowExecution, DescribeWorkflowExecutionRequest) -> DescribeWorkflowExecutionResponse;
    request_cancel_workflow_execution(RequestCancelWorkflowExecution, RequestCancelWorkflowExecutionRequest) -> ();
    signal_workflow_execution(SignalWorkflowExecution, SignalWorkflowExecutionRequest) -> ();
    signal_with_start_workflow_execution(SignalWithStartWorkflowExecution, SignalWithStartWorkflowExecutionRequest) -> StartWorkflowExecutionResponse;
    remove_signal_mutable_state(RemoveSignalMutableState, RemoveSignalMutableStateRequest) -> ();
    query_workflow(QueryWorkflow, QueryWorkflowRequest) -> QueryWorkflowResponse;
    terminate_workflow_execution(TerminateWorkflowExecution, TerminateWorkflowExecutionRequest) -> ();
    reset_workflow_execution(ResetWorkflowExecution, ResetWorkflowExecutionRequest) -> ResetWorkflowExecutionResponse;
    schedule_decision_task(ScheduleDecisionTask, ScheduleDecisionTaskRequest) -> ();
    record_child_execution_completed(RecordChildExecutionCompleted, RecordChildExecutionCompletedRequest) -> ();
    reset_sticky_task_list(ResetStickyTaskList, ResetStickyTaskListRequest) -> ResetStickyTaskListResponse;
    replicate_events(ReplicateEvents, ReplicateEventsRequest) -> ();
    replicate_raw_events(ReplicateRawEvents, ReplicateRawEventsRequest) -> ();
    sync_shard_status(SyncShardStatus, SyncShardStatusRequest) -> ();
    sync_activity(SyncActivity, SyncActivityRequest) -> ();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use history_router_core::messages::{
        ActivityHeartbeat, ActivityTaskCompleted, StartWorkflow, WorkflowExecution,
    };
    use history_router_core::{shard_of, JsonTaskTokenSerializer, TaskToken, TaskTokenSerializer};

    use super::*;
    use crate::cluster::HostInfo;
    use crate::service::domain_cache::LocalDomainCache;
    use crate::service::error::ErrorKind;
    use crate::service::middleware::build_history_pipeline;
    use crate::service::operation::RpcMethod;
    use crate::service::rate_limit::TokenBucket;
    use crate::service::router::ShardRouter;
    use crate::service::translate::ErrorTranslator;
    use crate::shard::ShardOwnershipTable;
    use crate::testing::{RecordingEngineFactory, StaticResolver};

    const SHARDS: u32 = 8;
    const DOMAIN: &str = "3c4a1b43-5d2e-4b8f-9a60-2f1c9e3d7b11";
    const RUN: &str = "9b2d3f6e-1c4a-4e8b-8d7f-5a6b7c8d9e0f";

    struct Harness {
        handler: Arc<HistoryHandler>,
        controller: Arc<ShardController>,
        barrier: StartupBarrier,
        factory: Arc<RecordingEngineFactory>,
        shutdown: Arc<ShutdownController>,
    }

    impl Harness {
        async fn started(self) -> Self {
            self.controller.start().await;
            self.barrier.open();
            self
        }
    }

    fn harness(bucket: TokenBucket) -> Harness {
        let local = HostInfo::new("self", "self:7934");
        let resolver = Arc::new(StaticResolver::new(local.clone()));
        let factory = Arc::new(RecordingEngineFactory::new());
        let controller = Arc::new(ShardController::new(
            local.clone(),
            Arc::new(ShardOwnershipTable::new(SHARDS)),
            resolver.clone(),
            factory.clone(),
        ));
        let router = ShardRouter::new(
            Arc::clone(&controller),
            Arc::new(ErrorTranslator::new(resolver, local.address)),
            Arc::new(JsonTaskTokenSerializer),
        );
        let barrier = StartupBarrier::new();
        let shutdown = Arc::new(ShutdownController::new());
        let handler = Arc::new(HistoryHandler::new(
            build_history_pipeline(router, barrier.clone(), Arc::new(bucket)),
            Arc::clone(&controller),
            barrier.clone(),
            Arc::new(LocalDomainCache::new()),
            Arc::clone(&shutdown),
            Duration::from_secs(5),
        ));
        Harness {
            handler,
            controller,
            barrier,
            factory,
            shutdown,
        }
    }

    fn start_request(workflow_id: &str) -> StartWorkflowExecutionRequest {
        StartWorkflowExecutionRequest {
            domain_uuid: DOMAIN.to_string(),
            start_request: StartWorkflow {
                workflow_id: workflow_id.to_string(),
                ..StartWorkflow::default()
            },
            ..StartWorkflowExecutionRequest::default()
        }
    }

    #[tokio::test]
    async fn typed_call_returns_engine_response() {
        let h = harness(TokenBucket::new(100, 0)).started().await;

        let response = h
            .handler
            .start_workflow_execution(start_request("order-1"))
            .await
            .unwrap();
        assert_eq!(response, StartWorkflowExecutionResponse::default());

        let engine = h.factory.engine_for(shard_of("order-1", SHARDS)).unwrap();
        assert_eq!(engine.calls(), vec![RpcMethod::StartWorkflowExecution]);
        h.controller.stop().await;
    }

    #[tokio::test]
    async fn unit_calls_decode_to_unit() {
        let h = harness(TokenBucket::new(100, 0)).started().await;
        let token = JsonTaskTokenSerializer
            .serialize(&TaskToken::new(DOMAIN, "order-2", RUN, 4))
            .unwrap();

        h.handler
            .respond_activity_task_completed(RespondActivityTaskCompletedRequest {
                domain_uuid: DOMAIN.to_string(),
                complete_request: ActivityTaskCompleted {
                    task_token: token,
                    ..ActivityTaskCompleted::default()
                },
            })
            .await
            .unwrap();
        h.controller.stop().await;
    }

    #[tokio::test]
    async fn health_waits_for_startup() {
        let h = harness(TokenBucket::new(100, 0));
        let handler = Arc::clone(&h.handler);
        let pending = tokio::spawn(async move { handler.health().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        h.barrier.open();
        let status = pending.await.unwrap();
        assert!(status.ok);
        assert_eq!(status.msg, "history good");
    }

    #[tokio::test]
    async fn describe_history_host_reports_owned_shards() {
        let h = harness(TokenBucket::new(100, 0)).started().await;

        let described = h
            .handler
            .describe_history_host(DescribeHistoryHostRequest::default())
            .await;
        assert_eq!(described.number_of_shards, SHARDS);
        assert_eq!(described.shard_ids, (0..SHARDS).collect::<Vec<_>>());
        assert_eq!(described.shard_controller_status, "started,not stopped,not stopping");
        assert_eq!(described.address, "self:7934");
        assert_eq!(described.domain_cache.num_of_items_in_cache_by_id, 0);
        h.controller.stop().await;
    }

    #[tokio::test]
    async fn throttled_call_is_service_busy() {
        let h = harness(TokenBucket::new(1, 0)).started().await;

        h.handler
            .start_workflow_execution(start_request("wf"))
            .await
            .unwrap();
        let err = h
            .handler
            .start_workflow_execution(start_request("wf"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceBusy);

        // Diagnostic calls are not throttled.
        h.handler
            .describe_mutable_state(DescribeMutableStateRequest {
                domain_uuid: DOMAIN.to_string(),
                execution: WorkflowExecution::current("wf"),
            })
            .await
            .unwrap();
        h.controller.stop().await;
    }

    #[tokio::test]
    async fn in_flight_calls_are_tracked() {
        let h = harness(TokenBucket::new(100, 0)).started().await;
        h.factory.delay_calls(Duration::from_millis(100));

        let handler = Arc::clone(&h.handler);
        let token = JsonTaskTokenSerializer
            .serialize(&TaskToken::new(DOMAIN, "wf", RUN, 1))
            .unwrap();
        let pending = tokio::spawn(async move {
            handler
                .record_activity_task_heartbeat(RecordActivityTaskHeartbeatRequest {
                    domain_uuid: DOMAIN.to_string(),
                    heartbeat_request: ActivityHeartbeat {
                        task_token: token,
                        ..ActivityHeartbeat::default()
                    },
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(h.shutdown.in_flight_count(), 1);
        pending.await.unwrap().unwrap();
        assert_eq!(h.shutdown.in_flight_count(), 0);
        h.controller.stop().await;
    }

    #[tokio::test]
    async fn explicit_timeout_overrides_default() {
        let h = harness(TokenBucket::new(100, 0)).started().await;
        h.factory.delay_calls(Duration::from_millis(500));

        let err = h
            .handler
            .execute(
                HistoryCall::StartWorkflowExecution(start_request("slow")),
                Some(Duration::from_millis(20)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
        h.controller.stop().await;
    }
}
