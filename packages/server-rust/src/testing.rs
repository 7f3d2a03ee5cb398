//! In-memory collaborators for tests and the test server.
//!
//! - [`RecordingEngine`] / [`RecordingEngineFactory`]: engines that record
//!   every call and can be scripted to fail, stall, or panic on release
//! - [`StaticResolver`]: a resolver that maps every key to one host
//! - [`FailingPersistenceManager`]: a storage manager whose close always fails
//! - [`test_service`]: a single-host history service built from the above

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

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
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::cluster::{HostInfo, MemberInfo, MembershipError, MembershipResolver};
use crate::persistence::{PersistenceManager, PersistenceManagers};
use crate::service::operation::RpcMethod;
use crate::service::{HistoryService, LocalDomainCache, ServerConfig};
use crate::shard::{Engine, EngineError, EngineFactory, EngineResult, ShardContext};

/// Produces the error a scripted engine call fails with.
pub type FailureFn = Arc<dyn Fn() -> EngineError + Send + Sync>;

// ---------------------------------------------------------------------------
// RecordingEngine
// ---------------------------------------------------------------------------

/// Engine that records calls and answers with default responses.
pub struct RecordingEngine {
    shard_id: ShardId,
    calls: Mutex<Vec<RpcMethod>>,
    failure: Mutex<Option<FailureFn>>,
    delay: Mutex<Option<Duration>>,
    stops: AtomicU32,
    panic_on_stop: bool,
    fail_on_stop: bool,
}

impl RecordingEngine {
    #[must_use]
    pub fn new(shard_id: ShardId) -> Self {
        Self {
            shard_id,
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            delay: Mutex::new(None),
            stops: AtomicU32::new(0),
            panic_on_stop: false,
            fail_on_stop: false,
        }
    }

    #[must_use]
    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    /// Methods called so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RpcMethod> {
        self.calls.lock().clone()
    }

    /// Makes every later call fail with the produced error.
    pub fn fail_with(&self, failure: FailureFn) {
        *self.failure.lock() = Some(failure);
    }

    /// Makes every later call sleep before answering.
    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    #[must_use]
    pub fn stop_count(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }

    async fn record(&self, method: RpcMethod) -> EngineResult<()> {
        self.calls.lock().push(method);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failure.lock().clone();
        match failure {
            Some(fail) => Err(fail()),
            None => Ok(()),
        }
    }
}

macro_rules! recording_engine {
    ($($name:ident($req:ty) -> $resp:ty => $method:ident;)*) => {
        #[async_trait]
        impl Engine for RecordingEngine {
            $(
                async fn $name(&self, _request: $req) -> EngineResult<$resp> {
                    self.record(RpcMethod::$method).await?;
                    Ok(<$resp>::default())
                }
            )*

            async fn stop(&self) -> anyhow::Result<()> {
                self.stops.fetch_add(1, Ordering::SeqCst);
                if self.panic_on_stop {
                    panic!("engine for shard {} panicked on stop", self.shard_id);
                }
                if self.fail_on_stop {
                    anyhow::bail!("engine for shard {} failed to flush", self.shard_id);
                }
                Ok(())
            }
        }
    };
}

recording_engine! {
    record_activity_task_heartbeat(RecordActivityTaskHeartbeatRequest) -> RecordActivityTaskHeartbeatResponse => RecordActivityTaskHeartbeat;
    record_activity_task_started(RecordActivityTaskStartedRequest) -> RecordActivityTaskStartedResponse => RecordActivityTaskStarted;
    record_decision_task_started(RecordDecisionTaskStartedRequest) -> RecordDecisionTaskStartedResponse => RecordDecisionTaskStarted;
    respond_activity_task_completed(RespondActivityTaskCompletedRequest) -> () => RespondActivityTaskCompleted;
    respond_activity_task_failed(RespondActivityTaskFailedRequest) -> () => RespondActivityTaskFailed;
    respond_activity_task_canceled(RespondActivityTaskCanceledRequest) -> () => RespondActivityTaskCanceled;
    respond_decision_task_completed(RespondDecisionTaskCompletedRequest) -> RespondDecisionTaskCompletedResponse => RespondDecisionTaskCompleted;
    respond_decision_task_failed(RespondDecisionTaskFailedRequest) -> () => RespondDecisionTaskFailed;
    start_workflow_execution(StartWorkflowExecutionRequest) -> StartWorkflowExecutionResponse => StartWorkflowExecution;
    describe_mutable_state(DescribeMutableStateRequest) -> DescribeMutableStateResponse => DescribeMutableState;
    get_mutable_state(GetMutableStateRequest) -> GetMutableStateResponse => GetMutableState;
    describe_workflow_execution(DescribeWorkflowExecutionRequest) -> DescribeWorkflowExecutionResponse => DescribeWorkflowExecution;
    request_cancel_workflow_execution(RequestCancelWorkflowExecutionRequest) -> () => RequestCancelWorkflowExecution;
    signal_workflow_execution(SignalWorkflowExecutionRequest) -> () => SignalWorkflowExecution;
    signal_with_start_workflow_execution(SignalWithStartWorkflowExecutionRequest) -> StartWorkflowExecutionResponse => SignalWithStartWorkflowExecution;
    remove_signal_mutable_state(RemoveSignalMutableStateRequest) -> () => RemoveSignalMutableState;
    query_workflow(QueryWorkflowRequest) -> QueryWorkflowResponse => QueryWorkflow;
    terminate_workflow_execution(TerminateWorkflowExecutionRequest) -> () => TerminateWorkflowExecution;
    reset_workflow_execution(ResetWorkflowExecutionRequest) -> ResetWorkflowExecutionResponse => ResetWorkflowExecution;
    schedule_decision_task(ScheduleDecisionTaskRequest) -> () => ScheduleDecisionTask;
    record_child_execution_completed(RecordChildExecutionCompletedRequest) -> () => RecordChildExecutionCompleted;
    reset_sticky_task_list(ResetStickyTaskListRequest) -> ResetStickyTaskListResponse => ResetStickyTaskList;
    replicate_events(ReplicateEventsRequest) -> () => ReplicateEvents;
    replicate_raw_events(ReplicateRawEventsRequest) -> () => ReplicateRawEvents;
    sync_shard_status(SyncShardStatusRequest) -> () => SyncShardStatus;
    sync_activity(SyncActivityRequest) -> () => SyncActivity;
}

// ---------------------------------------------------------------------------
// RecordingEngineFactory
// ---------------------------------------------------------------------------

/// Factory that keeps every engine it builds for later inspection.
#[derive(Default)]
pub struct RecordingEngineFactory {
    engines: Mutex<Vec<Arc<RecordingEngine>>>,
    failing_shards: Mutex<HashSet<ShardId>>,
    panic_on_stop: Mutex<HashSet<ShardId>>,
    fail_on_stop: Mutex<HashSet<ShardId>>,
    call_failure: Mutex<Option<FailureFn>>,
    call_delay: Mutex<Option<Duration>>,
    construction_delay: Mutex<Option<Duration>>,
}

impl RecordingEngineFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine construction for `shard_id` fails.
    pub fn fail_shard(&self, shard_id: ShardId) {
        self.failing_shards.lock().insert(shard_id);
    }

    /// Engines for `shard_id` panic when stopped.
    pub fn panic_on_stop(&self, shard_id: ShardId) {
        self.panic_on_stop.lock().insert(shard_id);
    }

    /// Engines for `shard_id` return an error when stopped.
    pub fn fail_on_stop(&self, shard_id: ShardId) {
        self.fail_on_stop.lock().insert(shard_id);
    }

    /// Every call on engines built from now on fails with the produced error.
    /// Also applies to engines already built.
    pub fn fail_calls_with(&self, failure: FailureFn) {
        for engine in self.engines.lock().iter() {
            engine.fail_with(Arc::clone(&failure));
        }
        *self.call_failure.lock() = Some(failure);
    }

    /// Every engine call sleeps before answering.
    pub fn delay_calls(&self, delay: Duration) {
        for engine in self.engines.lock().iter() {
            engine.delay_by(delay);
        }
        *self.call_delay.lock() = Some(delay);
    }

    /// Engine construction sleeps before completing.
    pub fn delay_construction(&self, delay: Duration) {
        *self.construction_delay.lock() = Some(delay);
    }

    #[must_use]
    pub fn created_count(&self) -> usize {
        self.engines.lock().len()
    }

    #[must_use]
    pub fn created_for(&self, shard_id: ShardId) -> u32 {
        let count = self
            .engines
            .lock()
            .iter()
            .filter(|e| e.shard_id == shard_id)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Total `stop()` calls across every engine built for `shard_id`.
    #[must_use]
    pub fn stop_calls(&self, shard_id: ShardId) -> u32 {
        self.engines
            .lock()
            .iter()
            .filter(|e| e.shard_id == shard_id)
            .map(|e| e.stop_count())
            .sum()
    }

    /// Every call made on any engine, in no particular order across engines.
    #[must_use]
    pub fn all_calls(&self) -> Vec<RpcMethod> {
        self.engines
            .lock()
            .iter()
            .flat_map(|e| e.calls())
            .collect()
    }

    /// Most recently built engine for a shard.
    #[must_use]
    pub fn engine_for(&self, shard_id: ShardId) -> Option<Arc<RecordingEngine>> {
        self.engines
            .lock()
            .iter()
            .rev()
            .find(|e| e.shard_id == shard_id)
            .cloned()
    }
}

#[async_trait]
impl EngineFactory for RecordingEngineFactory {
    async fn create_engine(&self, ctx: ShardContext) -> anyhow::Result<Arc<dyn Engine>> {
        let delay = *self.construction_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_shards.lock().contains(&ctx.shard_id) {
            anyhow::bail!("cannot acquire shard {}", ctx.shard_id);
        }

        let mut engine = RecordingEngine::new(ctx.shard_id);
        engine.panic_on_stop = self.panic_on_stop.lock().contains(&ctx.shard_id);
        engine.fail_on_stop = self.fail_on_stop.lock().contains(&ctx.shard_id);
        if let Some(failure) = self.call_failure.lock().clone() {
            engine.fail_with(failure);
        }
        if let Some(delay) = *self.call_delay.lock() {
            engine.delay_by(delay);
        }

        let engine = Arc::new(engine);
        self.engines.lock().push(Arc::clone(&engine));
        Ok(engine)
    }
}

// ---------------------------------------------------------------------------
// StaticResolver
// ---------------------------------------------------------------------------

/// Resolver that maps every key to the same host, or fails every lookup.
pub struct StaticResolver {
    owner: Mutex<Option<HostInfo>>,
    version: watch::Sender<u64>,
}

impl StaticResolver {
    #[must_use]
    pub fn new(owner: HostInfo) -> Self {
        let (version, _rx) = watch::channel(0);
        Self {
            owner: Mutex::new(Some(owner)),
            version,
        }
    }

    /// A resolver whose every lookup fails.
    #[must_use]
    pub fn failing() -> Self {
        let (version, _rx) = watch::channel(0);
        Self {
            owner: Mutex::new(None),
            version,
        }
    }

    /// Changes the owner and notifies subscribers.
    pub fn set_owner(&self, owner: Option<HostInfo>) {
        *self.owner.lock() = owner;
        self.version.send_modify(|v| *v += 1);
    }
}

impl MembershipResolver for StaticResolver {
    fn lookup(&self, _key: &str) -> Result<HostInfo, MembershipError> {
        self.owner
            .lock()
            .clone()
            .ok_or_else(|| MembershipError::Lookup("resolver unavailable".to_string()))
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn members(&self) -> Vec<MemberInfo> {
        self.owner
            .lock()
            .iter()
            .map(|h| MemberInfo::active(h.identity.clone(), h.address.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// FailingPersistenceManager
// ---------------------------------------------------------------------------

/// Storage manager whose `close()` always fails. Counts close attempts.
#[derive(Default)]
pub struct FailingPersistenceManager {
    closes: AtomicU32,
}

impl FailingPersistenceManager {
    #[must_use]
    pub fn close_count(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceManager for FailingPersistenceManager {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("storage unreachable")
    }
}

// ---------------------------------------------------------------------------
// test_service
// ---------------------------------------------------------------------------

/// A history service whose host owns every shard, backed by recording engines.
///
/// # Errors
///
/// Returns an error if `number_of_shards` is zero.
pub fn test_service(number_of_shards: u32) -> anyhow::Result<Arc<HistoryService>> {
    let config = ServerConfig {
        host_identity: "self".to_string(),
        host_address: "self:7934".to_string(),
        number_of_shards,
        drain_timeout: Duration::from_millis(200),
        ..ServerConfig::default()
    };
    let resolver = Arc::new(StaticResolver::new(config.host()));
    let service = HistoryService::new(
        config,
        resolver,
        Arc::new(RecordingEngineFactory::new()),
        Arc::new(LocalDomainCache::new()),
        PersistenceManagers::new(),
    )?;
    Ok(Arc::new(service))
}
