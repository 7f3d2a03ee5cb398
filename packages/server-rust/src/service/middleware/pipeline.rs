//! Pipeline composition: wraps the `ShardRouter` with every middleware layer.

use std::sync::Arc;

use tower::ServiceBuilder;

use super::barrier::{BarrierLayer, BarrierService};
use super::metrics::{MetricsLayer, MetricsService};
use super::rate_limit::{RateLimitLayer, RateLimitService};
use super::timeout::{TimeoutLayer, TimeoutService};
use super::validate::{ValidateLayer, ValidateService};
use crate::service::barrier::StartupBarrier;
use crate::service::rate_limit::RateLimiter;
use crate::service::router::ShardRouter;

/// The assembled dispatch pipeline.
pub type HistoryPipeline = MetricsService<
    TimeoutService<BarrierService<ValidateService<RateLimitService<ShardRouter>>>>,
>;

/// Builds the dispatch pipeline around `router`.
///
/// Layer order (outermost to innermost):
/// 1. `MetricsLayer` -- count, time and classify every call
/// 2. `TimeoutLayer` -- enforce the caller deadline, including barrier waits
/// 3. `BarrierLayer` -- park calls until the first shard acquisition pass ends
/// 4. `ValidateLayer` -- reject calls missing required fields
/// 5. `RateLimitLayer` -- host-wide token bucket
#[must_use]
pub fn build_history_pipeline(
    router: ShardRouter,
    barrier: StartupBarrier,
    limiter: Arc<dyn RateLimiter>,
) -> HistoryPipeline {
    ServiceBuilder::new()
        .layer(MetricsLayer)
        .layer(TimeoutLayer)
        .layer(BarrierLayer::new(barrier))
        .layer(ValidateLayer)
        .layer(RateLimitLayer::new(limiter))
        .service(router)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use history_router_core::messages::{GetMutableStateRequest, WorkflowExecution};
    use history_router_core::JsonTaskTokenSerializer;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
    use metrics_util::MetricKind;
    use tower::ServiceExt;

    use super::*;
    use crate::cluster::HostInfo;
    use crate::service::error::{ErrorKind, ServiceError};
    use crate::service::operation::{HistoryCall, Operation, RpcMethod};
    use crate::service::rate_limit::TokenBucket;
    use crate::service::translate::ErrorTranslator;
    use crate::shard::{ShardController, ShardOwnershipTable};
    use crate::testing::{RecordingEngineFactory, StaticResolver};

    struct Harness {
        pipeline: HistoryPipeline,
        barrier: StartupBarrier,
        controller: Arc<ShardController>,
        factory: Arc<RecordingEngineFactory>,
    }

    fn harness(limiter: TokenBucket) -> Harness {
        harness_owned_by(HostInfo::new("self", "self:7934"), limiter)
    }

    fn harness_owned_by(owner: HostInfo, limiter: TokenBucket) -> Harness {
        let local = HostInfo::new("self", "self:7934");
        let resolver = Arc::new(StaticResolver::new(owner));
        let factory = Arc::new(RecordingEngineFactory::new());
        let controller = Arc::new(ShardController::new(
            local.clone(),
            Arc::new(ShardOwnershipTable::new(4)),
            resolver.clone(),
            factory.clone(),
        ));
        let router = ShardRouter::new(
            Arc::clone(&controller),
            Arc::new(ErrorTranslator::new(resolver, local.address)),
            Arc::new(JsonTaskTokenSerializer),
        );
        let barrier = StartupBarrier::new();
        Harness {
            pipeline: build_history_pipeline(router, barrier.clone(), Arc::new(limiter)),
            barrier,
            controller,
            factory,
        }
    }

    fn op(domain: &str, timeout: Duration) -> Operation {
        let call = HistoryCall::GetMutableState(GetMutableStateRequest {
            domain_uuid: domain.to_string(),
            execution: WorkflowExecution::current("wf"),
            ..GetMutableStateRequest::default()
        });
        Operation::new(1, call, timeout)
    }

    #[tokio::test]
    async fn call_before_start_waits_then_succeeds() {
        let h = harness(TokenBucket::new(10, 0));
        let pending = tokio::spawn(h.pipeline.clone().oneshot(op("d", Duration::from_secs(5))));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        h.controller.start().await;
        h.barrier.open();
        pending.await.unwrap().unwrap();
        assert_eq!(h.factory.all_calls(), vec![RpcMethod::GetMutableState]);
        h.controller.stop().await;
    }

    #[tokio::test]
    async fn call_before_start_with_short_deadline_fails_with_deadline() {
        let h = harness(TokenBucket::new(10, 0));
        let err = h
            .pipeline
            .oneshot(op("d", Duration::from_millis(30)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    }

    #[tokio::test]
    async fn empty_domain_is_rejected_before_any_engine_call() {
        let h = harness(TokenBucket::new(10, 0));
        h.controller.start().await;
        h.barrier.open();

        let err = h
            .pipeline
            .clone()
            .oneshot(op("", Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::bad_request("Domain not set on request."));
        assert!(h.factory.all_calls().is_empty());
        h.controller.stop().await;
    }

    #[tokio::test]
    async fn malformed_calls_do_not_spend_rate_limit_budget() {
        let h = harness(TokenBucket::new(1, 0));
        h.controller.start().await;
        h.barrier.open();

        assert!(h.pipeline.clone().oneshot(op("", Duration::from_secs(5))).await.is_err());
        h.pipeline
            .clone()
            .oneshot(op("d", Duration::from_secs(5)))
            .await
            .unwrap();
        let err = h
            .pipeline
            .clone()
            .oneshot(op("d", Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceBusy);
        h.controller.stop().await;
    }

    fn counter(snapshotter: &Snapshotter, name: &str, labels: &[(&str, &str)]) -> u64 {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, _)| {
                key.kind() == MetricKind::Counter
                    && key.key().name() == name
                    && labels
                        .iter()
                        .all(|(k, v)| key.key().labels().any(|l| l.key() == *k && l.value() == *v))
            })
            .map(|(_, _, _, value)| match value {
                DebugValue::Counter(n) => n,
                _ => 0,
            })
            .sum()
    }

    #[tokio::test]
    async fn every_call_and_every_fault_is_counted_by_kind() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let _recorder = metrics::set_default_local_recorder(&recorder);
        let method = RpcMethod::GetMutableState.as_str();

        // Deadline while parked on the closed barrier.
        let h = harness(TokenBucket::new(0, 0));
        let err = h
            .pipeline
            .clone()
            .oneshot(op("d", Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);

        // Throttled: the bucket is empty.
        h.controller.start().await;
        h.barrier.open();
        let err = h
            .pipeline
            .clone()
            .oneshot(op("d", Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceBusy);
        h.controller.stop().await;

        // Redirect: every shard lives on another host.
        let remote = harness_owned_by(HostInfo::new("b", "b:7934"), TokenBucket::new(10, 0));
        remote.controller.start().await;
        remote.barrier.open();
        let err = remote
            .pipeline
            .clone()
            .oneshot(op("d", Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShardOwnershipLost);
        remote.controller.stop().await;

        assert_eq!(
            counter(&snapshotter, "history_requests_total", &[("operation", method)]),
            3
        );
        for kind in [
            ErrorKind::DeadlineExceeded,
            ErrorKind::ServiceBusy,
            ErrorKind::ShardOwnershipLost,
        ] {
            assert_eq!(
                counter(
                    &snapshotter,
                    "history_errors_total",
                    &[("operation", method), ("kind", kind.as_str())]
                ),
                1,
                "{}",
                kind.as_str()
            );
        }
        assert_eq!(counter(&snapshotter, "history_errors_total", &[]), 3);
    }
}
