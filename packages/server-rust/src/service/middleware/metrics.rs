//! Metrics middleware for history calls.
//!
//! Outermost layer: every call is counted and timed regardless of outcome, and
//! every fault is counted once under its [`ErrorKind`]. The call runs inside a
//! `history_call` span; inner layers record `workflow_id` and `shard_id` on it
//! once they are known, so failure logs carry full context.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{debug, error, info_span, warn, Instrument};

use crate::service::error::{ErrorKind, ServiceError};
use crate::service::operation::{Operation, OperationResponse, RpcMethod};

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that counts, times, and classifies calls.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<Operation> for MetricsService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = ServiceError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = ServiceError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, ServiceError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let method = op.ctx.method;
        let span = info_span!(
            "history_call",
            operation = method.as_str(),
            call_id = op.ctx.call_id,
            domain_id = %op.ctx.domain_id,
            workflow_id = tracing::field::Empty,
            shard_id = tracing::field::Empty,
        );

        metrics::counter!("history_requests_total", "operation" => method.as_str()).increment(1);
        let fut = self.inner.call(op);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                metrics::histogram!(
                    "history_request_latency_seconds",
                    "operation" => method.as_str()
                )
                .record(start.elapsed().as_secs_f64());

                if let Err(e) = &result {
                    record_error(method, e);
                }
                result
            }
            .instrument(span),
        )
    }
}

/// Counts a fault under its kind and logs the ones that need attention.
fn record_error(method: RpcMethod, err: &ServiceError) {
    let kind = err.kind();
    metrics::counter!(
        "history_errors_total",
        "operation" => method.as_str(),
        "kind" => kind.as_str()
    )
    .increment(1);

    match kind {
        ErrorKind::InternalService => error!(error = %err, "internal service error"),
        ErrorKind::Uncategorized => error!(error = %err, "uncategorized error"),
        ErrorKind::DeadlineExceeded => warn!(error = %err, "history call deadline exceeded"),
        _ => debug!(kind = kind.as_str(), error = %err, "history call failed"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
