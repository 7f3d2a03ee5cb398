//! Deadline middleware for history calls.
//!
//! Aborts a call that outlives `ctx.timeout`, including time spent parked on
//! the startup barrier, with `ServiceError::DeadlineExceeded`. The inner
//! future is dropped, so nothing keeps running on the caller's behalf.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::service::error::ServiceError;
use crate::service::operation::{Operation, OperationResponse};

// ---------------------------------------------------------------------------
// TimeoutLayer
// ---------------------------------------------------------------------------

/// Tower layer that enforces each call's own deadline.
#[derive(Debug, Clone)]
pub struct TimeoutLayer;

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService { inner }
    }
}

// ---------------------------------------------------------------------------
// TimeoutService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
}

impl<S> Service<Operation> for TimeoutService<S>
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
        let timeout = op.ctx.timeout;
        let fut = self.inner.call(op);
        Box::pin(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_elapsed) => Err(ServiceError::DeadlineExceeded {
                    message: format!("call exceeded its {}ms deadline", timeout.as_millis()),
                }),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tower::ServiceExt;

    use super::*;
    use crate::service::error::ErrorKind;
    use crate::service::operation::{HistoryCall, RpcMethod};

    /// Service that takes a configurable delay before responding.
    struct SlowService {
        delay: Duration,
    }

    impl Service<Operation> for SlowService {
        type Response = OperationResponse;
        type Error = ServiceError;
        type Future =
            Pin<Box<dyn Future<Output = Result<OperationResponse, ServiceError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _op: Operation) -> Self::Future {
            let delay = self.delay;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(OperationResponse::Empty)
            })
        }
    }

    fn make_op(timeout: Duration) -> Operation {
        Operation::new(1, HistoryCall::empty(RpcMethod::QueryWorkflow), timeout)
    }

    #[tokio::test(start_paused = true)]
    async fn completes_within_deadline() {
        let svc = TimeoutLayer.layer(SlowService {
            delay: Duration::from_millis(10),
        });
        let resp = svc.oneshot(make_op(Duration::from_secs(1))).await.unwrap();
        assert_eq!(resp, OperationResponse::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn exceeding_deadline_is_deadline_exceeded() {
        let svc = TimeoutLayer.layer(SlowService {
            delay: Duration::from_millis(200),
        });
        let err = svc
            .oneshot(make_op(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
        assert_eq!(err.message(), "call exceeded its 50ms deadline");
    }
}
