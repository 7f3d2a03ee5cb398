//! Startup barrier middleware.
//!
//! Parks each call until the [`StartupBarrier`] opens. The inner service is
//! not called until then, so validation, admission control and shard lookup
//! only ever run against a started controller.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::service::barrier::StartupBarrier;
use crate::service::error::ServiceError;
use crate::service::operation::{Operation, OperationResponse};

#[derive(Debug, Clone)]
pub struct BarrierLayer {
    barrier: StartupBarrier,
}

impl BarrierLayer {
    #[must_use]
    pub fn new(barrier: StartupBarrier) -> Self {
        Self { barrier }
    }
}

impl<S> Layer<S> for BarrierLayer {
    type Service = BarrierService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BarrierService {
            inner,
            barrier: self.barrier.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BarrierService<S> {
    inner: S,
    barrier: StartupBarrier,
}

impl<S> Service<Operation> for BarrierService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = ServiceError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = ServiceError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, ServiceError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        if self.barrier.is_open() {
            return Box::pin(self.inner.call(op));
        }

        // Keep the instance that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let barrier = self.barrier.clone();
        Box::pin(async move {
            barrier.wait().await;
            inner.call(op).await
        })
    }
}
