//! Admission control middleware.
//!
//! Takes one token per call from the host-wide [`RateLimiter`]. When the bucket
//! is empty the call is rejected immediately with `ServiceError::ServiceBusy`
//! rather than queued. Diagnostic calls are exempt.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::service::error::ServiceError;
use crate::service::operation::{Operation, OperationResponse};
use crate::service::rate_limit::RateLimiter;

pub const HOST_RPS_EXCEEDED: &str = "History host rps exceeded";

// ---------------------------------------------------------------------------
// RateLimitLayer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<dyn RateLimiter>,
}

impl RateLimitLayer {
    #[must_use]
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: Arc::clone(&self.limiter),
        }
    }
}

// ---------------------------------------------------------------------------
// RateLimitService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<dyn RateLimiter>,
}

impl<S> Service<Operation> for RateLimitService<S>
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
        if op.ctx.method.is_rate_limited() && !self.limiter.try_consume(1) {
            return Box::pin(async { Err(ServiceError::service_busy(HOST_RPS_EXCEEDED)) });
        }
        Box::pin(self.inner.call(op))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
