//! Shard routing: resolves each call to the engine that owns its shard.
//!
//! The innermost pipeline service. It decodes task tokens, resolves the
//! target shard, asks the controller for the engine, invokes the one engine
//! method matching the call, and translates any fault.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use history_router_core::TaskTokenSerializer;
use tower::Service;
use tracing::Span;

use super::error::ServiceError;
use super::middleware::validate::SHARD_ID_NOT_SET;
use super::operation::{invoke, CallTarget, HistoryCall, Operation, OperationResponse};
use super::translate::{token_fault, ErrorTranslator};
use crate::shard::{ControllerError, Engine, ShardController};

type BoxedFuture = Pin<Box<dyn Future<Output = Result<OperationResponse, ServiceError>> + Send>>;

// ---------------------------------------------------------------------------
// ShardRouter
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ShardRouter {
    controller: Arc<ShardController>,
    translator: Arc<ErrorTranslator>,
    tokens: Arc<dyn TaskTokenSerializer>,
}

impl ShardRouter {
    #[must_use]
    pub fn new(
        controller: Arc<ShardController>,
        translator: Arc<ErrorTranslator>,
        tokens: Arc<dyn TaskTokenSerializer>,
    ) -> Self {
        Self {
            controller,
            translator,
            tokens,
        }
    }

    async fn dispatch(self, op: Operation) -> Result<OperationResponse, ServiceError> {
        let engine = self.resolve(&op.call)?;
        invoke(engine.as_ref(), op.call)
            .await
            .map_err(|e| self.translator.engine(e))
    }

    fn resolve(&self, call: &HistoryCall) -> Result<Arc<dyn Engine>, ServiceError> {
        let span = Span::current();
        let lookup = match call.target() {
            CallTarget::Token(bytes) => {
                let token = self.tokens.deserialize(bytes).map_err(token_fault)?;
                token.validate().map_err(token_fault)?;
                self.engine_for_workflow(&span, &token.workflow_id)
            }
            CallTarget::Workflow(workflow_id) => self.engine_for_workflow(&span, workflow_id),
            CallTarget::Shard(shard_id) => {
                let shard_id = shard_id.ok_or_else(|| ServiceError::bad_request(SHARD_ID_NOT_SET))?;
                self.controller
                    .shard_id_from_wire(shard_id)
                    .and_then(|shard_id| {
                        span.record("shard_id", shard_id);
                        self.controller.get_engine_for_shard(shard_id)
                    })
            }
        };
        lookup.map_err(|e| self.translator.controller(e))
    }

    fn engine_for_workflow(
        &self,
        span: &Span,
        workflow_id: &str,
    ) -> Result<Arc<dyn Engine>, ControllerError> {
        span.record("workflow_id", workflow_id);
        span.record("shard_id", self.controller.shard_for(workflow_id));
        self.controller.get_engine(workflow_id)
    }
}

impl Service<Operation> for ShardRouter {
    type Response = OperationResponse;
    type Error = ServiceError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        Box::pin(self.clone().dispatch(op))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
