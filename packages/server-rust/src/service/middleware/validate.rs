//! Required-field validation.
//!
//! Runs before admission control, so malformed calls never spend rate-limit
//! budget and never reach shard lookup. Task tokens are checked later, when
//! the router decodes them.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::{Layer, Service};
use uuid::Uuid;

use crate::service::error::ServiceError;
use crate::service::operation::{CallTarget, HistoryCall, Operation, OperationResponse};
use crate::service::translate::{RUN_ID_NOT_VALID, WORKFLOW_ID_NOT_SET};

pub const DOMAIN_NOT_SET: &str = "Domain not set on request.";
pub const WORKFLOW_EXECUTION_NOT_SET: &str = "WorkflowExecution not set on request.";
pub const TASK_LIST_NOT_SET: &str = "Tasklist not set.";
pub const SOURCE_CLUSTER_NOT_SET: &str = "Source Cluster not set on request.";
pub const SHARD_ID_NOT_SET: &str = "Shard ID not set on request.";
pub const TIMESTAMP_NOT_SET: &str = "Timestamp not set on request.";

/// Checks the fields a call must carry before it can be routed.
///
/// # Errors
///
/// Returns [`ServiceError::BadRequest`] naming the first missing field.
pub fn validate_call(call: &HistoryCall) -> Result<(), ServiceError> {
    match call {
        HistoryCall::SyncShardStatus(r) => {
            require(r.source_cluster.is_some(), SOURCE_CLUSTER_NOT_SET)?;
            require(r.shard_id.is_some(), SHARD_ID_NOT_SET)?;
            return require(r.timestamp.is_some(), TIMESTAMP_NOT_SET);
        }
        HistoryCall::SyncActivity(r) => {
            require(is_uuid(r.domain_id.as_deref()), DOMAIN_NOT_SET)?;
            require(
                r.workflow_id.as_deref().is_some_and(|id| !id.is_empty()),
                WORKFLOW_ID_NOT_SET,
            )?;
            return require(is_uuid(r.run_id.as_deref()), RUN_ID_NOT_VALID);
        }
        _ => {}
    }

    require(!call.domain_id().is_empty(), DOMAIN_NOT_SET)?;

    match call {
        HistoryCall::RecordActivityTaskStarted(r) => {
            require(r.workflow_execution.is_some(), WORKFLOW_EXECUTION_NOT_SET)?;
        }
        HistoryCall::RecordDecisionTaskStarted(r) => {
            require(r.workflow_execution.is_some(), WORKFLOW_EXECUTION_NOT_SET)?;
            let task_list = r.poll_request.as_ref().map_or("", |p| p.task_list_name());
            require(!task_list.is_empty(), TASK_LIST_NOT_SET)?;
        }
        HistoryCall::ScheduleDecisionTask(r) => {
            require(r.workflow_execution.is_some(), WORKFLOW_EXECUTION_NOT_SET)?;
        }
        HistoryCall::RecordChildExecutionCompleted(r) => {
            require(r.workflow_execution.is_some(), WORKFLOW_EXECUTION_NOT_SET)?;
        }
        HistoryCall::ResetStickyTaskList(r) => {
            require(r.execution.is_some(), WORKFLOW_EXECUTION_NOT_SET)?;
        }
        HistoryCall::RequestCancelWorkflowExecution(r) => {
            require(!r.cancel_request.domain.is_empty(), DOMAIN_NOT_SET)?;
        }
        _ => {}
    }

    match call.target() {
        CallTarget::Workflow(id) => require(!id.is_empty(), WORKFLOW_ID_NOT_SET),
        CallTarget::Token(_) | CallTarget::Shard(_) => Ok(()),
    }
}

fn require(ok: bool, message: &'static str) -> Result<(), ServiceError> {
    if ok {
        Ok(())
    } else {
        Err(ServiceError::bad_request(message))
    }
}

fn is_uuid(value: Option<&str>) -> bool {
    value.is_some_and(|v| Uuid::parse_str(v).is_ok())
}

// ---------------------------------------------------------------------------
// ValidateLayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ValidateLayer;

impl<S> Layer<S> for ValidateLayer {
    type Service = ValidateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidateService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct ValidateService<S> {
    inner: S,
}

impl<S> Service<Operation> for ValidateService<S>
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
        if let Err(e) = validate_call(&op.call) {
            return Box::pin(async move { Err(e) });
        }
        Box::pin(self.inner.call(op))
    }
}

#[cfg(test)]
mod tests {
    use history_router_core::messages::{
        CancelWorkflow, PollForDecisionTaskRequest, RecordDecisionTaskStartedRequest,
        RequestCancelWorkflowExecutionRequest, StartWorkflow, StartWorkflowExecutionRequest,
        SyncActivityRequest, SyncShardStatusRequest, TaskList, WorkflowExecution,
    };

    use super::*;
    use crate::service::operation::RpcMethod;

    const DOMAIN: &str = "3c4a1b43-5d2e-4b8f-9a60-2f1c9e3d7b11";
    const RUN: &str = "9b2d3f6e-1c4a-4e8b-8d7f-5a6b7c8d9e0f";

    fn bad(message: &str) -> Result<(), ServiceError> {
        Err(ServiceError::bad_request(message))
    }

    fn start(domain: &str, workflow_id: &str) -> HistoryCall {
        HistoryCall::StartWorkflowExecution(StartWorkflowExecutionRequest {
            domain_uuid: domain.to_string(),
            start_request: StartWorkflow {
                workflow_id: workflow_id.to_string(),
                ..StartWorkflow::default()
            },
            ..StartWorkflowExecutionRequest::default()
        })
    }

    #[test]
    fn empty_domain_is_rejected_for_every_domain_scoped_call() {
        for method in RpcMethod::ALL {
            if matches!(method, RpcMethod::SyncShardStatus) {
                continue;
            }
            assert_eq!(
                validate_call(&HistoryCall::empty(*method)),
                bad(DOMAIN_NOT_SET),
                "{method}"
            );
        }
    }

    #[test]
    fn workflow_id_is_required() {
        assert_eq!(validate_call(&start(DOMAIN, "")), bad(WORKFLOW_ID_NOT_SET));
        assert_eq!(validate_call(&start(DOMAIN, "wf")), Ok(()));
    }

    #[test]
    fn token_calls_only_need_a_domain() {
        let mut call = HistoryCall::empty(RpcMethod::RespondActivityTaskCompleted);
        if let HistoryCall::RespondActivityTaskCompleted(r) = &mut call {
            r.domain_uuid = DOMAIN.to_string();
        }
        assert_eq!(validate_call(&call), Ok(()));
    }

    #[test]
    fn decision_task_started_needs_task_list() {
        let mut request = RecordDecisionTaskStartedRequest {
            domain_uuid: DOMAIN.to_string(),
            workflow_execution: Some(WorkflowExecution::current("wf")),
            ..RecordDecisionTaskStartedRequest::default()
        };
        assert_eq!(
            validate_call(&HistoryCall::RecordDecisionTaskStarted(request.clone())),
            bad(TASK_LIST_NOT_SET)
        );

        request.poll_request = Some(PollForDecisionTaskRequest {
            task_list: Some(TaskList::named("tl")),
            ..PollForDecisionTaskRequest::default()
        });
        assert_eq!(
            validate_call(&HistoryCall::RecordDecisionTaskStarted(request.clone())),
            Ok(())
        );

        request.workflow_execution = None;
        assert_eq!(
            validate_call(&HistoryCall::RecordDecisionTaskStarted(request)),
            bad(WORKFLOW_EXECUTION_NOT_SET)
        );
    }

    #[test]
    fn cancel_needs_inner_domain() {
        let mut request = RequestCancelWorkflowExecutionRequest {
            domain_uuid: DOMAIN.to_string(),
            cancel_request: CancelWorkflow {
                workflow_execution: WorkflowExecution::current("wf"),
                ..CancelWorkflow::default()
            },
            ..RequestCancelWorkflowExecutionRequest::default()
        };
        assert_eq!(
            validate_call(&HistoryCall::RequestCancelWorkflowExecution(request.clone())),
            bad(DOMAIN_NOT_SET)
        );
        request.cancel_request.domain = "orders".to_string();
        assert_eq!(
            validate_call(&HistoryCall::RequestCancelWorkflowExecution(request)),
            Ok(())
        );
    }

    #[test]
    fn sync_shard_status_fields_in_order() {
        let mut request = SyncShardStatusRequest::default();
        let check = |r: &SyncShardStatusRequest| validate_call(&HistoryCall::SyncShardStatus(r.clone()));

        assert_eq!(check(&request), bad(SOURCE_CLUSTER_NOT_SET));
        request.source_cluster = Some("east".to_string());
        assert_eq!(check(&request), bad(SHARD_ID_NOT_SET));
        request.shard_id = Some(2);
        assert_eq!(check(&request), bad(TIMESTAMP_NOT_SET));
        request.timestamp = Some(1_700_000_000);
        assert_eq!(check(&request), Ok(()));
    }

    #[test]
    fn sync_activity_needs_uuids() {
        let mut request = SyncActivityRequest {
            domain_id: Some("not-a-uuid".to_string()),
            ..SyncActivityRequest::default()
        };
        let check = |r: &SyncActivityRequest| validate_call(&HistoryCall::SyncActivity(r.clone()));

        assert_eq!(check(&request), bad(DOMAIN_NOT_SET));
        request.domain_id = Some(DOMAIN.to_string());
        assert_eq!(check(&request), bad(WORKFLOW_ID_NOT_SET));
        request.workflow_id = Some("wf".to_string());
        assert_eq!(check(&request), bad(RUN_ID_NOT_VALID));
        request.run_id = Some("run".to_string());
        assert_eq!(check(&request), bad(RUN_ID_NOT_VALID));
        request.run_id = Some(RUN.to_string());
        assert_eq!(check(&request), Ok(()));
    }
}
