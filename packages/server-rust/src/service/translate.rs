//! Fault translation at the gateway boundary.
//!
//! Every fault raised while dispatching a call (token decoding, engine lookup,
//! the engine call itself) is converted into exactly one [`ServiceError`]
//! here. Ownership-loss faults become redirects naming the shard's current
//! owner as reported by the membership resolver at the time of the fault.

use std::sync::Arc;

use history_router_core::shard::shard_key;
use history_router_core::{ShardId, TokenError};
use tracing::debug;

use crate::cluster::MembershipResolver;
use crate::persistence::PersistenceError;
use crate::service::error::ServiceError;
use crate::shard::{ControllerError, EngineError};

pub const WORKFLOW_ID_NOT_SET: &str = "WorkflowId is not set on request.";
pub const RUN_ID_NOT_VALID: &str = "RunID is not valid UUID.";
const ALREADY_RUNNING: &str = "Workflow is already running";

/// Converts raw faults into caller-visible errors.
pub struct ErrorTranslator {
    resolver: Arc<dyn MembershipResolver>,
    local_address: String,
}

impl ErrorTranslator {
    #[must_use]
    pub fn new(resolver: Arc<dyn MembershipResolver>, local_address: impl Into<String>) -> Self {
        Self {
            resolver,
            local_address: local_address.into(),
        }
    }

    #[must_use]
    pub fn local_address(&self) -> &str {
        &self.local_address
    }

    /// Builds the redirect for a shard that is not served here.
    ///
    /// The owner is empty when the resolver cannot name one.
    #[must_use]
    pub fn ownership_lost(&self, shard_id: ShardId) -> ServiceError {
        let owner = match self.resolver.lookup(&shard_key(shard_id)) {
            Ok(host) => host.address,
            Err(e) => {
                debug!(shard_id, error = %e, "cannot resolve new shard owner");
                String::new()
            }
        };
        self.redirect(owner)
    }

    fn redirect(&self, owner: String) -> ServiceError {
        ServiceError::ShardOwnershipLost {
            message: format!("Shard is not owned by host: {}", self.local_address),
            owner,
        }
    }

    #[must_use]
    pub fn persistence(&self, err: PersistenceError) -> ServiceError {
        match err {
            PersistenceError::ShardOwnershipLost { shard_id, .. } => self.ownership_lost(shard_id),
            PersistenceError::WorkflowExecutionAlreadyStarted {
                start_request_id,
                run_id,
                ..
            } => ServiceError::WorkflowExecutionAlreadyStarted {
                message: ALREADY_RUNNING.to_string(),
                start_request_id,
                run_id,
            },
            PersistenceError::CurrentWorkflowConditionFailed { msg } => ServiceError::internal(msg),
            other @ (PersistenceError::ConditionFailed { .. } | PersistenceError::Other(_)) => {
                ServiceError::uncategorized(other.to_string())
            }
        }
    }

    /// Engine faults: classified service errors pass through unchanged.
    #[must_use]
    pub fn engine(&self, err: EngineError) -> ServiceError {
        match err {
            EngineError::Service(e) => e,
            EngineError::Persistence(e) => self.persistence(e),
            EngineError::Other(e) => ServiceError::uncategorized(format!("{e:#}")),
        }
    }

    #[must_use]
    pub fn controller(&self, err: ControllerError) -> ServiceError {
        match err {
            ControllerError::NotStarted => ServiceError::service_busy(err.to_string()),
            ControllerError::InvalidShard { .. } => ServiceError::bad_request(err.to_string()),
            ControllerError::ShardNotOwned { shard_id } | ControllerError::Stopped { shard_id } => {
                self.not_served_here(shard_id)
            }
        }
    }

    /// No local engine for a shard. Redirects unless the resolver names this
    /// host, in which case the engine is still being built (or failed to be)
    /// and the caller should retry here later.
    fn not_served_here(&self, shard_id: ShardId) -> ServiceError {
        match self.resolver.lookup(&shard_key(shard_id)) {
            Ok(host) if host.address == self.local_address => {
                ServiceError::service_busy(format!("shard {shard_id} is not ready on this host"))
            }
            Ok(host) => self.redirect(host.address),
            Err(e) => {
                debug!(shard_id, error = %e, "cannot resolve new shard owner");
                self.redirect(String::new())
            }
        }
    }
}

/// Task token faults are always the caller's.
#[must_use]
pub fn token_fault(err: TokenError) -> ServiceError {
    match err {
        TokenError::Malformed(e) => {
            ServiceError::bad_request(format!("Error deserializing task token. Error: {e}"))
        }
        TokenError::MissingWorkflowId => ServiceError::bad_request(WORKFLOW_ID_NOT_SET),
        TokenError::InvalidRunId(_) => ServiceError::bad_request(RUN_ID_NOT_VALID),
    }
}
