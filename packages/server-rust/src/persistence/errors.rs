//! Faults reported by durable storage.
//!
//! Storage is consumed through the engine; these are the fault shapes the
//! router has to recognize when an engine call fails.

use history_router_core::ShardId;

/// Storage-layer faults surfaced through engine calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    /// The shard's range lease was taken by another host.
    #[error("shard {shard_id} ownership lost: {msg}")]
    ShardOwnershipLost { shard_id: ShardId, msg: String },

    /// A start call collided with a running execution of the same workflow.
    #[error("{msg}")]
    WorkflowExecutionAlreadyStarted {
        msg: String,
        start_request_id: String,
        run_id: String,
    },

    /// The current-execution row changed between read and conditional write.
    #[error("{msg}")]
    CurrentWorkflowConditionFailed { msg: String },

    /// A conditional update on shard or execution state failed.
    #[error("condition failed: {msg}")]
    ConditionFailed { msg: String },

    /// Any other storage failure.
    #[error("persistence failure: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_lost_display_names_shard() {
        let err = PersistenceError::ShardOwnershipLost {
            shard_id: 7,
            msg: "range id changed".to_string(),
        };
        assert_eq!(err.to_string(), "shard 7 ownership lost: range id changed");
    }

    #[test]
    fn already_started_displays_message_only() {
        let err = PersistenceError::WorkflowExecutionAlreadyStarted {
            msg: "Workflow execution already running".to_string(),
            start_request_id: "req".to_string(),
            run_id: "run".to_string(),
        };
        assert_eq!(err.to_string(), "Workflow execution already running");
    }
}
