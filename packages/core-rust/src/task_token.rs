//! Continuation (task) token codec.
//!
//! A task token binds a follow-up worker call (heartbeat, complete, fail,
//! cancel) to the workflow run and the pending task it was issued for. Tokens
//! are minted by the execution engine; the router only decodes and validates
//! them to find the owning shard.
//!
//! The encoding is JSON with camelCase keys. Optional fields are omitted when
//! they hold their default value, so tokens minted before a field existed
//! decode unchanged.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shard::ShardId;

// ---------------------------------------------------------------------------
// TaskToken
// ---------------------------------------------------------------------------

/// Decoded contents of an opaque task token.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskToken {
    pub domain_id: String,
    pub workflow_id: String,
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub schedule_id: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub schedule_attempt: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub activity_id: String,
    /// Shard the token was minted on. Routing always recomputes the shard
    /// from `workflow_id`; this marker is informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_id: Option<ShardId>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl TaskToken {
    /// Creates a token for a scheduled task.
    #[must_use]
    pub fn new(
        domain_id: impl Into<String>,
        workflow_id: impl Into<String>,
        run_id: impl Into<String>,
        schedule_id: i64,
    ) -> Self {
        Self {
            domain_id: domain_id.into(),
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
            schedule_id,
            ..Self::default()
        }
    }

    /// Checks the structural invariants every token must hold.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::MissingWorkflowId`] if the workflow ID is empty and
    /// [`TokenError::InvalidRunId`] if a run ID is present but is not a UUID.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.workflow_id.is_empty() {
            return Err(TokenError::MissingWorkflowId);
        }
        if !self.run_id.is_empty() && Uuid::parse_str(&self.run_id).is_err() {
            return Err(TokenError::InvalidRunId(self.run_id.clone()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to decode or validate a task token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed task token: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("task token has no workflow id")]
    MissingWorkflowId,

    #[error("task token run id is not a UUID: {0}")]
    InvalidRunId(String),
}

// ---------------------------------------------------------------------------
// Serializer
// ---------------------------------------------------------------------------

/// Encodes and decodes task tokens.
pub trait TaskTokenSerializer: Send + Sync {
    /// Encodes a token into its opaque byte form.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`] if encoding fails.
    fn serialize(&self, token: &TaskToken) -> Result<Vec<u8>, TokenError>;

    /// Decodes an opaque token. Does not validate it.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`] if the bytes are not a token.
    fn deserialize(&self, data: &[u8]) -> Result<TaskToken, TokenError>;
}

/// JSON task token encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTaskTokenSerializer;

impl TaskTokenSerializer for JsonTaskTokenSerializer {
    fn serialize(&self, token: &TaskToken) -> Result<Vec<u8>, TokenError> {
        Ok(serde_json::to_vec(token)?)
    }

    fn deserialize(&self, data: &[u8]) -> Result<TaskToken, TokenError> {
        Ok(serde_json::from_slice(data)?)
    }
}
