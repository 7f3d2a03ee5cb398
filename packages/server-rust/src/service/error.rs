//! Caller-visible errors and their classification.
//!
//! [`ServiceError`] is the single error type returned by every gateway call.
//! Each error maps to exactly one [`ErrorKind`] (the metrics label) and one
//! [`FaultCategory`] (what the caller should do next).

use serde::Serialize;

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Errors returned to history-service callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("domain not active: {message}")]
    DomainNotActive {
        message: String,
        domain_name: String,
        current_cluster: String,
        active_cluster: String,
    },

    #[error("entity not exists: {message}")]
    EntityNotExists { message: String },

    #[error("{message}")]
    WorkflowExecutionAlreadyStarted {
        message: String,
        start_request_id: String,
        run_id: String,
    },

    #[error("cancellation already requested: {message}")]
    CancellationAlreadyRequested { message: String },

    #[error("limit exceeded: {message}")]
    LimitExceeded { message: String },

    /// Replication is missing events; the sender must resend from `next_event_id`.
    #[error("retry task: {message}")]
    RetryTask {
        message: String,
        domain_id: String,
        workflow_id: String,
        run_id: String,
        next_event_id: i64,
    },

    #[error("service busy: {message}")]
    ServiceBusy { message: String },

    #[error("event already started: {message}")]
    EventAlreadyStarted { message: String },

    /// The shard moved. `owner` is the new owner's address, or empty when the
    /// resolver could not name one.
    #[error("{message}")]
    ShardOwnershipLost { message: String, owner: String },

    #[error("internal service error: {message}")]
    InternalService { message: String },

    #[error("deadline exceeded: {message}")]
    DeadlineExceeded { message: String },

    /// A fault the router does not recognize.
    #[error("internal error: {message}")]
    Uncategorized { message: String },
}

impl ServiceError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn service_busy(message: impl Into<String>) -> Self {
        Self::ServiceBusy {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalService {
            message: message.into(),
        }
    }

    pub fn entity_not_exists(message: impl Into<String>) -> Self {
        Self::EntityNotExists {
            message: message.into(),
        }
    }

    pub fn uncategorized(message: impl Into<String>) -> Self {
        Self::Uncategorized {
            message: message.into(),
        }
    }

    /// Returns the human-readable message carried by the error.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message }
            | Self::DomainNotActive { message, .. }
            | Self::EntityNotExists { message }
            | Self::WorkflowExecutionAlreadyStarted { message, .. }
            | Self::CancellationAlreadyRequested { message }
            | Self::LimitExceeded { message }
            | Self::RetryTask { message, .. }
            | Self::ServiceBusy { message }
            | Self::EventAlreadyStarted { message }
            | Self::ShardOwnershipLost { message, .. }
            | Self::InternalService { message }
            | Self::DeadlineExceeded { message }
            | Self::Uncategorized { message } => message,
        }
    }

    /// Metrics classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::DomainNotActive { .. } => ErrorKind::DomainNotActive,
            Self::EntityNotExists { .. } => ErrorKind::EntityNotExists,
            Self::WorkflowExecutionAlreadyStarted { .. } => ErrorKind::ExecutionAlreadyStarted,
            Self::CancellationAlreadyRequested { .. } => ErrorKind::CancellationAlreadyRequested,
            Self::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            Self::RetryTask { .. } => ErrorKind::RetryTask,
            Self::ServiceBusy { .. } => ErrorKind::ServiceBusy,
            Self::EventAlreadyStarted { .. } => ErrorKind::EventAlreadyStarted,
            Self::ShardOwnershipLost { .. } => ErrorKind::ShardOwnershipLost,
            Self::InternalService { .. } => ErrorKind::InternalService,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::Uncategorized { .. } => ErrorKind::Uncategorized,
        }
    }

    /// What the caller should do about the error.
    #[must_use]
    pub fn category(&self) -> FaultCategory {
        self.kind().category()
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Closed set of error kinds used as the `kind` metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ShardOwnershipLost,
    EventAlreadyStarted,
    BadRequest,
    DomainNotActive,
    ExecutionAlreadyStarted,
    EntityNotExists,
    CancellationAlreadyRequested,
    LimitExceeded,
    RetryTask,
    ServiceBusy,
    DeadlineExceeded,
    InternalService,
    Uncategorized,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 13] = [
        ErrorKind::ShardOwnershipLost,
        ErrorKind::EventAlreadyStarted,
        ErrorKind::BadRequest,
        ErrorKind::DomainNotActive,
        ErrorKind::ExecutionAlreadyStarted,
        ErrorKind::EntityNotExists,
        ErrorKind::CancellationAlreadyRequested,
        ErrorKind::LimitExceeded,
        ErrorKind::RetryTask,
        ErrorKind::ServiceBusy,
        ErrorKind::DeadlineExceeded,
        ErrorKind::InternalService,
        ErrorKind::Uncategorized,
    ];

    /// Metrics label value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShardOwnershipLost => "shard_ownership_lost",
            Self::EventAlreadyStarted => "event_already_started",
            Self::BadRequest => "bad_request",
            Self::DomainNotActive => "domain_not_active",
            Self::ExecutionAlreadyStarted => "execution_already_started",
            Self::EntityNotExists => "entity_not_exists",
            Self::CancellationAlreadyRequested => "cancellation_already_requested",
            Self::LimitExceeded => "limit_exceeded",
            Self::RetryTask => "retry_task",
            Self::ServiceBusy => "service_busy",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::InternalService => "internal_service",
            Self::Uncategorized => "uncategorized",
        }
    }

    #[must_use]
    pub fn category(self) -> FaultCategory {
        match self {
            Self::BadRequest
            | Self::DomainNotActive
            | Self::EntityNotExists
            | Self::CancellationAlreadyRequested
            | Self::LimitExceeded
            | Self::EventAlreadyStarted => FaultCategory::CallerFault,
            Self::ServiceBusy => FaultCategory::Throttled,
            Self::ShardOwnershipLost => FaultCategory::OwnershipMoved,
            Self::ExecutionAlreadyStarted => FaultCategory::AlreadyExists,
            Self::RetryTask | Self::InternalService | Self::DeadlineExceeded => {
                FaultCategory::Transient
            }
            Self::Uncategorized => FaultCategory::Uncategorized,
        }
    }

    /// Kinds that indicate a server-side failure rather than a caller problem.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::InternalService | Self::DeadlineExceeded | Self::Uncategorized
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FaultCategory
// ---------------------------------------------------------------------------

/// Retry guidance for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCategory {
    /// Missing or invalid input. Not retried.
    CallerFault,
    /// Rate limit exhausted. Back off and retry.
    Throttled,
    /// The shard moved. Re-resolve the owner and retry there.
    OwnershipMoved,
    /// Duplicate start. Treat as success with the returned run identity.
    AlreadyExists,
    /// Server-side race or timeout. Safe to retry.
    Transient,
    /// Unexpected fault, surfaced as an internal error.
    Uncategorized,
}

impl FaultCategory {
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Throttled | Self::OwnershipMoved | Self::Transient
        )
    }
}
