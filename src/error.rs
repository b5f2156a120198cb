//! # Orchestration Error Types
//!
//! Failure taxonomy for the statement-orchestration engine using thiserror
//! for structured error types instead of `Box<dyn Error>` patterns.
//!
//! The taxonomy deliberately separates the three operator-visible failure
//! classes: heartbeat timeouts, executor-reported statement failures, and
//! fan-out dispatch failures. An unrecognized statement status is *not* an
//! error anywhere in this crate; pollers treat it as "still pending".

use crate::messaging::MessagingError;
use thiserror::Error;

/// Failure classes surfaced by orchestration runs
#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("Heartbeat timeout: no callback for {operation} within {timeout_seconds}s")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    #[error("Executor reported terminal failure for statement {execution_id}: {status}")]
    ExecutorFailure {
        execution_id: String,
        status: String,
    },

    #[error("Dispatch to queue {queue_name} failed: {message}")]
    DispatchFailure { queue_name: String, message: String },

    #[error("Deadline exceeded: {operation} still pending after {polls} status polls")]
    DeadlineExceeded { operation: String, polls: u32 },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Run state store error: {message}")]
    StateStore { message: String },

    #[error("Internal orchestration error: {message}")]
    Internal { message: String },
}

impl OrchestrationError {
    /// Create a heartbeat timeout error
    pub fn timeout(operation: impl Into<String>, timeout_seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_seconds,
        }
    }

    /// Create an executor-reported failure error
    pub fn executor_failure(execution_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self::ExecutorFailure {
            execution_id: execution_id.into(),
            status: status.into(),
        }
    }

    /// Create a fan-out dispatch failure error
    pub fn dispatch_failure(queue_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DispatchFailure {
            queue_name: queue_name.into(),
            message: message.into(),
        }
    }

    /// Create a deadline exceeded error
    pub fn deadline_exceeded(operation: impl Into<String>, polls: u32) -> Self {
        Self::DeadlineExceeded {
            operation: operation.into(),
            polls,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a run state store error
    pub fn state_store(message: impl Into<String>) -> Self {
        Self::StateStore {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for failures caused by the remote executor reporting a terminal
    /// ABORTED/FAILED status (as opposed to timeouts or dispatch errors)
    pub fn is_executor_failure(&self) -> bool {
        matches!(self, Self::ExecutorFailure { .. })
    }

    /// True for heartbeat/deadline failures
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::DeadlineExceeded { .. })
    }
}

/// Queue transport errors surface as the dedicated dispatch failure class so
/// fan-out problems stay distinguishable from statement failures.
impl From<MessagingError> for OrchestrationError {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::QueueOperation {
                queue_name,
                operation,
                message,
            } => Self::dispatch_failure(queue_name, format!("{operation}: {message}")),
            MessagingError::Serialization { message } => Self::dispatch_failure("unknown", message),
            MessagingError::Connection { message } => Self::dispatch_failure("unknown", message),
        }
    }
}

/// Result type alias for orchestration operations
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
