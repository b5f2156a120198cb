//! Wire types for the remote statement executor interface.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single asynchronous statement submission.
///
/// Created once when a task enters statement execution, consumed exactly once
/// by the executor, never mutated after creation. The `correlation_id`
/// doubles as the callback token the executor uses to signal completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub statement: String,
    pub correlation_id: String,
}

impl ExecutionRequest {
    pub fn new(statement: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            correlation_id: correlation_id.into(),
        }
    }
}

/// Remote statement execution status.
///
/// Only forward transitions occur; `Finished`, `Failed` and `Aborted` are
/// terminal and immutable once reached. Status strings outside this set are
/// deliberately *not* parse errors at the polling layer: they mean "keep
/// polling" (tolerant of future intermediate statuses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementStatus {
    /// Statement accepted by the executor, not yet running
    Submitted,
    /// Statement currently executing
    Running,
    /// Statement completed successfully
    Finished,
    /// Statement failed remotely
    Failed,
    /// Statement was aborted remotely
    Aborted,
}

impl StatementStatus {
    /// Check if this is a terminal status (no further transitions occur)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Aborted)
    }

    /// Check if this terminal status represents a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Aborted)
    }
}

impl fmt::Display for StatementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Finished => write!(f, "FINISHED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

impl std::str::FromStr for StatementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBMITTED" => Ok(Self::Submitted),
            "RUNNING" => Ok(Self::Running),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            "ABORTED" => Ok(Self::Aborted),
            _ => Err(format!("Unrecognized statement status: {s}")),
        }
    }
}

/// Handle for a submitted statement, owned by the polling loop for its
/// lifetime. Status is read-only from the orchestrator's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionHandle {
    pub execution_id: String,
    pub status: StatementStatus,
}

impl ExecutionHandle {
    pub fn new(execution_id: impl Into<String>, status: StatementStatus) -> Self {
        Self {
            execution_id: execution_id.into(),
            status,
        }
    }
}

/// Response to a `describe_statement` call.
///
/// The status is carried as the raw wire string so the polling loop can apply
/// its permissive default branch to statuses it does not recognize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementDescription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub query_string: Option<String>,
}

/// Response to a `get_statement_result` call: the row batch plus the
/// count-bearing field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementResult {
    pub records: Vec<serde_json::Value>,
    pub total_rows: i64,
}

impl StatementResult {
    /// Result carrying a single scalar count (the shape of count queries)
    pub fn count(value: i64) -> Self {
        Self {
            records: vec![serde_json::json!(value)],
            total_rows: value,
        }
    }

    /// Result carrying a batch of ID records
    pub fn records(records: Vec<serde_json::Value>) -> Self {
        let total_rows = records.len() as i64;
        Self {
            records,
            total_rows,
        }
    }
}
