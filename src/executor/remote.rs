//! Remote statement executor interface.
//!
//! The executor is an external collaborator: a callable service that accepts
//! a SQL-like statement and asynchronously reports completion. The engine
//! only ever talks to it through this trait, so tests script it and
//! deployments wire in warehouse-specific clients.

use crate::error::OrchestrationResult;
use crate::executor::types::{ExecutionRequest, StatementDescription, StatementResult};
use async_trait::async_trait;

/// Asynchronous remote statement executor.
///
/// `execute_statement` submits and returns the remote execution id without
/// waiting for completion. Completion is signaled out-of-band by invoking
/// the callback registry with the request's correlation id.
#[async_trait]
pub trait RemoteStatementExecutor: Send + Sync {
    /// Submit a statement for asynchronous execution
    async fn execute_statement(&self, request: &ExecutionRequest)
        -> OrchestrationResult<String>;

    /// Check execution status of a previously submitted statement
    async fn describe_statement(
        &self,
        execution_id: &str,
    ) -> OrchestrationResult<StatementDescription>;

    /// Retrieve the result rows of a finished statement
    async fn get_statement_result(
        &self,
        execution_id: &str,
    ) -> OrchestrationResult<StatementResult>;
}
