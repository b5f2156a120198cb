//! # Statement Execution Task
//!
//! Issues one asynchronous statement execution request and suspends until
//! the executor signals completion through the callback registry, or the
//! heartbeat deadline elapses.
//!
//! The remote-call policy here is catch-don't-retry: failures are classified
//! (timeout vs. anything else) and routed straight to the run's terminal
//! failure. Retrying at this layer would risk duplicate execution of a
//! non-idempotent remote statement; the enclosing poll loops provide
//! retry-like behavior at a coarser grain.

use crate::error::{OrchestrationError, OrchestrationResult};
use crate::executor::{
    CallbackRegistry, ExecutionHandle, ExecutionRequest, RemoteStatementExecutor,
    StatementOutcome,
};
use crate::state::{RunPhase, RunRecord, RunStateStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Apply the catch-don't-retry policy to a single remote invocation: bound
/// it by `deadline`, classify an elapsed deadline as the fatal timeout
/// class, and propagate any other failure unchanged. No retries.
pub async fn remote_call<T, F>(
    operation: &str,
    deadline: Duration,
    fut: F,
) -> OrchestrationResult<T>
where
    F: Future<Output = OrchestrationResult<T>>,
{
    match timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(OrchestrationError::timeout(operation, deadline.as_secs())),
    }
}

/// One asynchronous statement submission with callback-token suspension
pub struct StatementExecutionTask {
    executor: Arc<dyn RemoteStatementExecutor>,
    callbacks: CallbackRegistry,
    state_store: Arc<dyn RunStateStore>,
    heartbeat: Duration,
}

impl StatementExecutionTask {
    pub fn new(
        executor: Arc<dyn RemoteStatementExecutor>,
        callbacks: CallbackRegistry,
        state_store: Arc<dyn RunStateStore>,
        heartbeat: Duration,
    ) -> Self {
        Self {
            executor,
            callbacks,
            state_store,
            heartbeat,
        }
    }

    /// Submit `statement` and suspend until completion or heartbeat expiry.
    ///
    /// At most one submission is outstanding per call; a missed heartbeat is
    /// fatal and the statement is *not* resubmitted. Duplicate completion
    /// callbacks are ignored by the registry.
    pub async fn execute(
        &self,
        run_id: Uuid,
        statement: &str,
    ) -> OrchestrationResult<ExecutionHandle> {
        let correlation_id = Uuid::new_v4().to_string();
        let receiver = self.callbacks.register(&correlation_id);

        // Suspension point: persist where we are before handing control to
        // the executor, so a resumed run re-enters here.
        let mut record = self
            .state_store
            .load(run_id)?
            .unwrap_or_else(|| RunRecord::new(run_id));
        record.phase = RunPhase::AwaitingCallback;
        record.variables = serde_json::json!({
            "statement": statement,
            "correlationId": correlation_id,
        });
        self.state_store.save(record)?;

        let request = ExecutionRequest::new(statement, correlation_id.clone());
        debug!(%run_id, correlation_id = %request.correlation_id, "Submitting statement");

        let execution_id = match self.executor.execute_statement(&request).await {
            Ok(id) => id,
            Err(e) => {
                self.callbacks.forget(&correlation_id);
                error!(%run_id, error = %e, "Statement submission failed");
                return Err(e);
            }
        };

        info!(%run_id, execution_id, "Statement submitted, awaiting callback");

        match timeout(self.heartbeat, receiver).await {
            Ok(Ok(StatementOutcome::Finished(handle))) => {
                info!(%run_id, execution_id = %handle.execution_id, "Statement finished");
                Ok(handle)
            }
            Ok(Ok(StatementOutcome::Failed {
                execution_id,
                status,
                error,
            })) => {
                error!(%run_id, execution_id, status, ?error, "Executor reported failure");
                Err(OrchestrationError::executor_failure(execution_id, status))
            }
            Ok(Err(_)) => Err(OrchestrationError::internal(format!(
                "Callback channel for {correlation_id} closed without a signal"
            ))),
            Err(_) => {
                // Heartbeat elapsed. Fatal, exactly once: the statement may
                // already be running remotely, so no resubmission.
                self.callbacks.forget(&correlation_id);
                error!(%run_id, execution_id, "No callback within heartbeat window");
                Err(OrchestrationError::timeout(
                    "execute_statement",
                    self.heartbeat.as_secs(),
                ))
            }
        }
    }
}
