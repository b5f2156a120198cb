//! # Result-Accumulation Poller
//!
//! Polls a result-count query until the observed count meets or exceeds the
//! expected total: `ExecuteCountQuery -> DescribeStatus wait-loop ->
//! FetchCount -> { observed >= expected: Success; else Wait(longDelay) ->
//! ExecuteCountQuery }`.
//!
//! The comparison is `>=`, never strict equality: downstream consumers may
//! process more rows than strictly expected (retried deliveries) and that
//! must not block completion. This poller is the only place an orchestration
//! run reaches final success.

use crate::config::OrchestrationConfig;
use crate::error::OrchestrationResult;
use crate::executor::{ExecutionRequest, RemoteStatementExecutor, StatementResult};
use crate::orchestration::statement_task::remote_call;
use crate::orchestration::status_poller::StatusPoller;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

/// Progress of one accumulation run; private to the run, destroyed on the
/// terminal transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    pub expected_total: i64,
    pub observed_count: i64,
}

impl PollState {
    /// Terminal condition for the accumulation loop
    pub fn is_satisfied(&self) -> bool {
        self.observed_count >= self.expected_total
    }
}

/// Extract the count-bearing field from a count-query result
fn observed_count(result: &StatementResult) -> i64 {
    result
        .records
        .first()
        .and_then(|record| record.as_i64())
        .unwrap_or(result.total_rows)
}

/// Polls an accumulating result count until it reaches the expected total
pub struct ResultAccumulationPoller {
    executor: Arc<dyn RemoteStatementExecutor>,
    poller: StatusPoller,
    config: OrchestrationConfig,
}

impl ResultAccumulationPoller {
    pub fn new(
        executor: Arc<dyn RemoteStatementExecutor>,
        poller: StatusPoller,
        config: OrchestrationConfig,
    ) -> Self {
        Self {
            executor,
            poller,
            config,
        }
    }

    /// Re-execute `count_statement` until it reports at least
    /// `expected_total` rows. Returns the final observed state.
    pub async fn await_expected_total(
        &self,
        count_statement: &str,
        expected_total: i64,
    ) -> OrchestrationResult<PollState> {
        let mut state = PollState {
            expected_total,
            observed_count: 0,
        };

        loop {
            let request =
                ExecutionRequest::new(count_statement, Uuid::new_v4().to_string());
            let execution_id = remote_call(
                "execute_count_statement",
                self.config.heartbeat,
                self.executor.execute_statement(&request),
            )
            .await?;

            self.poller
                .wait_until_terminal(&execution_id, self.config.describe_poll_delay)
                .await?;

            let result = self.executor.get_statement_result(&execution_id).await?;
            state.observed_count = observed_count(&result);

            if state.is_satisfied() {
                info!(
                    observed = state.observed_count,
                    expected = state.expected_total,
                    "Expected result total reached"
                );
                return Ok(state);
            }

            debug!(
                observed = state.observed_count,
                expected = state.expected_total,
                "Result total not reached yet, waiting"
            );
            sleep(self.config.result_poll_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestrationError;
    use crate::executor::StatementDescription;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Executor double scripting one count observation per poll round
    struct CountingExecutor {
        counts: Mutex<std::vec::IntoIter<i64>>,
        executions: Mutex<usize>,
    }

    impl CountingExecutor {
        fn new(counts: Vec<i64>) -> Self {
            Self {
                counts: Mutex::new(counts.into_iter()),
                executions: Mutex::new(0),
            }
        }

        fn execution_count(&self) -> usize {
            *self.executions.lock()
        }
    }

    #[async_trait]
    impl RemoteStatementExecutor for CountingExecutor {
        async fn execute_statement(
            &self,
            _request: &ExecutionRequest,
        ) -> OrchestrationResult<String> {
            let mut executions = self.executions.lock();
            *executions += 1;
            Ok(format!("count-exec-{executions}"))
        }

        async fn describe_statement(
            &self,
            execution_id: &str,
        ) -> OrchestrationResult<StatementDescription> {
            Ok(StatementDescription {
                id: execution_id.to_string(),
                status: "FINISHED".to_string(),
                query_string: None,
            })
        }

        async fn get_statement_result(
            &self,
            _execution_id: &str,
        ) -> OrchestrationResult<StatementResult> {
            let count = self
                .counts
                .lock()
                .next()
                .expect("poller asked for more counts than scripted");
            Ok(StatementResult::count(count))
        }
    }

    fn poller_over(executor: Arc<CountingExecutor>) -> ResultAccumulationPoller {
        let status_poller = StatusPoller::new(executor.clone(), None);
        ResultAccumulationPoller::new(executor, status_poller, OrchestrationConfig::for_testing())
    }

    #[test]
    fn test_satisfaction_is_gte_not_equality() {
        assert!(PollState {
            expected_total: 10,
            observed_count: 10
        }
        .is_satisfied());
        assert!(PollState {
            expected_total: 10,
            observed_count: 12
        }
        .is_satisfied());
        assert!(!PollState {
            expected_total: 10,
            observed_count: 9
        }
        .is_satisfied());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_success_when_total_met() {
        let executor = Arc::new(CountingExecutor::new(vec![40, 90, 120]));
        let poller = poller_over(executor.clone());

        let state = poller
            .await_expected_total("select count(*) from exp_data", 120)
            .await
            .unwrap();
        assert_eq!(state.observed_count, 120);
        assert_eq!(executor.execution_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_boundary_one_below_expected_keeps_polling() {
        // observed == expected - 1 must poll again; only >= terminates
        let executor = Arc::new(CountingExecutor::new(vec![119, 121]));
        let poller = poller_over(executor.clone());

        let state = poller
            .await_expected_total("select count(*) from exp_data", 120)
            .await
            .unwrap();
        assert_eq!(state.observed_count, 121);
        assert_eq!(executor.execution_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overshoot_tolerated() {
        let executor = Arc::new(CountingExecutor::new(vec![150]));
        let poller = poller_over(executor);

        let state = poller
            .await_expected_total("select count(*) from exp_data", 120)
            .await
            .unwrap();
        assert!(state.is_satisfied());
        assert_eq!(state.observed_count, 150);
    }

    /// Executor whose describe always reports ABORTED
    struct AbortingExecutor;

    #[async_trait]
    impl RemoteStatementExecutor for AbortingExecutor {
        async fn execute_statement(
            &self,
            _request: &ExecutionRequest,
        ) -> OrchestrationResult<String> {
            Ok("count-exec-1".to_string())
        }

        async fn describe_statement(
            &self,
            execution_id: &str,
        ) -> OrchestrationResult<StatementDescription> {
            Ok(StatementDescription {
                id: execution_id.to_string(),
                status: "ABORTED".to_string(),
                query_string: None,
            })
        }

        async fn get_statement_result(
            &self,
            _execution_id: &str,
        ) -> OrchestrationResult<StatementResult> {
            unreachable!("aborted statements have no result")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_query_failure_propagates() {
        let executor = Arc::new(AbortingExecutor);
        let status_poller = StatusPoller::new(executor.clone(), None);
        let poller = ResultAccumulationPoller::new(
            executor,
            status_poller,
            OrchestrationConfig::for_testing(),
        );

        let err = poller
            .await_expected_total("select count(*) from exp_data", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::ExecutorFailure { .. }));
    }
}
