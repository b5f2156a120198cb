//! # Status Polling Loop
//!
//! Repeatedly checks the execution status of a submitted statement with a
//! fixed inter-poll delay, branching on terminal vs. non-terminal status:
//! `Wait(delay) -> CheckStatus -> { FINISHED: proceed; ABORTED|FAILED:
//! terminal-fail; otherwise: Wait(delay) }`.
//!
//! There is no retry count at this layer by default. The remote executor is
//! the authority on terminal status and is trusted to eventually report one;
//! an optional poll bound converts that trust into a `DeadlineExceeded`
//! failure for environments without the guarantee.

use crate::error::{OrchestrationError, OrchestrationResult};
use crate::executor::{RemoteStatementExecutor, StatementDescription, StatementStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Outcome of classifying one observed status string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCheck {
    /// Terminal success: stop polling and proceed
    Proceed,
    /// Terminal failure with the observed status
    Fail(String),
    /// Non-terminal or unrecognized: keep polling
    KeepPolling,
}

/// Pure transition function over observed status strings.
///
/// Any status other than the three recognized terminals keeps the loop
/// polling. This permissive default tolerates future or intermediate
/// statuses the executor may report.
pub fn classify_status(status: &str) -> StatusCheck {
    match status.parse::<StatementStatus>() {
        Ok(StatementStatus::Finished) => StatusCheck::Proceed,
        Ok(parsed) if parsed.is_failure() => StatusCheck::Fail(status.to_string()),
        _ => StatusCheck::KeepPolling,
    }
}

/// Result of a completed polling loop
#[derive(Debug, Clone)]
pub struct PollReport {
    /// The terminal describe response
    pub description: StatementDescription,
    /// Number of non-terminal checks observed before the terminal one
    pub wait_cycles: u32,
}

/// Fixed-delay status poller over the remote executor
pub struct StatusPoller {
    executor: Arc<dyn RemoteStatementExecutor>,
    max_polls: Option<u32>,
}

impl StatusPoller {
    pub fn new(executor: Arc<dyn RemoteStatementExecutor>, max_polls: Option<u32>) -> Self {
        Self {
            executor,
            max_polls,
        }
    }

    /// Poll `execution_id` every `delay` until a terminal status is
    /// observed. Returns the terminal describe response on FINISHED; fails
    /// the run on ABORTED/FAILED or when the optional poll bound is hit.
    pub async fn wait_until_terminal(
        &self,
        execution_id: &str,
        delay: Duration,
    ) -> OrchestrationResult<PollReport> {
        let mut wait_cycles: u32 = 0;
        let mut polls: u32 = 0;

        loop {
            sleep(delay).await;

            let description = self.executor.describe_statement(execution_id).await?;
            polls += 1;

            match classify_status(&description.status) {
                StatusCheck::Proceed => {
                    debug!(execution_id, wait_cycles, "Statement reached FINISHED");
                    return Ok(PollReport {
                        description,
                        wait_cycles,
                    });
                }
                StatusCheck::Fail(status) => {
                    warn!(execution_id, status = %status, "Statement reached terminal failure");
                    return Err(OrchestrationError::executor_failure(execution_id, status));
                }
                StatusCheck::KeepPolling => {
                    debug!(execution_id, status = %description.status, "Statement still pending");
                    wait_cycles += 1;
                    if let Some(max) = self.max_polls {
                        if polls >= max {
                            return Err(OrchestrationError::deadline_exceeded(
                                "describe_statement",
                                polls,
                            ));
                        }
                    }
                }
            }
        }
    }
}
