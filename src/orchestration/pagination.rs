//! # Pagination Sub-workflow
//!
//! Avoids materializing unbounded ID sets in one statement by querying pages
//! of IDs at a running offset. Each round: compute the next page statement
//! (pure, local), execute it through the statement task, wait for FINISHED
//! through the status poller, fetch the row batch, and package a cursor for
//! the fan-out stage.
//!
//! The page statement is a pure function of the running offset and the
//! original filter statement; the running offset equals the total number of
//! rows seen so far, so no offset is computed twice within one run.

use crate::config::OrchestrationConfig;
use crate::error::OrchestrationResult;
use crate::executor::RemoteStatementExecutor;
use crate::orchestration::statement_task::StatementExecutionTask;
use crate::orchestration::status_poller::StatusPoller;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Plan for one pagination round, computed before any remote call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagePlan {
    /// 1-based round counter
    pub index: u32,
    /// The original ID filter statement, carried verbatim between rounds
    pub id_statement: String,
    /// The page statement for this round (`id_statement` + order/limit/offset)
    pub page_statement: String,
    /// Rows seen before this round; doubles as this round's offset
    pub total_count: i64,
    /// Run-scoped experiment identifier for downstream result accounting
    pub execution_id: String,
    /// Count query the result-accumulation poller will execute
    pub result_count_statement: String,
}

impl PagePlan {
    /// Plan the first page: offset 0, freshly minted execution id and
    /// result-count statement over `result_table`
    pub fn first(id_statement: &str, page_size: i64, result_table: &str) -> Self {
        let execution_id = format!("EXP-{}", Utc::now().format("%Y%m%d-%H%M%S"));
        let result_count_statement = format!(
            "select count(*) from {result_table} where executionid='{execution_id}'"
        );
        Self {
            index: 1,
            id_statement: id_statement.to_string(),
            page_statement: page_statement(id_statement, page_size, 0),
            total_count: 0,
            execution_id,
            result_count_statement,
        }
    }

    /// Plan the next page after a round that returned `rows_in_page` rows.
    /// The accumulated total advances by exactly that amount and becomes the
    /// next offset.
    pub fn advance(&self, rows_in_page: i64, page_size: i64) -> Self {
        let total_count = self.total_count + rows_in_page.max(0);
        Self {
            index: self.index + 1,
            id_statement: self.id_statement.clone(),
            page_statement: page_statement(&self.id_statement, page_size, total_count),
            total_count,
            execution_id: self.execution_id.clone(),
            result_count_statement: self.result_count_statement.clone(),
        }
    }
}

fn page_statement(id_statement: &str, page_size: i64, offset: i64) -> String {
    format!("{id_statement} order by id limit {page_size} offset {offset}")
}

/// Cursor produced by one pagination round and consumed immediately by the
/// fan-out stage. Only `total_seen_so_far` survives across rounds.
#[derive(Debug, Clone)]
pub struct PageCursor {
    pub page_statement: String,
    pub id_statement: String,
    pub rows_in_page: i64,
    pub total_seen_so_far: i64,
    pub records: Vec<serde_json::Value>,
}

impl PageCursor {
    /// Termination signal for the outer driver: no more pages
    pub fn is_empty(&self) -> bool {
        self.rows_in_page <= 0
    }
}

/// Executes pagination rounds against the remote executor
pub struct PaginationWorkflow {
    task: StatementExecutionTask,
    poller: StatusPoller,
    executor: Arc<dyn RemoteStatementExecutor>,
    config: OrchestrationConfig,
}

impl PaginationWorkflow {
    pub fn new(
        task: StatementExecutionTask,
        poller: StatusPoller,
        executor: Arc<dyn RemoteStatementExecutor>,
        config: OrchestrationConfig,
    ) -> Self {
        Self {
            task,
            poller,
            executor,
            config,
        }
    }

    /// Run one pagination round: execute the planned page statement, wait
    /// for it to finish, and retrieve the ID batch.
    pub async fn run_round(&self, run_id: Uuid, plan: &PagePlan) -> OrchestrationResult<PageCursor> {
        info!(
            %run_id,
            index = plan.index,
            offset = plan.total_count,
            "Starting pagination round"
        );

        let handle = self.task.execute(run_id, &plan.page_statement).await?;

        if !handle.status.is_terminal() {
            self.poller
                .wait_until_terminal(&handle.execution_id, self.config.status_poll_delay)
                .await?;
        }

        let result = self
            .executor
            .get_statement_result(&handle.execution_id)
            .await?;

        let rows_in_page = result.records.len() as i64;
        if result.total_rows != rows_in_page {
            warn!(
                %run_id,
                total_rows = result.total_rows,
                rows_in_page,
                "Executor row count disagrees with record batch length"
            );
        }

        let cursor = PageCursor {
            page_statement: plan.page_statement.clone(),
            id_statement: plan.id_statement.clone(),
            rows_in_page,
            total_seen_so_far: plan.total_count + rows_in_page,
            records: result.records,
        };

        debug!(
            %run_id,
            rows_in_page = cursor.rows_in_page,
            total_seen = cursor.total_seen_so_far,
            "Pagination round complete"
        );
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_plan_starts_at_offset_zero() {
        let plan = PagePlan::first("select id from molecular_data where mw < 500", 10_000, "exp_data");
        assert_eq!(plan.index, 1);
        assert_eq!(plan.total_count, 0);
        assert_eq!(
            plan.page_statement,
            "select id from molecular_data where mw < 500 order by id limit 10000 offset 0"
        );
        assert!(plan.execution_id.starts_with("EXP-"));
        assert!(plan
            .result_count_statement
            .contains(&format!("executionid='{}'", plan.execution_id)));
        assert!(plan.result_count_statement.starts_with("select count(*) from exp_data"));
    }

    #[test]
    fn test_advance_telescopes_totals() {
        let plan = PagePlan::first("select id from t", 100, "exp_data");
        let second = plan.advance(100, 100);
        assert_eq!(second.index, 2);
        assert_eq!(second.total_count, 100);
        assert!(second.page_statement.ends_with("offset 100"));

        let third = second.advance(40, 100);
        assert_eq!(third.total_count, 140);
        assert!(third.page_statement.ends_with("offset 140"));

        // Execution id and count statement are minted once per run
        assert_eq!(third.execution_id, plan.execution_id);
        assert_eq!(third.result_count_statement, plan.result_count_statement);
    }

    #[test]
    fn test_advance_never_decreases_total() {
        let plan = PagePlan::first("select id from t", 100, "exp_data");
        let next = plan.advance(-5, 100);
        assert_eq!(next.total_count, 0);
    }

    #[test]
    fn test_empty_cursor_signals_termination() {
        let cursor = PageCursor {
            page_statement: String::new(),
            id_statement: String::new(),
            rows_in_page: 0,
            total_seen_so_far: 240,
            records: vec![],
        };
        assert!(cursor.is_empty());
    }
}
