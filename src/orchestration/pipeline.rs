//! # Statement Pipeline
//!
//! Top-level assembly of the orchestration engine: an ID-emission loop that
//! alternates pagination rounds with bounded fan-out dispatch until a round
//! comes back empty, composed ahead of the result-accumulation poller that
//! holds the pipeline's only path to final success.
//!
//! Stages exchange a JSON document whose named fields (`index`,
//! `sqlStatement`, `idSqlStatement`, `totalCount`, `resultCountSql`,
//! `executionId`, `rows`, `records`, `runId`) are passed through verbatim,
//! so each stage stays independently runnable.

use crate::config::OrchestrationConfig;
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::executor::{CallbackRegistry, RemoteStatementExecutor};
use crate::messaging::RecordQueue;
use crate::orchestration::composer::{SubWorkflow, WorkflowChain};
use crate::orchestration::fan_out::FanOutDispatcher;
use crate::orchestration::pagination::{PagePlan, PaginationWorkflow};
use crate::orchestration::result_poller::ResultAccumulationPoller;
use crate::orchestration::statement_task::StatementExecutionTask;
use crate::orchestration::status_poller::StatusPoller;
use crate::state::{RunPhase, RunRecord, RunStateStore};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Table the downstream consumers write processed rows into; the
/// result-count statement is derived from it once per run
const DEFAULT_RESULT_TABLE: &str = "exp_data";

fn require_str(input: &Value, field: &str) -> OrchestrationResult<String> {
    input[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| OrchestrationError::internal(format!("Missing workflow field {field}")))
}

fn require_i64(input: &Value, field: &str) -> OrchestrationResult<i64> {
    input[field]
        .as_i64()
        .ok_or_else(|| OrchestrationError::internal(format!("Missing workflow field {field}")))
}

fn run_id_of(input: &Value) -> OrchestrationResult<Uuid> {
    require_str(input, "runId")?
        .parse()
        .map_err(|e| OrchestrationError::internal(format!("Invalid runId: {e}")))
}

/// One pagination round as a composable sub-workflow.
///
/// First invocation plans page one from `idSqlStatement`; later invocations
/// reconstruct the carried plan and advance it by the previous round's
/// `rows`, so the emitted `totalCount` always equals the offset just
/// queried.
pub struct EmitIdsWorkflow {
    pagination: PaginationWorkflow,
    state_store: Arc<dyn RunStateStore>,
    page_size: i64,
    result_table: String,
}

impl EmitIdsWorkflow {
    pub fn new(
        pagination: PaginationWorkflow,
        state_store: Arc<dyn RunStateStore>,
        page_size: i64,
        result_table: String,
    ) -> Self {
        Self {
            pagination,
            state_store,
            page_size,
            result_table,
        }
    }

    fn plan_from(&self, input: &Value) -> OrchestrationResult<PagePlan> {
        if input["index"].is_null() {
            let id_statement = require_str(input, "idSqlStatement")?;
            return Ok(PagePlan::first(
                &id_statement,
                self.page_size,
                &self.result_table,
            ));
        }

        let previous = PagePlan {
            index: require_i64(input, "index")? as u32,
            id_statement: require_str(input, "idSqlStatement")?,
            page_statement: require_str(input, "sqlStatement")?,
            total_count: require_i64(input, "totalCount")?,
            execution_id: require_str(input, "executionId")?,
            result_count_statement: require_str(input, "resultCountSql")?,
        };
        Ok(previous.advance(require_i64(input, "rows")?, self.page_size))
    }
}

#[async_trait]
impl SubWorkflow for EmitIdsWorkflow {
    fn name(&self) -> &str {
        "emit_ids"
    }

    async fn run(&self, input: Value) -> OrchestrationResult<Value> {
        let run_id = run_id_of(&input)?;
        let plan = self.plan_from(&input)?;

        save_phase(&*self.state_store, run_id, RunPhase::Paginating, &input)?;
        let cursor = self.pagination.run_round(run_id, &plan).await?;

        Ok(json!({
            "runId": run_id.to_string(),
            "index": plan.index,
            "sqlStatement": plan.page_statement,
            "idSqlStatement": plan.id_statement,
            "totalCount": plan.total_count,
            "resultCountSql": plan.result_count_statement,
            "executionId": plan.execution_id,
            "rows": cursor.rows_in_page,
            "records": cursor.records,
        }))
    }
}

/// One fan-out round as a composable sub-workflow. The dispatch result is
/// collapsed out of the observable output: downstream stages see the named
/// cursor fields, never per-item acknowledgements.
pub struct DispatchWorkflow {
    dispatcher: FanOutDispatcher,
    state_store: Arc<dyn RunStateStore>,
}

impl DispatchWorkflow {
    pub fn new(dispatcher: FanOutDispatcher, state_store: Arc<dyn RunStateStore>) -> Self {
        Self {
            dispatcher,
            state_store,
        }
    }
}

#[async_trait]
impl SubWorkflow for DispatchWorkflow {
    fn name(&self) -> &str {
        "dispatch"
    }

    async fn run(&self, input: Value) -> OrchestrationResult<Value> {
        let run_id = run_id_of(&input)?;
        let records = input["records"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        save_phase(&*self.state_store, run_id, RunPhase::Dispatching, &input)?;
        self.dispatcher.dispatch(&records).await?;

        // Drop the consumed batch; everything else passes through verbatim
        let mut output = input;
        if let Some(fields) = output.as_object_mut() {
            fields.remove("records");
        }
        Ok(output)
    }
}

/// ID-emission loop: pagination rounds alternating with dispatch until a
/// round yields no rows. Rounds are strictly sequential; round N+1's offset
/// depends on round N's row count.
pub struct IdEmissionLoop {
    emit_ids: EmitIdsWorkflow,
    dispatch: DispatchWorkflow,
}

impl IdEmissionLoop {
    pub fn new(emit_ids: EmitIdsWorkflow, dispatch: DispatchWorkflow) -> Self {
        Self { emit_ids, dispatch }
    }
}

#[async_trait]
impl SubWorkflow for IdEmissionLoop {
    fn name(&self) -> &str {
        "id_emission_loop"
    }

    async fn run(&self, input: Value) -> OrchestrationResult<Value> {
        let mut cursor = self.emit_ids.run(input).await?;

        while require_i64(&cursor, "rows")? > 0 {
            let dispatched = self.dispatch.run(cursor).await?;
            cursor = self.emit_ids.run(dispatched).await?;
        }

        Ok(cursor)
    }
}

/// Result accumulation as the chain's terminal sub-workflow
pub struct ResultPollingWorkflow {
    poller: ResultAccumulationPoller,
    state_store: Arc<dyn RunStateStore>,
}

impl ResultPollingWorkflow {
    pub fn new(poller: ResultAccumulationPoller, state_store: Arc<dyn RunStateStore>) -> Self {
        Self {
            poller,
            state_store,
        }
    }
}

#[async_trait]
impl SubWorkflow for ResultPollingWorkflow {
    fn name(&self) -> &str {
        "result_polling"
    }

    async fn run(&self, input: Value) -> OrchestrationResult<Value> {
        let run_id = run_id_of(&input)?;
        let count_statement = require_str(&input, "resultCountSql")?;
        let expected_total = require_i64(&input, "totalCount")?;

        save_phase(&*self.state_store, run_id, RunPhase::PollingResults, &input)?;
        let state = self
            .poller
            .await_expected_total(&count_statement, expected_total)
            .await?;

        let mut output = input;
        output["observedCount"] = json!(state.observed_count);
        Ok(output)
    }
}

fn save_phase(
    store: &dyn RunStateStore,
    run_id: Uuid,
    phase: RunPhase,
    variables: &Value,
) -> OrchestrationResult<()> {
    let mut record = store.load(run_id)?.unwrap_or_else(|| RunRecord::new(run_id));
    record.phase = phase;
    record.variables = variables.clone();
    store.save(record)
}

/// Final outcome of a successful pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub total_count: i64,
    pub observed_count: i64,
}

/// The assembled orchestration pipeline
pub struct StatementPipeline {
    chain: WorkflowChain,
    state_store: Arc<dyn RunStateStore>,
}

impl StatementPipeline {
    /// Wire the full pipeline from its external collaborators
    pub fn new(
        executor: Arc<dyn RemoteStatementExecutor>,
        queue: Arc<dyn RecordQueue>,
        callbacks: CallbackRegistry,
        state_store: Arc<dyn RunStateStore>,
        config: OrchestrationConfig,
    ) -> Self {
        Self::with_result_table(
            executor,
            queue,
            callbacks,
            state_store,
            config,
            DEFAULT_RESULT_TABLE,
        )
    }

    /// Wire the pipeline with a custom result table name
    pub fn with_result_table(
        executor: Arc<dyn RemoteStatementExecutor>,
        queue: Arc<dyn RecordQueue>,
        callbacks: CallbackRegistry,
        state_store: Arc<dyn RunStateStore>,
        config: OrchestrationConfig,
        result_table: &str,
    ) -> Self {
        let task = StatementExecutionTask::new(
            executor.clone(),
            callbacks,
            state_store.clone(),
            config.heartbeat,
        );
        let pagination = PaginationWorkflow::new(
            task,
            StatusPoller::new(executor.clone(), config.max_status_polls),
            executor.clone(),
            config.clone(),
        );
        let emit_ids = EmitIdsWorkflow::new(
            pagination,
            state_store.clone(),
            config.page_size,
            result_table.to_string(),
        );
        let dispatch = DispatchWorkflow::new(
            FanOutDispatcher::new(queue, config.fan_out_concurrency),
            state_store.clone(),
        );
        let result_polling = ResultPollingWorkflow::new(
            ResultAccumulationPoller::new(
                executor.clone(),
                StatusPoller::new(executor, config.max_status_polls),
                config.clone(),
            ),
            state_store.clone(),
        );

        let chain = WorkflowChain::builder()
            .append(Arc::new(IdEmissionLoop::new(emit_ids, dispatch)))
            .append(Arc::new(result_polling))
            .build();

        Self { chain, state_store }
    }

    /// Drive one full run for `filter_statement` (the ID query predicate)
    /// to terminal success or failure
    #[instrument(skip(self))]
    pub async fn run(&self, filter_statement: &str) -> OrchestrationResult<PipelineOutcome> {
        let run_id = Uuid::new_v4();
        info!(%run_id, "Starting statement pipeline run");

        self.state_store.save(RunRecord::new(run_id))?;

        let input = json!({
            "runId": run_id.to_string(),
            "idSqlStatement": filter_statement,
        });

        match self.chain.execute(input).await {
            Ok(output) => {
                let outcome = PipelineOutcome {
                    run_id,
                    total_count: require_i64(&output, "totalCount")?,
                    observed_count: require_i64(&output, "observedCount")?,
                };
                save_phase(&*self.state_store, run_id, RunPhase::Succeeded, &output)?;
                info!(%run_id, total = outcome.total_count, "Pipeline run succeeded");
                Ok(outcome)
            }
            Err(e) => {
                // Best effort: the original failure outranks bookkeeping errors
                let _ = save_phase(
                    &*self.state_store,
                    run_id,
                    RunPhase::Failed,
                    &json!({"error": e.to_string()}),
                );
                Err(e)
            }
        }
    }
}
