//! Shared test doubles for integration tests: a scripted remote executor
//! and an in-memory record queue that stands in for the downstream
//! queue-plus-consumer pair.

use async_trait::async_trait;
use dashmap::DashMap;
use dockflow_core::error::{OrchestrationError, OrchestrationResult};
use dockflow_core::executor::{
    CallbackRegistry, ExecutionHandle, ExecutionRequest, RemoteStatementExecutor,
    StatementDescription, StatementOutcome, StatementResult, StatementStatus,
};
use dockflow_core::messaging::{MessagingError, MessagingResult, RecordQueue};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory queue whose published count doubles as the downstream
/// consumer's processed-row count (an instantly-processing consumer).
/// Tracks the high-water mark of concurrently in-flight publishes.
pub struct InMemoryRecordQueue {
    messages: Mutex<Vec<serde_json::Value>>,
    in_flight: AtomicI64,
    high_water: AtomicI64,
    fail_after: Option<usize>,
}

impl InMemoryRecordQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
            in_flight: AtomicI64::new(0),
            high_water: AtomicI64::new(0),
            fail_after: None,
        })
    }

    /// Queue that fails every publish once `fail_after` messages succeeded
    pub fn failing_after(fail_after: usize) -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
            in_flight: AtomicI64::new(0),
            high_water: AtomicI64::new(0),
            fail_after: Some(fail_after),
        })
    }

    pub fn published(&self) -> Vec<serde_json::Value> {
        self.messages.lock().clone()
    }

    pub fn published_count(&self) -> i64 {
        self.messages.lock().len() as i64
    }

    pub fn high_water_mark(&self) -> i64 {
        self.high_water.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordQueue for InMemoryRecordQueue {
    fn queue_name(&self) -> &str {
        "record_queue"
    }

    async fn publish(&self, message: &serde_json::Value) -> MessagingResult<i64> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(current, Ordering::SeqCst);

        // Let sibling publishes overlap so the high-water mark is meaningful
        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut messages = self.messages.lock();
        if let Some(fail_after) = self.fail_after {
            if messages.len() >= fail_after {
                return Err(MessagingError::queue_operation(
                    "record_queue",
                    "send",
                    "simulated transport failure",
                ));
            }
        }
        messages.push(message.clone());
        Ok(messages.len() as i64)
    }
}

/// Scripted remote executor backing a full pipeline run.
///
/// Page statements (`... limit L offset O`) return slices of a fixed ID
/// universe and complete their callback tokens; count statements report the
/// linked queue's published count unless a count script overrides it.
pub struct MockStatementExecutor {
    callbacks: CallbackRegistry,
    total_ids: i64,
    /// Number of RUNNING describes before FINISHED, per execution
    polls_before_finished: usize,
    queue: Option<Arc<InMemoryRecordQueue>>,
    count_script: Mutex<Vec<i64>>,
    executions: AtomicUsize,
    statements: DashMap<String, String>,
    describe_counts: DashMap<String, usize>,
    page_offsets: Mutex<Vec<i64>>,
    deliver_callbacks: bool,
}

impl MockStatementExecutor {
    fn base(callbacks: CallbackRegistry, total_ids: i64) -> Self {
        Self {
            callbacks,
            total_ids,
            polls_before_finished: 1,
            queue: None,
            count_script: Mutex::new(Vec::new()),
            executions: AtomicUsize::new(0),
            statements: DashMap::new(),
            describe_counts: DashMap::new(),
            page_offsets: Mutex::new(Vec::new()),
            deliver_callbacks: true,
        }
    }

    pub fn with_queue(
        callbacks: CallbackRegistry,
        total_ids: i64,
        queue: Arc<InMemoryRecordQueue>,
    ) -> Arc<Self> {
        let mut executor = Self::base(callbacks, total_ids);
        executor.queue = Some(queue);
        Arc::new(executor)
    }

    /// Executor that never delivers completion callbacks (heartbeat expiry)
    pub fn silent(callbacks: CallbackRegistry, total_ids: i64) -> Arc<Self> {
        let mut executor = Self::base(callbacks, total_ids);
        executor.deliver_callbacks = false;
        Arc::new(executor)
    }

    /// Scripted observations for count queries, consumed front to back
    pub fn script_counts(&self, counts: Vec<i64>) {
        *self.count_script.lock() = counts;
    }

    pub fn page_offsets(&self) -> Vec<i64> {
        self.page_offsets.lock().clone()
    }

    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    fn is_count_statement(statement: &str) -> bool {
        statement.contains("count(*)")
    }

    /// Parse `... limit L offset O` from a page statement
    fn parse_page_bounds(statement: &str) -> (i64, i64) {
        let mut parts = statement.split_whitespace().rev();
        let offset: i64 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .expect("page statement missing offset");
        assert_eq!(parts.next(), Some("offset"));
        let limit: i64 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .expect("page statement missing limit");
        (limit, offset)
    }
}

#[async_trait]
impl RemoteStatementExecutor for MockStatementExecutor {
    async fn execute_statement(&self, request: &ExecutionRequest) -> OrchestrationResult<String> {
        let sequence = self.executions.fetch_add(1, Ordering::SeqCst);
        let execution_id = format!("exec-{sequence}");
        self.statements
            .insert(execution_id.clone(), request.statement.clone());

        if !Self::is_count_statement(&request.statement) {
            let (_, offset) = Self::parse_page_bounds(&request.statement);
            self.page_offsets.lock().push(offset);
        }

        if self.deliver_callbacks {
            let callbacks = self.callbacks.clone();
            let correlation_id = request.correlation_id.clone();
            let handle = ExecutionHandle::new(&execution_id, StatementStatus::Running);
            tokio::spawn(async move {
                callbacks.complete(
                    &correlation_id,
                    StatementOutcome::Finished(handle),
                );
            });
        }

        Ok(execution_id)
    }

    async fn describe_statement(
        &self,
        execution_id: &str,
    ) -> OrchestrationResult<StatementDescription> {
        let mut seen = self
            .describe_counts
            .entry(execution_id.to_string())
            .or_insert(0);
        *seen += 1;
        let status = if *seen > self.polls_before_finished {
            "FINISHED"
        } else {
            "RUNNING"
        };
        Ok(StatementDescription {
            id: execution_id.to_string(),
            status: status.to_string(),
            query_string: self.statements.get(execution_id).map(|s| s.clone()),
        })
    }

    async fn get_statement_result(
        &self,
        execution_id: &str,
    ) -> OrchestrationResult<StatementResult> {
        let statement = self
            .statements
            .get(execution_id)
            .map(|s| s.clone())
            .ok_or_else(|| {
                OrchestrationError::internal(format!("Unknown execution {execution_id}"))
            })?;

        if Self::is_count_statement(&statement) {
            let mut script = self.count_script.lock();
            let count = if script.is_empty() {
                self.queue
                    .as_ref()
                    .map(|q| q.published_count())
                    .unwrap_or(0)
            } else {
                script.remove(0)
            };
            return Ok(StatementResult::count(count));
        }

        let (limit, offset) = Self::parse_page_bounds(&statement);
        let end = (offset + limit).min(self.total_ids);
        let records: Vec<serde_json::Value> = (offset..end.max(offset))
            .map(|id| serde_json::json!({ "id": id }))
            .collect();
        Ok(StatementResult::records(records))
    }
}
