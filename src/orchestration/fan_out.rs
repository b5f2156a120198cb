//! # Bounded Fan-out Dispatcher
//!
//! Dispatches each record of an ID batch to the downstream queue with a
//! capped number of concurrently in-flight publishes. The queue owns
//! durability (at-least-once); this component is fire-and-forget once items
//! are queued, so per-item acknowledgements are discarded.
//!
//! Any publish failure routes the whole round to the dedicated dispatch
//! failure class, which keeps fan-out failures distinguishable from
//! statement-execution failures in monitoring.

use crate::error::{OrchestrationError, OrchestrationResult};
use crate::messaging::RecordQueue;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info};

/// Capped-concurrency dispatcher over a record queue
pub struct FanOutDispatcher {
    queue: Arc<dyn RecordQueue>,
    concurrency: usize,
}

impl FanOutDispatcher {
    /// `concurrency` must be positive; `OrchestrationConfig::validate`
    /// enforces this before a pipeline is wired
    pub fn new(queue: Arc<dyn RecordQueue>, concurrency: usize) -> Self {
        Self { queue, concurrency }
    }

    /// Publish every record in the batch, at most `concurrency` in flight at
    /// once. Each record is dispatched exactly once per round; relative
    /// order within the round is not guaranteed. The first failure
    /// short-circuits the round.
    pub async fn dispatch(&self, records: &[serde_json::Value]) -> OrchestrationResult<()> {
        if records.is_empty() {
            debug!(queue_name = self.queue.queue_name(), "Empty batch, nothing to dispatch");
            return Ok(());
        }

        let queue_name = self.queue.queue_name().to_string();
        debug!(
            queue_name = %queue_name,
            batch_size = records.len(),
            concurrency = self.concurrency,
            "Dispatching record batch"
        );

        stream::iter(records.iter().cloned())
            .map(|record| {
                let queue = Arc::clone(&self.queue);
                async move { queue.publish(&record).await }
            })
            .buffer_unordered(self.concurrency)
            .map_err(|e| {
                OrchestrationError::dispatch_failure(self.queue.queue_name(), e.to_string())
            })
            // Message ids are dropped: the downstream consumer owns outcomes
            .try_for_each(|_message_id| async { Ok(()) })
            .await?;

        info!(
            queue_name = %queue_name,
            batch_size = records.len(),
            "Record batch dispatched"
        );
        Ok(())
    }
}
