//! Callback registry for task-token completion signals.
//!
//! Replaces the managed runtime's task-token plumbing with an explicit
//! correlation-ID-keyed registry: a task registers before submitting its
//! statement, suspends on the returned receiver, and the executor (or the
//! transport delivering its completion events) resolves the token exactly
//! once. Duplicate signals for the same correlation id are dropped.

use crate::executor::types::ExecutionHandle;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Completion signal delivered through a callback token
#[derive(Debug, Clone)]
pub enum StatementOutcome {
    /// Statement finished successfully
    Finished(ExecutionHandle),
    /// Executor reported a terminal failure
    Failed {
        execution_id: String,
        status: String,
        error: Option<String>,
    },
}

/// Correlation-ID-keyed registry of pending completion callbacks
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    pending: Arc<DashMap<String, oneshot::Sender<StatementOutcome>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending callback and return the receiver the caller
    /// suspends on. Re-registering an in-flight correlation id replaces the
    /// previous sender, which closes the stale receiver.
    pub fn register(&self, correlation_id: &str) -> oneshot::Receiver<StatementOutcome> {
        let (tx, rx) = oneshot::channel();
        if self.pending.insert(correlation_id.to_string(), tx).is_some() {
            warn!(correlation_id, "Replaced in-flight callback registration");
        }
        debug!(correlation_id, "Registered completion callback");
        rx
    }

    /// Resolve a pending callback. Only the first signal for a correlation
    /// id is honored; later ones return false and are dropped.
    pub fn complete(&self, correlation_id: &str, outcome: StatementOutcome) -> bool {
        match self.pending.remove(correlation_id) {
            Some((_, tx)) => {
                debug!(correlation_id, "Delivering completion callback");
                // A send failure means the waiting task already gave up
                // (heartbeat timeout); the outcome is dropped either way.
                tx.send(outcome).is_ok()
            }
            None => {
                warn!(correlation_id, "Ignoring duplicate or unknown callback");
                false
            }
        }
    }

    /// Drop a registration without resolving it (heartbeat expiry cleanup)
    pub fn forget(&self, correlation_id: &str) {
        self.pending.remove(correlation_id);
    }

    /// Number of callbacks currently awaiting completion
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
