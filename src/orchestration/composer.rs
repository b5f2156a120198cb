//! # Workflow Composer
//!
//! Chains independently-built sub-workflows into one ordered execution
//! sequence. Each sub-workflow is invoked with run-to-completion semantics:
//! its own poll and retry loops fully resolve before the next stage starts,
//! because downstream stages depend on the resources the earlier ones
//! produce.
//!
//! Execution order equals append order. The first failure aborts the chain
//! with no further invocations and no rollback.

use crate::error::OrchestrationResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// A named, independently-runnable sub-workflow handle.
///
/// Inputs and outputs are JSON values; named fields consumed by later stages
/// (`index`, `totalCount`, `rows`, `executionId`, ...) are passed through
/// verbatim.
#[async_trait]
pub trait SubWorkflow: Send + Sync {
    /// Stable name used in logs and failure reporting
    fn name(&self) -> &str;

    /// Run this sub-workflow to completion
    async fn run(&self, input: serde_json::Value) -> OrchestrationResult<serde_json::Value>;
}

/// Builder for a workflow chain; append-only during construction
#[derive(Default)]
pub struct WorkflowChainBuilder {
    stages: Vec<Arc<dyn SubWorkflow>>,
}

impl WorkflowChainBuilder {
    /// Append a sub-workflow; it will execute after everything already
    /// appended
    pub fn append(mut self, stage: Arc<dyn SubWorkflow>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Freeze the chain; execution order is fixed from here on
    pub fn build(self) -> WorkflowChain {
        WorkflowChain {
            stages: self.stages,
        }
    }
}

/// An ordered, immutable sequence of sub-workflows
pub struct WorkflowChain {
    stages: Vec<Arc<dyn SubWorkflow>>,
}

impl WorkflowChain {
    pub fn builder() -> WorkflowChainBuilder {
        WorkflowChainBuilder::default()
    }

    /// Declared execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in declared order, feeding each stage's output to the
    /// next. The first failure propagates immediately; later stages are
    /// never invoked.
    pub async fn execute(
        &self,
        input: serde_json::Value,
    ) -> OrchestrationResult<serde_json::Value> {
        let mut current = input;

        for stage in &self.stages {
            info!(stage = stage.name(), "Starting sub-workflow");
            match stage.run(current).await {
                Ok(output) => {
                    info!(stage = stage.name(), "Sub-workflow complete");
                    current = output;
                }
                Err(e) => {
                    error!(stage = stage.name(), error = %e, "Sub-workflow failed, aborting chain");
                    return Err(e);
                }
            }
        }

        Ok(current)
    }
}
