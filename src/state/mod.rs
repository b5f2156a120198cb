//! # Run State Module
//!
//! Explicit persisted state for orchestration runs, replacing the managed
//! workflow runtime's durable suspension. A run suspends by saving its
//! current phase plus accumulated variables and returning; it resumes by
//! loading the record and re-entering the state machine at the recorded
//! point.

use crate::error::{OrchestrationError, OrchestrationResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Phases of an orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Run record created, nothing submitted yet
    Created,
    /// Statement submitted, suspended on the callback token; covers the
    /// status polling that follows, which holds no state worth resuming from
    AwaitingCallback,
    /// Computing and executing a pagination round
    Paginating,
    /// Fanning an ID batch out to the downstream queue
    Dispatching,
    /// Polling the accumulated result count
    PollingResults,
    /// Run reached final success
    Succeeded,
    /// Run reached a terminal failure
    Failed,
}

impl RunPhase {
    /// Check if this is a terminal phase (no further transitions occur)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl Default for RunPhase {
    fn default() -> Self {
        Self::Created
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::AwaitingCallback => write!(f, "awaiting_callback"),
            Self::Paginating => write!(f, "paginating"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::PollingResults => write!(f, "polling_results"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for RunPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "awaiting_callback" => Ok(Self::AwaitingCallback),
            "paginating" => Ok(Self::Paginating),
            "dispatching" => Ok(Self::Dispatching),
            "polling_results" => Ok(Self::PollingResults),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid run phase: {s}")),
        }
    }
}

/// Persisted record of one orchestration run: current phase plus the
/// accumulated variables needed to re-enter the state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub phase: RunPhase,
    pub variables: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            phase: RunPhase::default(),
            variables: serde_json::Value::Null,
            updated_at: Utc::now(),
        }
    }
}

/// Persistence seam for run records.
///
/// Implementations must refuse to move a run out of a terminal phase:
/// `Succeeded` and `Failed` are immutable once reached.
pub trait RunStateStore: Send + Sync {
    /// Persist the run's current phase and variables
    fn save(&self, record: RunRecord) -> OrchestrationResult<()>;

    /// Load a run record by id
    fn load(&self, run_id: Uuid) -> OrchestrationResult<Option<RunRecord>>;

    /// Remove a run record once its outcome has been consumed
    fn delete(&self, run_id: Uuid) -> OrchestrationResult<()>;
}

/// In-memory run state store for embedded and test deployments
#[derive(Clone, Default)]
pub struct InMemoryRunStateStore {
    records: Arc<DashMap<Uuid, RunRecord>>,
}

impl InMemoryRunStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored run record
    pub fn all_records(&self) -> Vec<RunRecord> {
        self.records.iter().map(|r| r.clone()).collect()
    }
}

impl RunStateStore for InMemoryRunStateStore {
    fn save(&self, mut record: RunRecord) -> OrchestrationResult<()> {
        if let Some(existing) = self.records.get(&record.run_id) {
            if existing.phase.is_terminal() && existing.phase != record.phase {
                return Err(OrchestrationError::state_store(format!(
                    "Run {} is already terminal ({}), refusing transition to {}",
                    record.run_id, existing.phase, record.phase
                )));
            }
        }
        record.updated_at = Utc::now();
        self.records.insert(record.run_id, record);
        Ok(())
    }

    fn load(&self, run_id: Uuid) -> OrchestrationResult<Option<RunRecord>> {
        Ok(self.records.get(&run_id).map(|r| r.clone()))
    }

    fn delete(&self, run_id: Uuid) -> OrchestrationResult<()> {
        self.records.remove(&run_id);
        Ok(())
    }
}
