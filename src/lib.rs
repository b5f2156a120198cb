//! # Dockflow Core
//!
//! Asynchronous statement-orchestration engine. Drives long-running remote
//! statements (SQL against a data warehouse behind an opaque executor
//! service) to completion and fans the resulting ID batches out to a
//! downstream queue:
//!
//! - **Statement execution** with task-token callback semantics and
//!   heartbeat-based liveness detection
//! - **Status polling** with fixed inter-poll delays and a permissive
//!   default branch for unrecognized statuses
//! - **Pagination** of large ID sets at a running offset
//! - **Bounded fan-out** of each page to a queue with a concurrency cap
//! - **Result-accumulation polling** until an expected total is reached
//! - **Sequential composition** of sub-workflows with first-failure-wins
//!   propagation
//!
//! ## Module Organization
//!
//! - [`config`] - Configuration surface (heartbeat, poll delays, caps)
//! - [`error`] - Failure taxonomy
//! - [`executor`] - Remote statement executor interface and callback registry
//! - [`messaging`] - Downstream queue transport
//! - [`orchestration`] - The orchestration control flow itself
//! - [`state`] - Persisted run state for durable suspension
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dockflow_core::config::OrchestrationConfig;
//! use dockflow_core::executor::{CallbackRegistry, RemoteStatementExecutor};
//! use dockflow_core::messaging::RecordQueue;
//! use dockflow_core::orchestration::StatementPipeline;
//! use dockflow_core::state::InMemoryRunStateStore;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     executor: Arc<dyn RemoteStatementExecutor>,
//! #     queue: Arc<dyn RecordQueue>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let callbacks = CallbackRegistry::new();
//! let pipeline = StatementPipeline::new(
//!     executor,
//!     queue,
//!     callbacks,
//!     Arc::new(InMemoryRunStateStore::new()),
//!     OrchestrationConfig::from_env()?,
//! );
//!
//! let outcome = pipeline
//!     .run("select id from molecular_data where mw < 500")
//!     .await?;
//! println!("dispatched {} ids", outcome.total_count);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod messaging;
pub mod orchestration;
pub mod state;

pub use config::OrchestrationConfig;
pub use error::{OrchestrationError, OrchestrationResult};
