//! # Remote Executor Module
//!
//! Interface to the external statement executor: wire types, the executor
//! trait, and the callback registry that delivers task-token completion
//! signals back into suspended runs.

pub mod callback;
pub mod remote;
pub mod types;

pub use callback::{CallbackRegistry, StatementOutcome};
pub use remote::RemoteStatementExecutor;
pub use types::{
    ExecutionHandle, ExecutionRequest, StatementDescription, StatementResult, StatementStatus,
};
