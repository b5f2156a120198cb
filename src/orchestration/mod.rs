//! # Orchestration Module
//!
//! The control flow that ties statement execution, status polling,
//! pagination, fan-out and result accumulation together:
//! composer -> (pagination <-> fan-out, looped) -> result poller ->
//! terminal success or failure.

pub mod composer;
pub mod fan_out;
pub mod pagination;
pub mod pipeline;
pub mod result_poller;
pub mod statement_task;
pub mod status_poller;

pub use composer::{SubWorkflow, WorkflowChain, WorkflowChainBuilder};
pub use fan_out::FanOutDispatcher;
pub use pagination::{PageCursor, PagePlan, PaginationWorkflow};
pub use pipeline::{
    DispatchWorkflow, EmitIdsWorkflow, IdEmissionLoop, PipelineOutcome, ResultPollingWorkflow,
    StatementPipeline,
};
pub use result_poller::{PollState, ResultAccumulationPoller};
pub use statement_task::{remote_call, StatementExecutionTask};
pub use status_poller::{classify_status, PollReport, StatusCheck, StatusPoller};
