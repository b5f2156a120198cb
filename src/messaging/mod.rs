//! # Messaging Module
//!
//! Queue transport for fan-out dispatch. The orchestration core only depends
//! on the `RecordQueue` trait; the pgmq-backed implementation is provided for
//! Postgres-hosted queues.

pub mod errors;
pub mod pgmq_queue;
pub mod queue;

pub use errors::{MessagingError, MessagingResult};
pub use pgmq_queue::PgmqRecordQueue;
pub use queue::RecordQueue;
