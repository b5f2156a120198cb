//! # Record Queue Interface
//!
//! Downstream queue abstraction used by the fan-out dispatcher. The queue is
//! an external collaborator: at-least-once delivery, no ordering guarantee
//! across messages, durability owned by the queue itself.

use crate::messaging::errors::MessagingResult;
use async_trait::async_trait;

/// Downstream queue handle for dispatched records.
///
/// Implementations must be safe to share across concurrent publishes up to
/// the fan-out concurrency cap.
#[async_trait]
pub trait RecordQueue: Send + Sync {
    /// Queue name, used in dispatch-failure reporting
    fn queue_name(&self) -> &str;

    /// Publish one JSON message. Returns the queue-assigned message id.
    async fn publish(&self, message: &serde_json::Value) -> MessagingResult<i64>;
}
