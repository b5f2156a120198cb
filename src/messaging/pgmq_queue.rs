//! # PostgreSQL Message Queue Transport (pgmq-rs)
//!
//! `RecordQueue` implementation backed by the pgmq-rs crate, for deployments
//! where the downstream consumers read from a Postgres-hosted queue.

use crate::messaging::errors::MessagingResult;
use crate::messaging::queue::RecordQueue;
use crate::messaging::MessagingError;
use async_trait::async_trait;
use pgmq::PGMQueue;
use tracing::{debug, info};

/// pgmq-rs based record queue
#[derive(Clone)]
pub struct PgmqRecordQueue {
    pgmq: PGMQueue,
    queue_name: String,
}

impl PgmqRecordQueue {
    /// Connect to pgmq using a connection string and ensure the queue exists
    pub async fn new(database_url: &str, queue_name: &str) -> MessagingResult<Self> {
        info!(queue_name, "Connecting to pgmq");

        let pgmq = PGMQueue::new(database_url.to_string())
            .await
            .map_err(|e| MessagingError::connection(e.to_string()))?;

        pgmq.create(queue_name)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "create", e.to_string()))?;

        info!(queue_name, "pgmq queue ready");
        Ok(Self {
            pgmq,
            queue_name: queue_name.to_string(),
        })
    }
}

#[async_trait]
impl RecordQueue for PgmqRecordQueue {
    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    async fn publish(&self, message: &serde_json::Value) -> MessagingResult<i64> {
        debug!(queue_name = %self.queue_name, "Publishing record message");

        let message_id = self
            .pgmq
            .send(&self.queue_name, message)
            .await
            .map_err(|e| {
                MessagingError::queue_operation(&self.queue_name, "send", e.to_string())
            })?;

        debug!(queue_name = %self.queue_name, message_id, "Record message published");
        Ok(message_id)
    }
}
