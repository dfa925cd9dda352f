//! Email job transport between the API and the delivery worker.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use agora_db::Database;
use agora_types::email::EmailJob;

pub const DEFAULT_EMAIL_QUEUE: &str = "email_queue";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Publishing side of the email queue. Callers get no retry: a failed
/// publish is reported and the job is gone.
pub trait EmailQueue: Send + Sync {
    fn publish(&self, job: &EmailJob) -> Result<(), QueueError>;
}

/// Durable queue backed by the `email_queue` table of the shared database.
#[derive(Clone)]
pub struct SqliteEmailQueue {
    db: Arc<Database>,
    queue: String,
}

impl SqliteEmailQueue {
    pub fn new(db: Arc<Database>, queue: impl Into<String>) -> Self {
        Self { db, queue: queue.into() }
    }

    pub fn name(&self) -> &str {
        &self.queue
    }

    /// Pop the oldest job. The message is deleted before it is returned,
    /// so a consumer that crashes afterwards loses it.
    pub fn take_next(&self) -> Result<Option<EmailJob>, QueueError> {
        let Some(message) = self.db.dequeue(&self.queue).map_err(QueueError::Unavailable)? else {
            return Ok(None);
        };
        debug!("Dequeued message {} from {}", message.id, self.queue);
        Ok(Some(serde_json::from_str(&message.payload)?))
    }

    pub fn depth(&self) -> Result<i64, QueueError> {
        self.db.queue_depth(&self.queue).map_err(QueueError::Unavailable)
    }
}

impl EmailQueue for SqliteEmailQueue {
    fn publish(&self, job: &EmailJob) -> Result<(), QueueError> {
        let payload = serde_json::to_string(job)?;
        let id = self.db.enqueue(&self.queue, &payload).map_err(QueueError::Unavailable)?;
        debug!("Published message {} to {}", id, self.queue);
        Ok(())
    }
}
