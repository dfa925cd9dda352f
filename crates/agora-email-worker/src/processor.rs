//! The consume loop. A job is removed from the queue before delivery is
//! attempted, so a failed or interrupted delivery loses it.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use agora_core::queue::{QueueError, SqliteEmailQueue};

use crate::mailer::Mailer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processed {
    Delivered,
    Empty,
    /// Undecodable payload or failed delivery; the job is gone.
    Dropped,
    /// The database could not be read; nothing was consumed.
    Unavailable,
}

pub async fn process_one<M: Mailer>(queue: &SqliteEmailQueue, mailer: &M) -> Processed {
    let source = queue.clone();
    let next = match tokio::task::spawn_blocking(move || source.take_next()).await {
        Ok(next) => next,
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            return Processed::Unavailable;
        }
    };

    let job = match next {
        Ok(Some(job)) => job,
        Ok(None) => return Processed::Empty,
        Err(QueueError::Malformed(e)) => {
            error!("Dropping undecodable message from {}: {}", queue.name(), e);
            return Processed::Dropped;
        }
        Err(e) => {
            warn!("Queue {} unavailable: {}", queue.name(), e);
            return Processed::Unavailable;
        }
    };

    match mailer.send(&job).await {
        Ok(()) => {
            info!("Email sent to {}: {}", job.to_email, job.subject);
            Processed::Delivered
        }
        Err(e) => {
            error!("Delivery to {} failed, message lost: {:#}", job.to_email, e);
            Processed::Dropped
        }
    }
}

/// Consume until `shutdown` flips to true. Sleeps `poll` whenever the queue
/// is empty or unreadable; otherwise moves straight to the next job.
pub async fn run<M: Mailer>(queue: SqliteEmailQueue, mailer: &M, poll: Duration, mut shutdown: watch::Receiver<bool>) {
    info!("Consuming queue {}", queue.name());

    while !*shutdown.borrow() {
        match process_one(&queue, mailer).await {
            Processed::Delivered | Processed::Dropped => continue,
            Processed::Empty | Processed::Unavailable => {}
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    debug!("Shutdown sender dropped");
                    break;
                }
            }
            _ = tokio::time::sleep(poll) => {}
        }
    }

    info!("Stopped consuming {}", queue.name());
}
