//! Named message queues backed by the `email_queue` table.
//!
//! The API server and the email worker run as separate processes and share
//! only the database file, so the table is the transport between them.
//! Dequeue deletes the row in the same statement that reads it: once a
//! consumer has a message, nobody else will see it again.

use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::QueuedMessage;

impl Database {
    pub fn enqueue(&self, queue: &str, payload: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO email_queue (queue, payload) VALUES (?1, ?2)",
                (queue, payload),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Remove and return the oldest message on `queue`.
    pub fn dequeue(&self, queue: &str) -> Result<Option<QueuedMessage>> {
        self.with_conn_mut(|conn| {
            conn.query_row(
                "DELETE FROM email_queue
                 WHERE id = (SELECT id FROM email_queue WHERE queue = ?1 ORDER BY id LIMIT 1)
                 RETURNING id, payload",
                [queue],
                |row| {
                    Ok(QueuedMessage {
                        id: row.get(0)?,
                        payload: row.get(1)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn queue_depth(&self, queue: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM email_queue WHERE queue = ?1",
                [queue],
                |row| row.get(0),
            )?)
        })
    }
}
