use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::TopicRow;

impl Database {
    pub fn list_topics(&self, limit: u32, offset: u32) -> Result<Vec<TopicRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description FROM topics ORDER BY id LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![limit, offset], |row| {
                    Ok(TopicRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_topic(&self, id: i64) -> Result<Option<TopicRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, description FROM topics WHERE id = ?1",
                [id],
                |row| {
                    Ok(TopicRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn create_topic(&self, name: &str, description: Option<&str>) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO topics (name, description) VALUES (?1, ?2)",
                rusqlite::params![name, description],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn update_topic(&self, id: i64, name: &str, description: Option<&str>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE topics SET name = ?2, description = ?3 WHERE id = ?1",
                rusqlite::params![id, name, description],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deleting a topic cascades to its posts.
    pub fn delete_topic(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM topics WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}
