use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::CommentRow;

const COMMENT_SELECT: &str = "
    SELECT c.id, c.content, c.post_id, c.user_id, u.username, c.created_at
    FROM comments c
    LEFT JOIN users u ON u.id = c.user_id";

impl Database {
    pub fn insert_comment(&self, post_id: i64, user_id: i64, content: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, user_id, content) VALUES (?1, ?2, ?3)",
                rusqlite::params![post_id, user_id, content],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
            conn.query_row(&sql, [id], map_comment).optional()
        })
    }

    /// Oldest first, so a thread reads top to bottom.
    pub fn list_comments_by_post(&self, post_id: i64, limit: u32, offset: u32) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE c.post_id = ?1 ORDER BY c.created_at, c.id LIMIT ?2 OFFSET ?3",
                COMMENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![post_id, limit, offset], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment(&self, id: i64, content: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?2 WHERE id = ?1",
                rusqlite::params![id, content],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_comment(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn map_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        content: row.get(1)?,
        post_id: row.get(2)?,
        user_id: row.get(3)?,
        username: row.get::<_, Option<String>>(4)?.unwrap_or_else(|| "unknown".to_string()),
        created_at: row.get(5)?,
    })
}
