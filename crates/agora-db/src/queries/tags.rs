use anyhow::Result;
use rusqlite::Connection;

use super::{OptionalExt, id_params, placeholders};
use crate::Database;
use crate::models::{PostTagRow, TagRow};

impl Database {
    pub fn get_tag_by_name(&self, name: &str) -> Result<Option<TagRow>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id, name FROM tags WHERE name = ?1", [name], |row| {
                Ok(TagRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()
        })
    }

    /// Attach tags to a post by name, creating missing tags.
    /// Tags already on the post are left alone.
    pub fn add_tags_to_post(&self, post_id: i64, names: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            attach_tags(conn, post_id, names)?;
            Ok(())
        })
    }

    /// Batch-fetch tags for a set of post IDs.
    pub fn get_tags_for_posts(&self, post_ids: &[i64]) -> Result<Vec<PostTagRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT pt.post_id, t.id, t.name FROM post_tags pt
                 JOIN tags t ON t.id = pt.tag_id
                 WHERE pt.post_id IN ({})
                 ORDER BY t.name",
                placeholders(post_ids.len())
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(id_params(post_ids).as_slice(), |row| {
                    Ok(PostTagRow {
                        post_id: row.get(0)?,
                        tag_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

/// Get-or-create each tag and link it to the post. Blank names are skipped.
pub(crate) fn attach_tags(conn: &Connection, post_id: i64, names: &[String]) -> Result<()> {
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", [name])?;
        let tag_id: i64 = conn.query_row("SELECT id FROM tags WHERE name = ?1", [name], |row| row.get(0))?;
        conn.execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
            [post_id, tag_id],
        )?;
    }
    Ok(())
}
