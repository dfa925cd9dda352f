//! Reaction lookups and mutations.
//!
//! The connection-level functions are public so a caller can run
//! lookup, decision and mutation as one unit inside
//! [`Database::with_conn_mut`].

use anyhow::Result;
use rusqlite::Connection;

use agora_types::models::ReactionTarget;

use super::{OptionalExt, id_params, placeholders};
use crate::Database;
use crate::models::{ReactionCountRow, ReactionRow};

const REACTION_COLUMNS: &str = "id, user_id, post_id, comment_id, type, created_at";

pub fn find_reaction(conn: &Connection, user_id: i64, target: ReactionTarget) -> Result<Option<ReactionRow>> {
    let (column, target_id) = target_column(target);
    let sql = format!(
        "SELECT {} FROM reactions WHERE user_id = ?1 AND {} = ?2",
        REACTION_COLUMNS, column
    );
    conn.query_row(&sql, [user_id, target_id], map_reaction).optional()
}

pub fn target_exists(conn: &Connection, target: ReactionTarget) -> Result<bool> {
    let sql = match target {
        ReactionTarget::Post(_) => "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
        ReactionTarget::Comment(_) => "SELECT EXISTS(SELECT 1 FROM comments WHERE id = ?1)",
    };
    let (_, id) = target_column(target);
    Ok(conn.query_row(sql, [id], |row| row.get(0))?)
}

pub fn insert_reaction(conn: &Connection, user_id: i64, target: ReactionTarget, reaction_type: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO reactions (user_id, post_id, comment_id, type) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user_id, target.post_id(), target.comment_id(), reaction_type],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_reaction_type(conn: &Connection, id: i64, reaction_type: &str) -> Result<()> {
    conn.execute(
        "UPDATE reactions SET type = ?2 WHERE id = ?1",
        rusqlite::params![id, reaction_type],
    )?;
    Ok(())
}

pub fn delete_reaction(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM reactions WHERE id = ?1", [id])?;
    Ok(())
}

impl Database {
    pub fn list_reactions(&self, target: ReactionTarget, limit: u32, offset: u32) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| {
            let (column, target_id) = target_column(target);
            let sql = format!(
                "SELECT {} FROM reactions WHERE {} = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
                REACTION_COLUMNS, column
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![target_id, limit, offset], map_reaction)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch per-type tallies for a set of post IDs.
    pub fn reaction_counts_for_posts(&self, post_ids: &[i64]) -> Result<Vec<ReactionCountRow>> {
        self.reaction_counts("post_id", post_ids)
    }

    /// Batch-fetch per-type tallies for a set of comment IDs.
    pub fn reaction_counts_for_comments(&self, comment_ids: &[i64]) -> Result<Vec<ReactionCountRow>> {
        self.reaction_counts("comment_id", comment_ids)
    }

    fn reaction_counts(&self, column: &'static str, ids: &[i64]) -> Result<Vec<ReactionCountRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {col}, type, COUNT(*) FROM reactions WHERE {col} IN ({}) GROUP BY {col}, type",
                placeholders(ids.len()),
                col = column
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(id_params(ids).as_slice(), |row| {
                    Ok(ReactionCountRow {
                        target_id: row.get(0)?,
                        reaction_type: row.get(1)?,
                        count: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn target_column(target: ReactionTarget) -> (&'static str, i64) {
    match target {
        ReactionTarget::Post(id) => ("post_id", id),
        ReactionTarget::Comment(id) => ("comment_id", id),
    }
}

fn map_reaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReactionRow> {
    Ok(ReactionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_id: row.get(2)?,
        comment_id: row.get(3)?,
        reaction_type: row.get(4)?,
        created_at: row.get(5)?,
    })
}
