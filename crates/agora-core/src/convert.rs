//! Row → response conversions shared by the services.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use agora_db::models::{ReactionCountRow, UserRow};
use agora_types::api::{ReactionCounts, UserResponse};
use agora_types::models::{ReactionType, Role};

/// Parse a stored timestamp. Accepts RFC 3339 as well as SQLite's
/// `datetime('now')` form ("YYYY-MM-DD HH:MM:SS", implicitly UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .ok()
}

/// Like [`parse_timestamp`], but logs and falls back to the epoch for
/// display purposes.
pub fn display_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt timestamp '{}' on {}", raw, context);
        DateTime::default()
    })
}

pub fn user_response(row: UserRow) -> UserResponse {
    let role = row.role.parse().unwrap_or_else(|e| {
        warn!("User {} has {}; treating as user", row.id, e);
        Role::User
    });
    UserResponse {
        created_at: display_timestamp(&row.created_at, &format!("user {}", row.id)),
        id: row.id,
        username: row.username,
        email: row.email,
        role,
        image_url: row.image_url,
    }
}

/// Fold per-type tallies into like/dislike counts keyed by target id.
pub fn tally_reactions(rows: Vec<ReactionCountRow>) -> HashMap<i64, ReactionCounts> {
    let mut tallies: HashMap<i64, ReactionCounts> = HashMap::new();
    for row in rows {
        let counts = tallies.entry(row.target_id).or_default();
        match row.reaction_type.parse::<ReactionType>() {
            Ok(ReactionType::Like) => counts.likes += row.count,
            Ok(ReactionType::Dislike) => counts.dislikes += row.count,
            Err(e) => warn!("Ignoring reactions on {}: {}", row.target_id, e),
        }
    }
    tallies
}
