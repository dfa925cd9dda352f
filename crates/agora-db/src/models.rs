/// Database row types — these map directly to SQLite rows.
/// Enum-valued columns stay as their stored text; agora-core parses them.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub image_url: Option<String>,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<String>,
    pub created_at: String,
}

pub struct TopicRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub topic_id: i64,
    pub topic_name: String,
    pub user_id: i64,
    pub username: String,
    pub link: String,
    pub created_at: String,
    pub comment_count: i64,
}

pub struct PostImageRow {
    pub post_id: i64,
    pub url: String,
}

pub struct PostTagRow {
    pub post_id: i64,
    pub tag_id: i64,
    pub name: String,
}

pub struct CommentRow {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub created_at: String,
}

pub struct TagRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ReactionRow {
    pub id: i64,
    pub user_id: i64,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub reaction_type: String,
    pub created_at: String,
}

/// Per-target reaction tally, grouped by type.
pub struct ReactionCountRow {
    pub target_id: i64,
    pub reaction_type: String,
    pub count: i64,
}

pub struct QueuedMessage {
    pub id: i64,
    pub payload: String,
}
