use std::sync::Arc;

use tracing::info;

use agora_db::Database;
use agora_db::models::CommentRow;
use agora_types::api::CommentResponse;

use crate::convert::{display_timestamp, tally_reactions};
use crate::pagination::Page;
use crate::{Actor, Result, ServiceError};

pub const MAX_COMMENT_LENGTH: usize = 5000;

pub struct CommentService {
    db: Arc<Database>,
}

impl CommentService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn add(&self, actor: Actor, post_id: i64, content: &str) -> Result<CommentResponse> {
        validate_content(content)?;
        if self.db.get_post(post_id)?.is_none() {
            return Err(ServiceError::NotFound(format!("post {}", post_id)));
        }

        let id = self.db.insert_comment(post_id, actor.user_id, content)?;
        info!("Comment {} added to post {} by user {}", id, post_id, actor.user_id);
        self.get(id)
    }

    pub fn get(&self, id: i64) -> Result<CommentResponse> {
        let row = self
            .db
            .get_comment(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("comment {}", id)))?;
        let mut hydrated = hydrate(&self.db, vec![row])?;
        hydrated
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("comment {}", id)))
    }

    pub fn list_by_post(&self, post_id: i64, page: Page) -> Result<Vec<CommentResponse>> {
        if self.db.get_post(post_id)?.is_none() {
            return Err(ServiceError::NotFound(format!("post {}", post_id)));
        }
        let rows = self.db.list_comments_by_post(post_id, page.limit, page.offset)?;
        hydrate(&self.db, rows)
    }

    pub fn update(&self, actor: Actor, id: i64, content: &str) -> Result<CommentResponse> {
        validate_content(content)?;
        self.ensure_can_edit(actor, id)?;
        if !self.db.update_comment(id, content)? {
            return Err(ServiceError::NotFound(format!("comment {}", id)));
        }
        self.get(id)
    }

    pub fn delete(&self, actor: Actor, id: i64) -> Result<()> {
        self.ensure_can_edit(actor, id)?;
        if !self.db.delete_comment(id)? {
            return Err(ServiceError::NotFound(format!("comment {}", id)));
        }
        info!("Comment {} deleted by user {}", id, actor.user_id);
        Ok(())
    }

    fn ensure_can_edit(&self, actor: Actor, id: i64) -> Result<()> {
        let comment = self
            .db
            .get_comment(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("comment {}", id)))?;
        actor.ensure_owner(comment.user_id, "comment")
    }
}

/// Attach reaction counts to a batch of comments (one query for the batch).
pub(crate) fn hydrate(db: &Database, rows: Vec<CommentRow>) -> Result<Vec<CommentResponse>> {
    let ids: Vec<i64> = rows.iter().map(|c| c.id).collect();
    let counts = tally_reactions(db.reaction_counts_for_comments(&ids)?);

    Ok(rows
        .into_iter()
        .map(|row| CommentResponse {
            reactions: counts.get(&row.id).copied().unwrap_or_default(),
            created_at: display_timestamp(&row.created_at, &format!("comment {}", row.id)),
            id: row.id,
            content: row.content,
            user_id: row.user_id,
            username: row.username,
            post_id: row.post_id,
        })
        .collect())
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ServiceError::InvalidInput("comment cannot be empty".into()));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ServiceError::InvalidInput(format!(
            "comment exceeds {} characters",
            MAX_COMMENT_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use agora_db::queries::posts::NewPost;
    use agora_types::models::Role;

    use super::*;

    fn setup() -> (CommentService, Arc<Database>, Actor, i64) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user_id = db.create_user("cam", "cam@example.com", "hash", "user").unwrap();
        let post = db
            .create_post(
                NewPost { topic_id: 3, user_id, title: "t", content: "c", tags: &[] },
                |_| String::new(),
            )
            .unwrap();
        let actor = Actor { user_id, role: Role::User };
        (CommentService::new(Arc::clone(&db)), db, actor, post)
    }

    #[test]
    fn add_requires_existing_post() {
        let (service, _db, actor, post) = setup();
        let comment = service.add(actor, post, "first!").unwrap();
        assert_eq!(comment.username, "cam");
        assert_eq!(comment.reactions.likes, 0);

        assert!(matches!(service.add(actor, post + 1, "lost"), Err(ServiceError::NotFound(_))));
        assert!(matches!(service.add(actor, post, "   "), Err(ServiceError::InvalidInput(_))));
    }

    #[test]
    fn only_author_or_admin_can_edit() {
        let (service, db, author, post) = setup();
        let comment = service.add(author, post, "mine").unwrap();
        let other = Actor {
            user_id: db.create_user("eve", "eve@example.com", "hash", "user").unwrap(),
            role: Role::User,
        };
        let admin = Actor { user_id: other.user_id, role: Role::Admin };

        assert!(matches!(service.update(other, comment.id, "hijack"), Err(ServiceError::Forbidden(_))));
        assert_eq!(service.update(author, comment.id, "edited").unwrap().content, "edited");
        service.delete(admin, comment.id).unwrap();
        assert!(matches!(service.get(comment.id), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn list_is_paginated_oldest_first() {
        let (service, _db, actor, post) = setup();
        for text in ["one", "two", "three"] {
            service.add(actor, post, text).unwrap();
        }

        let page = service.list_by_post(post, Page::new(2, 2).unwrap()).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].content, "three");
    }
}
