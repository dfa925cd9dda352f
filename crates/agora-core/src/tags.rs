use std::sync::Arc;

use tracing::debug;

use agora_db::Database;
use agora_types::api::TagResponse;

use crate::{Actor, Result, ServiceError};

pub const MAX_TAG_LENGTH: usize = 50;

pub struct TagService {
    db: Arc<Database>,
}

impl TagService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get-or-create each named tag and attach it to the post. Returns the
    /// post's full tag list afterwards.
    pub fn add_to_post(&self, actor: Actor, post_id: i64, names: &[String]) -> Result<Vec<TagResponse>> {
        validate_names(names)?;
        let post = self
            .db
            .get_post(post_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("post {}", post_id)))?;
        actor.ensure_owner(post.user_id, "post")?;

        self.db.add_tags_to_post(post_id, names)?;
        debug!("Tagged post {} with {:?}", post_id, names);
        self.for_post(post_id)
    }

    pub fn for_post(&self, post_id: i64) -> Result<Vec<TagResponse>> {
        let tags = self.db.get_tags_for_posts(&[post_id])?;
        Ok(tags
            .into_iter()
            .map(|t| TagResponse { id: t.tag_id, name: t.name })
            .collect())
    }

    pub fn get_by_name(&self, name: &str) -> Result<TagResponse> {
        self.db
            .get_tag_by_name(name.trim())?
            .map(|t| TagResponse { id: t.id, name: t.name })
            .ok_or_else(|| ServiceError::NotFound(format!("tag '{}'", name)))
    }
}

pub(crate) fn validate_names(names: &[String]) -> Result<()> {
    if let Some(long) = names.iter().find(|n| n.trim().chars().count() > MAX_TAG_LENGTH) {
        return Err(ServiceError::InvalidInput(format!("tag '{}' is too long", long.trim())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use agora_db::queries::posts::NewPost;
    use agora_types::models::Role;

    use super::*;

    #[test]
    fn adding_tags_is_idempotent() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user_id = db.create_user("tam", "tam@example.com", "hash", "user").unwrap();
        let post = db
            .create_post(
                NewPost { topic_id: 1, user_id, title: "t", content: "c", tags: &[] },
                |_| String::new(),
            )
            .unwrap();
        let service = TagService::new(Arc::clone(&db));
        let actor = Actor { user_id, role: Role::User };

        let names = vec!["rust".to_string(), "web".to_string()];
        service.add_to_post(actor, post, &names).unwrap();
        let tags = service.add_to_post(actor, post, &["rust".to_string()]).unwrap();

        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["rust", "web"]);
        assert_eq!(service.get_by_name("web").unwrap().name, "web");
        assert!(matches!(service.get_by_name("none"), Err(ServiceError::NotFound(_))));
    }
}
