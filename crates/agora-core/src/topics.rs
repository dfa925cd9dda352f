use std::sync::Arc;

use tracing::info;

use agora_db::Database;
use agora_db::models::TopicRow;
use agora_types::api::TopicResponse;

use crate::pagination::Page;
use crate::{Result, ServiceError};

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

pub struct TopicService {
    db: Arc<Database>,
}

impl TopicService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn list(&self, page: Page) -> Result<Vec<TopicResponse>> {
        let rows = self.db.list_topics(page.limit, page.offset)?;
        Ok(rows.into_iter().map(topic_response).collect())
    }

    pub fn get(&self, id: i64) -> Result<TopicResponse> {
        self.db
            .get_topic(id)?
            .map(topic_response)
            .ok_or_else(|| ServiceError::NotFound(format!("topic {}", id)))
    }

    pub fn create(&self, name: &str, description: Option<&str>) -> Result<TopicResponse> {
        validate(name, description)?;
        let id = self.db.create_topic(name.trim(), description)?;
        info!("Topic created: {} ({})", name, id);
        self.get(id)
    }

    pub fn update(&self, id: i64, name: &str, description: Option<&str>) -> Result<TopicResponse> {
        validate(name, description)?;
        if !self.db.update_topic(id, name.trim(), description)? {
            return Err(ServiceError::NotFound(format!("topic {}", id)));
        }
        self.get(id)
    }

    /// Deleting a topic deletes its posts.
    pub fn delete(&self, id: i64) -> Result<()> {
        if !self.db.delete_topic(id)? {
            return Err(ServiceError::NotFound(format!("topic {}", id)));
        }
        info!("Topic {} deleted", id);
        Ok(())
    }
}

fn validate(name: &str, description: Option<&str>) -> Result<()> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(ServiceError::InvalidInput(format!(
            "topic name must be 1-{} characters",
            MAX_NAME_LENGTH
        )));
    }
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LENGTH) {
        return Err(ServiceError::InvalidInput(format!(
            "topic description exceeds {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}

fn topic_response(row: TopicRow) -> TopicResponse {
    TopicResponse {
        id: row.id,
        name: row.name,
        description: row.description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crud_round() {
        let service = TopicService::new(Arc::new(Database::open_in_memory().unwrap()));

        let created = service.create("Gardening", Some("Plants and soil")).unwrap();
        assert_eq!(created.name, "Gardening");

        let updated = service.update(created.id, "Gardens", None).unwrap();
        assert_eq!(updated.name, "Gardens");
        assert_eq!(updated.description, None);

        service.delete(created.id).unwrap();
        assert!(matches!(service.get(created.id), Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete(created.id), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn rejects_oversized_fields() {
        let service = TopicService::new(Arc::new(Database::open_in_memory().unwrap()));
        assert!(service.create("", None).is_err());
        assert!(service.create(&"x".repeat(101), None).is_err());
        assert!(service.create("ok", Some(&"y".repeat(501))).is_err());
    }

    #[test]
    fn seeded_topics_are_listed() {
        let service = TopicService::new(Arc::new(Database::open_in_memory().unwrap()));
        let page = service.list(Page::new(1, 100).unwrap()).unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(page[0].name, "Sport");
    }
}
