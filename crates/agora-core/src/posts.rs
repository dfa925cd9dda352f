use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use agora_db::Database;
use agora_db::models::{PostRow, UserRow};
use agora_db::queries::posts::NewPost;
use agora_types::api::{PostDetailResponse, PostPage, PostResponse, TagResponse};

use crate::comments;
use crate::convert::{display_timestamp, tally_reactions};
use crate::pagination::{MAX_PAGE_SIZE, Page};
use crate::tags::validate_names;
use crate::{Actor, Result, ServiceError};

pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_CONTENT_LENGTH: usize = 5000;

/// Title, content, topic and (optionally) tags of a post being written.
pub struct PostDraft<'a> {
    pub topic_id: i64,
    pub title: &'a str,
    pub content: &'a str,
    pub tags: Option<&'a [String]>,
}

pub struct PostService {
    db: Arc<Database>,
    public_url: String,
}

impl PostService {
    pub fn new(db: Arc<Database>, public_url: impl Into<String>) -> Self {
        Self {
            db,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn create(&self, actor: Actor, draft: PostDraft<'_>) -> Result<PostResponse> {
        self.validate(&draft)?;
        let author = self.author(actor.user_id)?;

        let id = self.db.create_post(
            NewPost {
                topic_id: draft.topic_id,
                user_id: actor.user_id,
                title: draft.title,
                content: draft.content,
                tags: draft.tags.unwrap_or_default(),
            },
            |id| post_link(&self.public_url, id, &author.username, draft.title),
        )?;
        info!("Post {} created by user {}", id, actor.user_id);
        self.get_summary(id)
    }

    /// Replaces title, content and topic. Tags are replaced only when the
    /// draft carries them.
    pub fn update(&self, actor: Actor, id: i64, draft: PostDraft<'_>) -> Result<PostResponse> {
        self.validate(&draft)?;
        self.ensure_can_edit(actor, id)?;
        if !self
            .db
            .update_post(id, draft.topic_id, draft.title, draft.content, draft.tags)?
        {
            return Err(ServiceError::NotFound(format!("post {}", id)));
        }
        self.get_summary(id)
    }

    pub fn delete(&self, actor: Actor, id: i64) -> Result<()> {
        self.ensure_can_edit(actor, id)?;
        if !self.db.delete_post(id)? {
            return Err(ServiceError::NotFound(format!("post {}", id)));
        }
        info!("Post {} deleted by user {}", id, actor.user_id);
        Ok(())
    }

    /// The post with all of its comments.
    pub fn get(&self, id: i64) -> Result<PostDetailResponse> {
        let post = self.get_summary(id)?;
        let rows = self.db.list_comments_by_post(id, u32::MAX, 0)?;
        Ok(PostDetailResponse {
            post,
            comments: comments::hydrate(&self.db, rows)?,
        })
    }

    fn get_summary(&self, id: i64) -> Result<PostResponse> {
        let row = self
            .db
            .get_post(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("post {}", id)))?;
        let mut posts = self.hydrate(vec![row])?;
        posts.pop().ok_or_else(|| ServiceError::NotFound(format!("post {}", id)))
    }

    pub fn list(&self, page: Page) -> Result<PostPage> {
        let rows = self.db.list_posts(page.limit, page.offset)?;
        Ok(PostPage {
            posts: self.hydrate(rows)?,
            total_items: self.db.count_posts()?,
        })
    }

    pub fn list_by_topic(&self, topic_id: i64, page: Page) -> Result<Vec<PostResponse>> {
        if self.db.get_topic(topic_id)?.is_none() {
            return Err(ServiceError::NotFound(format!("topic {}", topic_id)));
        }
        let rows = self.db.list_posts_by_topic(topic_id, page.limit, page.offset)?;
        self.hydrate(rows)
    }

    pub fn list_by_user(&self, user_id: i64, page: Page) -> Result<Vec<PostResponse>> {
        let rows = self.db.list_posts_by_user(user_id, page.limit, page.offset)?;
        self.hydrate(rows)
    }

    pub fn popular(&self, count: u32) -> Result<Vec<PostResponse>> {
        if count == 0 {
            return Err(ServiceError::InvalidInput("count must be at least 1".into()));
        }
        let rows = self.db.popular_posts(count.min(MAX_PAGE_SIZE))?;
        self.hydrate(rows)
    }

    pub fn search(&self, title: &str, page: Page) -> Result<Vec<PostResponse>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::InvalidInput("search title cannot be empty".into()));
        }
        let rows = self.db.search_posts(title, page.limit, page.offset)?;
        self.hydrate(rows)
    }

    /// Fails with `NotFound` or `Forbidden` unless `actor` may modify the post.
    pub fn ensure_can_edit(&self, actor: Actor, id: i64) -> Result<()> {
        let post = self
            .db
            .get_post(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("post {}", id)))?;
        actor.ensure_owner(post.user_id, "post")
    }

    /// Record an already-stored image against the post.
    pub fn add_image(&self, post_id: i64, url: &str) -> Result<()> {
        self.db.add_post_image(post_id, url)?;
        info!("Image {} attached to post {}", url, post_id);
        Ok(())
    }

    fn author(&self, user_id: i64) -> Result<UserRow> {
        self.db
            .get_user_by_id(user_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))
    }

    fn validate(&self, draft: &PostDraft<'_>) -> Result<()> {
        let title = draft.title.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LENGTH {
            return Err(ServiceError::InvalidInput(format!(
                "title must be 1-{} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if draft.content.trim().is_empty() || draft.content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(ServiceError::InvalidInput(format!(
                "content must be 1-{} characters",
                MAX_CONTENT_LENGTH
            )));
        }
        if let Some(tags) = draft.tags {
            validate_names(tags)?;
        }
        if self.db.get_topic(draft.topic_id)?.is_none() {
            return Err(ServiceError::NotFound(format!("topic {}", draft.topic_id)));
        }
        Ok(())
    }

    /// Batch-load images, tags and reaction counts for a page of posts.
    fn hydrate(&self, rows: Vec<PostRow>) -> Result<Vec<PostResponse>> {
        let ids: Vec<i64> = rows.iter().map(|p| p.id).collect();

        let mut images: HashMap<i64, Vec<String>> = HashMap::new();
        for image in self.db.get_images_for_posts(&ids)? {
            images.entry(image.post_id).or_default().push(image.url);
        }

        let mut tags: HashMap<i64, Vec<TagResponse>> = HashMap::new();
        for tag in self.db.get_tags_for_posts(&ids)? {
            tags.entry(tag.post_id).or_default().push(TagResponse {
                id: tag.tag_id,
                name: tag.name,
            });
        }

        let reactions = tally_reactions(self.db.reaction_counts_for_posts(&ids)?);

        Ok(rows
            .into_iter()
            .map(|row| PostResponse {
                images: images.remove(&row.id).unwrap_or_default(),
                tags: tags.remove(&row.id).unwrap_or_default(),
                reactions: reactions.get(&row.id).copied().unwrap_or_default(),
                created_at: display_timestamp(&row.created_at, &format!("post {}", row.id)),
                id: row.id,
                title: row.title,
                content: row.content,
                user_id: row.user_id,
                username: row.username,
                topic_id: row.topic_id,
                topic_name: row.topic_name,
                link: row.link,
                comment_count: row.comment_count,
            })
            .collect())
    }
}

/// Lower-case the title, turn spaces into dashes and drop `?!.,`.
pub fn slug(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '?' | '!' | '.' | ','))
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}

pub fn post_link(public_url: &str, id: i64, username: &str, title: &str) -> String {
    format!("{}/posts/{}?user={}&title={}", public_url, id, username, slug(title))
}

#[cfg(test)]
mod tests {
    use agora_types::models::{ReactionTarget, ReactionType, Role};

    use super::*;
    use crate::reactions::ReactionService;

    fn setup() -> (PostService, Arc<Database>, Actor) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user_id = db.create_user("pat", "pat@example.com", "hash", "user").unwrap();
        let service = PostService::new(Arc::clone(&db), "https://agora.test/");
        (service, db, Actor { user_id, role: Role::User })
    }

    fn draft<'a>(title: &'a str, tags: Option<&'a [String]>) -> PostDraft<'a> {
        PostDraft {
            topic_id: 2,
            title,
            content: "Body text",
            tags,
        }
    }

    #[test]
    fn slug_strips_punctuation() {
        assert_eq!(slug("Hello, World! Is this Rust?"), "hello-world-is-this-rust");
        assert_eq!(slug("v1.0 released."), "v10-released");
    }

    #[test]
    fn create_builds_permalink_and_tags() {
        let (service, _db, actor) = setup();
        let tags = vec!["rust".to_string()];
        let post = service.create(actor, draft("My First Post!", Some(tags.as_slice()))).unwrap();

        assert_eq!(
            post.link,
            format!("https://agora.test/posts/{}?user=pat&title=my-first-post", post.id)
        );
        assert_eq!(post.topic_name, "Technology");
        assert_eq!(post.tags.len(), 1);
        assert_eq!(post.comment_count, 0);
    }

    #[test]
    fn create_validates_topic_and_lengths() {
        let (service, _db, actor) = setup();
        let mut bad_topic = draft("Title", None);
        bad_topic.topic_id = 999;
        assert!(matches!(service.create(actor, bad_topic), Err(ServiceError::NotFound(_))));

        let long = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert!(matches!(service.create(actor, draft(&long, None)), Err(ServiceError::InvalidInput(_))));
    }

    #[test]
    fn strangers_cannot_edit_or_delete() {
        let (service, db, author) = setup();
        let post = service.create(author, draft("Mine", None)).unwrap();
        let stranger = Actor {
            user_id: db.create_user("sam", "sam@example.com", "hash", "user").unwrap(),
            role: Role::User,
        };

        assert!(matches!(
            service.update(stranger, post.id, draft("Theirs", None)),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(service.delete(stranger, post.id), Err(ServiceError::Forbidden(_))));

        let updated = service.update(author, post.id, draft("Still mine", None)).unwrap();
        assert_eq!(updated.title, "Still mine");
        service.delete(author, post.id).unwrap();
        assert!(matches!(service.get(post.id), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn list_reports_total_and_popular_orders_by_reactions() {
        let (service, db, actor) = setup();
        let quiet = service.create(actor, draft("Quiet", None)).unwrap();
        let loud = service.create(actor, draft("Loud", None)).unwrap();
        ReactionService::new(Arc::clone(&db))
            .toggle(actor.user_id, ReactionTarget::Post(loud.id), ReactionType::Like)
            .unwrap();

        let page = service.list(Page::new(1, 1).unwrap()).unwrap();
        assert_eq!(page.posts.len(), 1);
        assert_eq!(page.total_items, 2);

        let popular = service.popular(5).unwrap();
        assert_eq!(popular[0].id, loud.id);
        assert_eq!(popular[0].reactions.likes, 1);
        assert_eq!(popular[1].id, quiet.id);
    }

    #[test]
    fn detail_includes_comments() {
        let (service, db, actor) = setup();
        let post = service.create(actor, draft("Talk", None)).unwrap();
        db.insert_comment(post.id, actor.user_id, "hello").unwrap();

        let detail = service.get(post.id).unwrap();
        assert_eq!(detail.post.comment_count, 1);
        assert_eq!(detail.comments[0].content, "hello");
    }
}
