use std::sync::Arc;

use agora_core::comments::CommentService;
use agora_core::password::PasswordHasher;
use agora_core::pending::PendingUpdateStore;
use agora_core::posts::PostService;
use agora_core::queue::EmailQueue;
use agora_core::reactions::ReactionService;
use agora_core::tags::TagService;
use agora_core::tokens::TokenIssuer;
use agora_core::topics::TopicService;
use agora_core::uploads::ImageStore;
use agora_core::users::UserService;
use agora_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub users: UserService,
    pub topics: TopicService,
    pub posts: PostService,
    pub comments: CommentService,
    pub tags: TagService,
    pub reactions: ReactionService,
    pub images: ImageStore,
    pub tokens: TokenIssuer,
}

/// Collaborators the services are built from.
pub struct Components {
    pub db: Arc<Database>,
    pub queue: Arc<dyn EmailQueue>,
    pub pending: Arc<dyn PendingUpdateStore>,
    pub passwords: PasswordHasher,
    pub tokens: TokenIssuer,
    pub images: ImageStore,
    pub public_url: String,
}

impl AppStateInner {
    pub fn new(c: Components) -> Self {
        Self {
            users: UserService::new(
                Arc::clone(&c.db),
                c.queue,
                c.pending,
                c.passwords,
                c.tokens.clone(),
            ),
            topics: TopicService::new(Arc::clone(&c.db)),
            posts: PostService::new(Arc::clone(&c.db), c.public_url),
            comments: CommentService::new(Arc::clone(&c.db)),
            tags: TagService::new(Arc::clone(&c.db)),
            reactions: ReactionService::new(c.db),
            images: c.images,
            tokens: c.tokens,
        }
    }
}

/// Run synchronous service code off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> agora_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    Ok(tokio::task::spawn_blocking(move || f(&state)).await??)
}
