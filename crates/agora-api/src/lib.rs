pub mod auth;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod reactions;
pub mod state;
pub mod tags;
pub mod topics;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};

use agora_core::uploads::MAX_IMAGE_SIZE;

use crate::middleware::require_auth;
use crate::state::AppState;

/// Headroom above the largest accepted image for request framing.
const BODY_LIMIT: usize = MAX_IMAGE_SIZE + 64 * 1024;

/// All `/api` routes. Static files and outer layers (CORS, tracing) are
/// added by the server binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/user/register", post(auth::register))
        .route("/api/user/login", post(auth::login))
        .route("/api/user/confirm-update", post(users::confirm_update))
        .route("/api/token/refresh", post(auth::refresh))
        .route("/api/topic", get(topics::list_topics))
        .route("/api/topic/{id}", get(topics::get_topic))
        .route("/api/post", get(posts::list_posts))
        .route("/api/post/popular", get(posts::popular_posts))
        .route("/api/post/search", get(posts::search_posts))
        .route("/api/post/topic/{topic_id}", get(posts::posts_by_topic))
        .route("/api/post/{id}", get(posts::get_post))
        .route("/api/comment/{id}", get(comments::get_comment))
        .route("/api/comment/post/{post_id}", get(comments::comments_by_post))
        .route("/api/tag/{post_id}/tags", get(tags::tags_for_post))
        .route("/api/tag/name/{name}", get(tags::get_tag))
        .route("/api/reaction/post/{post_id}", get(reactions::reactions_for_post))
        .route("/api/reaction/comment/{comment_id}", get(reactions::reactions_for_comment))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/token/revoke", post(auth::revoke))
        .route("/api/user", put(users::update_current_user))
        .route("/api/user/current", get(users::current_user))
        .route("/api/user/specific-user", put(users::update_specific_user))
        .route("/api/user/avatar", post(users::upload_avatar))
        .route("/api/user/{id}", get(users::get_user))
        .route("/api/topic", post(topics::create_topic))
        .route("/api/topic/{id}", put(topics::update_topic))
        .route("/api/topic/{id}", delete(topics::delete_topic))
        .route("/api/post", post(posts::create_post))
        .route("/api/post/my-posts", get(posts::my_posts))
        .route("/api/post/{id}", put(posts::update_post))
        .route("/api/post/{id}", delete(posts::delete_post))
        .route("/api/post/{id}/images", post(posts::upload_post_image))
        .route("/api/comment", post(comments::add_comment))
        .route("/api/comment/{id}", put(comments::update_comment))
        .route("/api/comment/{id}", delete(comments::delete_comment))
        .route("/api/tag/{post_id}/tags", post(tags::add_tags_to_post))
        .route("/api/reaction/toggle", post(reactions::toggle_reaction))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}
