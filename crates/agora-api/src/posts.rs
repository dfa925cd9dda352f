use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};

use agora_core::Actor;
use agora_core::pagination::Page;
use agora_core::posts::PostDraft;
use agora_core::uploads::ImageFolder;
use agora_types::api::{Claims, PageQuery, PopularQuery, PostRequest, SearchQuery, UpdatePostRequest};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = Page::try_from(query)?;
    let posts = blocking(&state, move |s| s.posts.list(page)).await?;
    Ok(Json(posts))
}

pub async fn get_post(State(state): State<AppState>, Path(id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    let post = blocking(&state, move |s| s.posts.get(id)).await?;
    Ok(Json(post))
}

pub async fn posts_by_topic(
    State(state): State<AppState>,
    Path(topic_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = Page::try_from(query)?;
    let posts = blocking(&state, move |s| s.posts.list_by_topic(topic_id, page)).await?;
    Ok(Json(posts))
}

pub async fn my_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = Page::try_from(query)?;
    let posts = blocking(&state, move |s| s.posts.list_by_user(claims.sub, page)).await?;
    Ok(Json(posts))
}

pub async fn popular_posts(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = blocking(&state, move |s| s.posts.popular(query.count)).await?;
    Ok(Json(posts))
}

pub async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = Page::new(query.page_number, query.page_size)?;
    let posts = blocking(&state, move |s| s.posts.search(&query.title, page)).await?;
    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from(&claims);
    let post = blocking(&state, move |s| {
        s.posts.create(
            actor,
            PostDraft {
                topic_id: req.topic_id,
                title: &req.title,
                content: &req.content,
                tags: Some(req.tags.as_slice()),
            },
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from(&claims);
    let post = blocking(&state, move |s| {
        s.posts.update(
            actor,
            id,
            PostDraft {
                topic_id: req.topic_id,
                title: &req.title,
                content: &req.content,
                tags: req.tags.as_deref(),
            },
        )
    })
    .await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from(&claims);
    blocking(&state, move |s| s.posts.delete(actor, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Raw image body; the type comes from `Content-Type`.
pub async fn upload_post_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from(&claims);
    blocking(&state, move |s| s.posts.ensure_can_edit(actor, id)).await?;

    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let url = state.images.save(ImageFolder::PostImages, content_type, &body).await?;

    let stored = url.clone();
    blocking(&state, move |s| s.posts.add_image(id, &stored)).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "url": url }))))
}
