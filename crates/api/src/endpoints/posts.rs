//! Post endpoints.

use axum::{
    Json, Router,
    body::Body,
    extract::{FromRequest, Multipart, Path, Query, State},
    http::{Request, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use usof_common::{AppError, AppResult};
use usof_core::{CommentNode, CreateCommentInput, CreatePostInput, UpdatePostInput};
use usof_db::{
    entities::{comment, follow, like, post, post_image},
    repositories::{PostQuery, PostSort, ToggleOutcome},
};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::no_content,
};

use super::Pagination;

/// Most images accepted on one post.
const MAX_POST_IMAGES: usize = 10;

#[derive(Serialize)]
struct PostResponse {
    post: post::Model,
}

#[derive(Serialize)]
struct PostsResponse {
    posts: Vec<post::Model>,
    total: u64,
}

/// Sort order query parameter.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SortParam {
    #[default]
    Likes,
    Date,
}

impl From<SortParam> for PostSort {
    fn from(sort: SortParam) -> Self {
        match sort {
            SortParam::Likes => Self::Likes,
            SortParam::Date => Self::Date,
        }
    }
}

/// Filters for the post listing.
#[derive(Debug, Deserialize)]
struct PostListQuery {
    category: Option<String>,
    status: Option<post::ContentStatus>,
    date_from: Option<DateTime<FixedOffset>>,
    date_to: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    sort: SortParam,
    #[serde(default = "super::default_limit")]
    limit: u64,
    #[serde(default)]
    offset: u64,
}

/// List posts with filters, sorting, and pagination.
async fn list_posts(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> AppResult<Json<PostsResponse>> {
    let post_query = PostQuery {
        category_id: query.category,
        status: query.status,
        date_from: query.date_from,
        date_to: query.date_to,
        sort: query.sort.into(),
        limit: query.limit.min(super::MAX_LIMIT),
        offset: query.offset,
        ..PostQuery::default()
    };

    let (posts, total) = state.post_service.list(post_query, viewer.as_ref()).await?;
    Ok(Json(PostsResponse { posts, total }))
}

/// Posts the authenticated user follows.
async fn followed_posts(
    AuthUser(viewer): AuthUser,
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<PostsResponse>> {
    let posts = state
        .post_service
        .list_followed(&viewer, page.limit(), page.offset)
        .await?;
    let total = posts.len() as u64;
    Ok(Json(PostsResponse { posts, total }))
}

/// Create a post.
///
/// Accepts either a JSON body or multipart form data with `title`,
/// `content`, repeated `categories` fields, and up to ten `postImages`
/// image files.
async fn create_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    req: Request<Body>,
) -> AppResult<impl IntoResponse> {
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let (input, image_keys) = if is_multipart {
        let multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?;
        parse_multipart_post(&state, &actor.id, multipart).await?
    } else {
        let Json(input) = Json::<CreatePostInput>::from_request(req, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        (input, Vec::new())
    };

    let created = match state.post_service.create(&actor, input).await {
        Ok(post) => post,
        Err(e) => {
            // The files were written before the post row; drop them again
            for key in &image_keys {
                if let Err(del) = state.storage.delete(key).await {
                    tracing::warn!(error = %del, key = %key, "Failed to remove orphaned upload");
                }
            }
            return Err(e);
        }
    };

    if !image_keys.is_empty() {
        state
            .post_service
            .attach_images(&actor, &created.id, image_keys)
            .await?;
    }

    Ok((StatusCode::CREATED, Json(PostResponse { post: created })))
}

async fn parse_multipart_post(
    state: &AppState,
    user_id: &str,
    mut multipart: Multipart,
) -> AppResult<(CreatePostInput, Vec<String>)> {
    let mut title = String::new();
    let mut content = String::new();
    let mut categories = Vec::new();
    let mut image_keys = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?
    {
        match field.name() {
            Some("title") => title = read_text(field).await?,
            Some("content") => content = read_text(field).await?,
            Some("categories") => {
                let value = read_text(field).await?;
                categories.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                );
            }
            Some("postImages") => {
                if image_keys.len() >= MAX_POST_IMAGES {
                    return Err(AppError::BadRequest(
                        "At most 10 images per post".to_string(),
                    ));
                }
                let stored =
                    super::store_image_field(state.storage.as_ref(), user_id, field).await?;
                image_keys.push(stored.key);
            }
            _ => {}
        }
    }

    Ok((
        CreatePostInput {
            title,
            content,
            categories,
        },
        image_keys,
    ))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))
}

/// Get a post.
async fn get_post(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PostResponse>> {
    let post = state.post_service.get(&id, viewer.as_ref()).await?;
    Ok(Json(PostResponse { post }))
}

/// Update a post.
async fn update_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePostInput>,
) -> AppResult<Json<PostResponse>> {
    let post = state.post_service.update(&actor, &id, input).await?;
    Ok(Json(PostResponse { post }))
}

/// Delete a post with its images.
async fn delete_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.post_service.delete(&actor, &id).await?;
    Ok(no_content())
}

#[derive(Serialize)]
struct CategoryIdsResponse {
    categories: Vec<String>,
}

/// Category IDs attached to a post.
async fn post_categories(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CategoryIdsResponse>> {
    state.post_service.get(&id, viewer.as_ref()).await?;
    let categories = state.post_service.category_ids(&id).await?;
    Ok(Json(CategoryIdsResponse { categories }))
}

#[derive(Serialize)]
struct ImagesResponse {
    images: Vec<post_image::Model>,
}

/// Images attached to a post.
async fn post_images(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ImagesResponse>> {
    state.post_service.get(&id, viewer.as_ref()).await?;
    let images = state.post_service.images(&id).await?;
    Ok(Json(ImagesResponse { images }))
}

/// Upload additional images to a post. Author only.
async fn upload_post_images(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<ImagesResponse>> {
    // Existence and ownership are settled before any file reaches storage.
    let post = state.post_service.get(&id, Some(&actor)).await?;
    if post.author_id != actor.id {
        return Err(AppError::Forbidden(
            "Only the author can attach images".to_string(),
        ));
    }

    let existing = state.post_service.images(&id).await?.len();
    let mut keys = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("postImages") {
            continue;
        }
        if existing + keys.len() >= MAX_POST_IMAGES {
            return Err(AppError::BadRequest("At most 10 images per post".to_string()));
        }
        let stored = super::store_image_field(state.storage.as_ref(), &actor.id, field).await?;
        keys.push(stored.key);
    }

    let images = match state.post_service.attach_images(&actor, &id, keys.clone()).await {
        Ok(images) => images,
        Err(e) => {
            // The files were written before the rows; drop them again
            for key in &keys {
                if let Err(del) = state.storage.delete(key).await {
                    tracing::warn!(error = %del, key = %key, "Failed to remove orphaned upload");
                }
            }
            return Err(e);
        }
    };
    Ok(Json(ImagesResponse { images }))
}

#[derive(Serialize)]
struct CommentTreeResponse {
    comments: Vec<CommentNode>,
}

/// The comment tree of a post.
async fn post_comments(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CommentTreeResponse>> {
    let comments = state.comment_service.tree(&id, viewer.as_ref()).await?;
    Ok(Json(CommentTreeResponse { comments }))
}

#[derive(Serialize)]
struct CommentResponse {
    comment: comment::Model,
}

/// Comment on a post.
async fn create_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<impl IntoResponse> {
    let comment = state.comment_service.create(&actor, &id, input).await?;
    Ok((StatusCode::CREATED, Json(CommentResponse { comment })))
}

#[derive(Serialize)]
struct LikesResponse {
    likes: Vec<like::Model>,
}

/// Votes on a post.
async fn post_likes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<LikesResponse>> {
    let likes = state.like_service.post_votes(&id).await?;
    Ok(Json(LikesResponse { likes }))
}

/// Vote toggle request.
#[derive(Debug, Deserialize)]
pub(super) struct VoteRequest {
    pub vote: like::VoteType,
}

/// Vote toggle response.
#[derive(Serialize)]
pub(super) struct VoteResponse {
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like: Option<like::Model>,
}

impl From<ToggleOutcome> for VoteResponse {
    fn from(outcome: ToggleOutcome) -> Self {
        match outcome {
            ToggleOutcome::Created(like) => Self {
                result: "created",
                like: Some(like),
            },
            ToggleOutcome::Updated(like) => Self {
                result: "updated",
                like: Some(like),
            },
            ToggleOutcome::Removed => Self {
                result: "removed",
                like: None,
            },
        }
    }
}

/// Toggle a vote on a post.
async fn vote_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<Json<VoteResponse>> {
    let outcome = state.like_service.toggle_post_vote(&actor, &id, req.vote).await?;
    Ok(Json(outcome.into()))
}

/// Withdraw a vote on a post.
async fn unvote_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.like_service.remove_post_vote(&actor, &id).await?;
    Ok(no_content())
}

#[derive(Serialize)]
struct FollowStatusResponse {
    following: bool,
    followers: u64,
}

/// Whether the viewer follows a post, and its follower count.
async fn follow_status(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<FollowStatusResponse>> {
    state.post_service.get(&id, viewer.as_ref()).await?;

    let following = match &viewer {
        Some(user) => state.follow_service.is_following(&user.id, &id).await?,
        None => false,
    };
    let followers = state.follow_service.follower_count(&id).await?;
    Ok(Json(FollowStatusResponse { following, followers }))
}

#[derive(Serialize)]
struct FollowResponse {
    follow: follow::Model,
}

/// Follow a post.
async fn follow_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let follow = state.follow_service.follow(&actor, &id).await?;
    Ok((StatusCode::CREATED, Json(FollowResponse { follow })))
}

/// Unfollow a post.
async fn unfollow_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.follow_service.unfollow(&actor, &id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/followed", get(followed_posts))
        .route(
            "/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/{id}/categories", get(post_categories))
        .route("/{id}/images", get(post_images).post(upload_post_images))
        .route("/{id}/comments", get(post_comments).post(create_comment))
        .route(
            "/{id}/like",
            get(post_likes).post(vote_post).delete(unvote_post),
        )
        .route(
            "/{id}/follow",
            get(follow_status).post(follow_post).delete(unfollow_post),
        )
}
