//! User endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use usof_common::{AppError, AppResult};
use usof_core::{CreateUserInput, UpdateUserInput};
use usof_db::{
    entities::{collection, post, user::{self, UserRole}},
    repositories::PostQuery,
};

use crate::{
    extractors::{AdminUser, AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::no_content,
};

use super::Pagination;

#[derive(Serialize)]
struct UserResponse {
    user: user::Model,
}

#[derive(Serialize)]
struct UsersResponse {
    users: Vec<user::Model>,
    total: u64,
}

/// List users, highest rating first.
async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<UsersResponse>> {
    let (users, total) = state.user_service.list(page.limit(), page.offset).await?;
    Ok(Json(UsersResponse { users, total }))
}

/// Create a user with an explicit role. Admin only.
async fn create_user(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> AppResult<impl IntoResponse> {
    let user = state.user_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// Get a user's public profile.
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = state.user_service.get(&id).await?;
    Ok(Json(UserResponse { user }))
}

/// Update a user's profile. Self or admin; role changes are rejected here.
async fn update_user(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut input): Json<UpdateUserInput>,
) -> AppResult<Json<UserResponse>> {
    // Role changes go through the dedicated admin route
    input.role = None;
    let user = state.user_service.update(&actor, &id, input).await?;
    Ok(Json(UserResponse { user }))
}

/// Role change request.
#[derive(Debug, Deserialize)]
struct SetRoleRequest {
    role: UserRole,
}

/// Change a user's role. Admin only.
async fn set_role(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    let input = UpdateUserInput {
        role: Some(req.role),
        ..UpdateUserInput::default()
    };
    let user = state.user_service.update(&admin, &id, input).await?;
    Ok(Json(UserResponse { user }))
}

/// Delete a user account. Self or admin.
async fn delete_user(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.user_service.delete(&actor, &id).await?;
    Ok(no_content())
}

/// Upload the authenticated user's avatar. Multipart with a single
/// `avatar` image field.
async fn upload_avatar(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UserResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("avatar") {
            continue;
        }
        let stored = super::store_image_field(state.storage.as_ref(), &actor.id, field).await?;
        let user = state.user_service.set_avatar(&actor.id, stored.key).await?;
        return Ok(Json(UserResponse { user }));
    }

    Err(AppError::BadRequest("Missing avatar field".to_string()))
}

#[derive(Serialize)]
struct PostsResponse {
    posts: Vec<post::Model>,
    total: u64,
}

/// Posts written by a user, visibility-scoped to the viewer.
async fn user_posts(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<PostsResponse>> {
    state.user_service.get(&id).await?;

    let query = PostQuery {
        author_id: Some(id),
        limit: page.limit(),
        offset: page.offset,
        ..PostQuery::default()
    };
    let (posts, total) = state.post_service.list(query, viewer.as_ref()).await?;
    Ok(Json(PostsResponse { posts, total }))
}

#[derive(Serialize)]
struct CollectionsResponse {
    collections: Vec<collection::Model>,
}

/// A user's collections. Strangers see public ones only.
async fn user_collections(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CollectionsResponse>> {
    state.user_service.get(&id).await?;

    let collections = state
        .collection_service
        .list_of_user(&id, viewer.as_ref())
        .await?;
    Ok(Json(CollectionsResponse { collections }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/avatar", post(upload_avatar))
        .route(
            "/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/{id}/role", patch(set_role))
        .route("/{id}/posts", get(user_posts))
        .route("/{id}/collections", get(user_collections))
}
