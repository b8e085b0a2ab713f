//! Collection endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use usof_common::AppResult;
use usof_core::{CreateCollectionInput, UpdateCollectionInput};
use usof_db::entities::{collection, post};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::no_content,
};

use super::Pagination;

#[derive(Serialize)]
struct CollectionResponse {
    collection: collection::Model,
}

#[derive(Serialize)]
struct CollectionsResponse {
    collections: Vec<collection::Model>,
}

/// The authenticated user's own collections.
async fn list_own(
    AuthUser(viewer): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<CollectionsResponse>> {
    let collections = state.collection_service.list_own(&viewer).await?;
    Ok(Json(CollectionsResponse { collections }))
}

/// Owner filter for the public listing.
#[derive(Debug, Deserialize)]
struct PublicQuery {
    owner_id: String,
}

/// Another user's collections. Strangers see public ones only.
async fn list_public(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PublicQuery>,
) -> AppResult<Json<CollectionsResponse>> {
    let collections = state
        .collection_service
        .list_of_user(&query.owner_id, viewer.as_ref())
        .await?;
    Ok(Json(CollectionsResponse { collections }))
}

/// Create a collection.
async fn create_collection(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCollectionInput>,
) -> AppResult<impl IntoResponse> {
    let collection = state.collection_service.create(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(CollectionResponse { collection })))
}

/// Get a collection.
async fn get_collection(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CollectionResponse>> {
    let collection = state.collection_service.get(&id, viewer.as_ref()).await?;
    Ok(Json(CollectionResponse { collection }))
}

/// Update a collection. Owner only.
async fn update_collection(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCollectionInput>,
) -> AppResult<Json<CollectionResponse>> {
    let collection = state.collection_service.update(&actor, &id, input).await?;
    Ok(Json(CollectionResponse { collection }))
}

/// Delete a collection. Owner or admin.
async fn delete_collection(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.collection_service.delete(&actor, &id).await?;
    Ok(no_content())
}

#[derive(Serialize)]
struct PostsResponse {
    posts: Vec<post::Model>,
    total: u64,
}

/// Posts in a collection, newest first.
async fn collection_posts(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<PostsResponse>> {
    let (posts, total) = state
        .collection_service
        .posts(&id, viewer.as_ref(), page.limit(), page.offset)
        .await?;
    Ok(Json(PostsResponse { posts, total }))
}

/// Add a post to a collection. Owner only.
async fn add_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path((id, post_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    state.collection_service.add_post(&actor, &id, &post_id).await?;
    Ok(StatusCode::CREATED)
}

/// Remove a post from a collection. Owner only.
async fn remove_post(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path((id, post_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    state
        .collection_service
        .remove_post(&actor, &id, &post_id)
        .await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_own).post(create_collection))
        .route("/public", get(list_public))
        .route(
            "/{id}",
            get(get_collection)
                .patch(update_collection)
                .delete(delete_collection),
        )
        .route("/{id}/posts", get(collection_posts))
        .route("/{id}/posts/{post_id}", post(add_post).delete(remove_post))
}
