//! Category endpoints. Mutations are admin-only.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use usof_common::AppResult;
use usof_core::{CreateCategoryInput, UpdateCategoryInput};
use usof_db::{entities::{category, post}, repositories::PostQuery};

use crate::{
    extractors::{AdminUser, MaybeAuthUser},
    middleware::AppState,
    response::no_content,
};

use super::Pagination;

#[derive(Serialize)]
struct CategoryResponse {
    category: category::Model,
}

#[derive(Serialize)]
struct CategoriesResponse {
    categories: Vec<category::Model>,
    total: u64,
}

/// List categories alphabetically.
async fn list_categories(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<CategoriesResponse>> {
    let (categories, total) = state
        .category_service
        .list(page.limit(), page.offset)
        .await?;
    Ok(Json(CategoriesResponse { categories, total }))
}

/// Create a category. Admin only.
async fn create_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<impl IntoResponse> {
    let category = state.category_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(CategoryResponse { category })))
}

/// Get a category.
async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CategoryResponse>> {
    let category = state.category_service.get(&id).await?;
    Ok(Json(CategoryResponse { category }))
}

/// Update a category. Admin only.
async fn update_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCategoryInput>,
) -> AppResult<Json<CategoryResponse>> {
    let category = state.category_service.update(&id, input).await?;
    Ok(Json(CategoryResponse { category }))
}

/// Delete a category. Admin only; posts keep existing.
async fn delete_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.category_service.delete(&id).await?;
    Ok(no_content())
}

#[derive(Serialize)]
struct PostsResponse {
    posts: Vec<post::Model>,
    total: u64,
}

/// Posts in a category, visibility-scoped to the viewer.
async fn category_posts(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<PostsResponse>> {
    state.category_service.get(&id).await?;

    let query = PostQuery {
        category_id: Some(id),
        limit: page.limit(),
        offset: page.offset,
        ..PostQuery::default()
    };
    let (posts, total) = state.post_service.list(query, viewer.as_ref()).await?;
    Ok(Json(PostsResponse { posts, total }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
        .route("/{id}/posts", get(category_posts))
}
