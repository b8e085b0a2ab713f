//! Notification endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use usof_common::AppResult;
use usof_db::entities::notification;

use crate::{extractors::AuthUser, middleware::AppState, response::no_content};

/// Listing filters.
#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    unread_only: bool,
    #[serde(default = "super::default_limit")]
    limit: u64,
    #[serde(default)]
    offset: u64,
}

#[derive(Serialize)]
struct NotificationsResponse {
    notifications: Vec<notification::Model>,
}

/// The authenticated user's notifications, newest first.
async fn list_notifications(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<NotificationsResponse>> {
    let notifications = state
        .notification_service
        .list(
            &user.id,
            query.unread_only,
            query.limit.min(super::MAX_LIMIT),
            query.offset,
        )
        .await?;
    Ok(Json(NotificationsResponse { notifications }))
}

#[derive(Serialize)]
struct UnreadCountResponse {
    unread: u64,
}

/// Count unread notifications.
async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UnreadCountResponse>> {
    let unread = state.notification_service.unread_count(&user.id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

/// Mark one notification as read.
async fn mark_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.notification_service.mark_read(&user.id, &id).await?;
    Ok(no_content())
}

/// Mark every notification as read.
async fn mark_all_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.notification_service.mark_all_read(&user.id).await?;
    Ok(no_content())
}

/// Delete a notification.
async fn delete_notification(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.notification_service.delete(&user.id, &id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/{id}/read", post(mark_read))
        .route("/{id}", axum::routing::delete(delete_notification))
}
