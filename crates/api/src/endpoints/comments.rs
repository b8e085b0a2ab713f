//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use usof_common::{AppError, AppResult};
use usof_db::entities::{comment, like};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::no_content,
};

use super::posts::{VoteRequest, VoteResponse};

#[derive(Serialize)]
struct CommentResponse {
    comment: comment::Model,
}

/// Get a comment.
async fn get_comment(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state.comment_service.get(&id, viewer.as_ref()).await?;
    Ok(Json(CommentResponse { comment }))
}

/// Comment update request. Content edits are author-only; status changes
/// also allow admins.
#[derive(Debug, Deserialize)]
struct UpdateCommentRequest {
    content: Option<String>,
    status: Option<comment::ContentStatus>,
}

/// Update a comment's content or status.
async fn update_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCommentRequest>,
) -> AppResult<Json<CommentResponse>> {
    if req.content.is_none() && req.status.is_none() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }

    let mut comment = None;
    if let Some(content) = req.content {
        comment = Some(
            state
                .comment_service
                .update_content(&actor, &id, content)
                .await?,
        );
    }
    if let Some(status) = req.status {
        comment = Some(state.comment_service.set_status(&actor, &id, status).await?);
    }

    // One of the branches ran; both return the updated row
    match comment {
        Some(comment) => Ok(Json(CommentResponse { comment })),
        None => Err(AppError::BadRequest("Nothing to update".to_string())),
    }
}

/// Delete a comment. Its replies surface as tree roots.
async fn delete_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.comment_service.delete(&actor, &id).await?;
    Ok(no_content())
}

#[derive(Serialize)]
struct LikesResponse {
    likes: Vec<like::Model>,
}

/// Votes on a comment.
async fn comment_likes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<LikesResponse>> {
    let likes = state.like_service.comment_votes(&id).await?;
    Ok(Json(LikesResponse { likes }))
}

/// Toggle a vote on a comment.
async fn vote_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<Json<VoteResponse>> {
    let outcome = state
        .like_service
        .toggle_comment_vote(&actor, &id, req.vote)
        .await?;
    Ok(Json(outcome.into()))
}

/// Withdraw a vote on a comment.
async fn unvote_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.like_service.remove_comment_vote(&actor, &id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(get_comment).patch(update_comment).delete(delete_comment),
        )
        .route(
            "/{id}/like",
            get(comment_likes).post(vote_comment).delete(unvote_comment),
        )
}
