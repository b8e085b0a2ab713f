//! Like service.
//!
//! Votes are a three-way toggle: a repeated vote withdraws it, the
//! opposite vote flips it, and a fresh vote records it. Voting on your own
//! content is rejected.

use usof_common::{AppError, AppResult, IdGenerator};
use usof_db::{
    entities::{
        comment, like::{self, TargetType, VoteType}, post,
        user::{self, UserRole},
    },
    repositories::{CommentRepository, LikeRepository, PostRepository, ToggleOutcome},
};

use crate::services::notification::NotificationService;

/// Like service for business logic.
#[derive(Clone)]
pub struct LikeService {
    like_repo: LikeRepository,
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl LikeService {
    /// Create a new like service.
    #[must_use]
    pub fn new(
        like_repo: LikeRepository,
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            like_repo,
            post_repo,
            comment_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Votes on a post.
    pub async fn post_votes(&self, post_id: &str) -> AppResult<Vec<like::Model>> {
        self.post_repo.get_by_id(post_id).await?;
        self.like_repo.find_by_target(TargetType::Post, post_id).await
    }

    /// Votes on a comment.
    pub async fn comment_votes(&self, comment_id: &str) -> AppResult<Vec<like::Model>> {
        self.comment_repo.get_by_id(comment_id).await?;
        self.like_repo
            .find_by_target(TargetType::Comment, comment_id)
            .await
    }

    /// Toggle a vote on a post.
    pub async fn toggle_post_vote(
        &self,
        actor: &user::Model,
        post_id: &str,
        vote: VoteType,
    ) -> AppResult<ToggleOutcome> {
        let post = self.post_repo.get_by_id(post_id).await?;
        ensure_active_post(&post, actor)?;

        if post.author_id == actor.id {
            return Err(AppError::Forbidden("Cannot vote on own post".to_string()));
        }

        let outcome = self
            .like_repo
            .toggle(
                self.id_gen.generate(),
                &actor.id,
                TargetType::Post,
                post_id,
                &post.author_id,
                vote,
            )
            .await?;

        if let ToggleOutcome::Created(created) = &outcome {
            let liked = created.vote == VoteType::Like;
            if let Err(e) = self.notifications.notify_post_voted(&post, actor, liked).await {
                tracing::warn!(error = %e, "Failed to notify post author about vote");
            }
        }

        Ok(outcome)
    }

    /// Toggle a vote on a comment.
    pub async fn toggle_comment_vote(
        &self,
        actor: &user::Model,
        comment_id: &str,
        vote: VoteType,
    ) -> AppResult<ToggleOutcome> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;
        ensure_active_comment(&comment, actor)?;

        if comment.author_id == actor.id {
            return Err(AppError::Forbidden("Cannot vote on own comment".to_string()));
        }

        self.like_repo
            .toggle(
                self.id_gen.generate(),
                &actor.id,
                TargetType::Comment,
                comment_id,
                &comment.author_id,
                vote,
            )
            .await
    }

    /// Withdraw a vote on a post.
    pub async fn remove_post_vote(&self, actor: &user::Model, post_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;

        let removed = self
            .like_repo
            .remove(&actor.id, TargetType::Post, post_id, &post.author_id)
            .await?;
        if removed {
            Ok(())
        } else {
            Err(AppError::NotFound("No vote on this post".to_string()))
        }
    }

    /// Withdraw a vote on a comment.
    pub async fn remove_comment_vote(
        &self,
        actor: &user::Model,
        comment_id: &str,
    ) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        let removed = self
            .like_repo
            .remove(&actor.id, TargetType::Comment, comment_id, &comment.author_id)
            .await?;
        if removed {
            Ok(())
        } else {
            Err(AppError::NotFound("No vote on this comment".to_string()))
        }
    }
}

fn ensure_active_post(post: &post::Model, actor: &user::Model) -> AppResult<()> {
    if post.status == post::ContentStatus::Active {
        return Ok(());
    }
    if actor.role == UserRole::Admin || actor.id == post.author_id {
        return Err(AppError::BadRequest("Post is inactive".to_string()));
    }
    Err(AppError::PostNotFound(post.id.clone()))
}

fn ensure_active_comment(comment: &comment::Model, actor: &user::Model) -> AppResult<()> {
    if comment.status == comment::ContentStatus::Active {
        return Ok(());
    }
    if actor.role == UserRole::Admin || actor.id == comment.author_id {
        return Err(AppError::BadRequest("Comment is inactive".to_string()));
    }
    Err(AppError::CommentNotFound(comment.id.clone()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use usof_db::{
        repositories::{FollowRepository, NotificationRepository},
        test_utils::{test_comment, test_post, test_user},
    };

    fn make_service(
        like_db: sea_orm::DatabaseConnection,
        post_db: sea_orm::DatabaseConnection,
        comment_db: sea_orm::DatabaseConnection,
    ) -> LikeService {
        let notif_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let follow_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        LikeService::new(
            LikeRepository::new(Arc::new(like_db)),
            PostRepository::new(Arc::new(post_db)),
            CommentRepository::new(Arc::new(comment_db)),
            NotificationService::new(
                NotificationRepository::new(notif_db),
                FollowRepository::new(follow_db),
            ),
        )
    }

    #[tokio::test]
    async fn test_vote_on_own_post_forbidden() {
        let post = test_post("p1", "u1", "mine");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service.toggle_post_vote(&actor, "p1", VoteType::Like).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_vote_on_missing_post() {
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service.toggle_post_vote(&actor, "gone", VoteType::Like).await;
        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_vote_on_inactive_post_hidden_from_stranger() {
        let mut post = test_post("p1", "u2", "hidden");
        post.status = post::ContentStatus::Inactive;

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service.toggle_post_vote(&actor, "p1", VoteType::Like).await;
        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_vote_on_own_comment_forbidden() {
        let comment = test_comment("c1", "p1", "u1");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment]])
                .into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .toggle_comment_vote(&actor, "c1", VoteType::Dislike)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
