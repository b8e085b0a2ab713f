//! Follow service.

use chrono::Utc;
use sea_orm::Set;
use usof_common::{AppError, AppResult, IdGenerator};
use usof_db::{
    entities::{
        follow, post,
        user::{self, UserRole},
    },
    repositories::{FollowRepository, PostRepository},
};

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    post_repo: PostRepository,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub fn new(follow_repo: FollowRepository, post_repo: PostRepository) -> Self {
        Self {
            follow_repo,
            post_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow a post. Following your own post is rejected.
    pub async fn follow(&self, actor: &user::Model, post_id: &str) -> AppResult<follow::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if post.status != post::ContentStatus::Active
            && actor.role != UserRole::Admin
            && actor.id != post.author_id
        {
            return Err(AppError::PostNotFound(post_id.to_string()));
        }
        if post.author_id == actor.id {
            return Err(AppError::BadRequest("Cannot follow own post".to_string()));
        }
        if self.follow_repo.is_following(&actor.id, post_id).await? {
            return Err(AppError::Conflict("Already following this post".to_string()));
        }

        self.follow_repo
            .create(follow::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(actor.id.clone()),
                post_id: Set(post_id.to_string()),
                created_at: Set(Utc::now().into()),
            })
            .await
    }

    /// Unfollow a post.
    pub async fn unfollow(&self, actor: &user::Model, post_id: &str) -> AppResult<()> {
        self.post_repo.get_by_id(post_id).await?;

        if self.follow_repo.delete(&actor.id, post_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Not following this post".to_string()))
        }
    }

    /// Whether the actor follows a post.
    pub async fn is_following(&self, actor_id: &str, post_id: &str) -> AppResult<bool> {
        self.follow_repo.is_following(actor_id, post_id).await
    }

    /// Count followers of a post.
    pub async fn follower_count(&self, post_id: &str) -> AppResult<u64> {
        self.follow_repo.count_by_post(post_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use usof_db::test_utils::{test_follow, test_post, test_user};

    fn make_service(
        follow_db: sea_orm::DatabaseConnection,
        post_db: sea_orm::DatabaseConnection,
    ) -> FollowService {
        FollowService::new(
            FollowRepository::new(Arc::new(follow_db)),
            PostRepository::new(Arc::new(post_db)),
        )
    }

    #[tokio::test]
    async fn test_follow_own_post_rejected() {
        let post = test_post("p1", "u1", "mine");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service.follow(&actor, "p1").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_follow_twice_conflicts() {
        let post = test_post("p1", "u2", "theirs");
        let existing = test_follow("f1", "u1", "p1");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service.follow(&actor, "p1").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unfollow_without_follow() {
        let post = test_post("p1", "u2", "theirs");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([sea_orm::MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service.unfollow(&actor, "p1").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
