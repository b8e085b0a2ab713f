//! Notification service.
//!
//! Persists per-user notices and fans them out when content changes hands.
//! Fan-out is best-effort from the caller's point of view; a failed insert
//! never rolls back the action that triggered it.

use chrono::Utc;
use sea_orm::Set;
use usof_common::{AppError, AppResult, IdGenerator};
use usof_db::{
    entities::{
        comment, notification::{self, NotificationTarget}, post, report, user,
    },
    repositories::{FollowRepository, NotificationRepository},
};

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    follow_repo: FollowRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub fn new(notification_repo: NotificationRepository, follow_repo: FollowRepository) -> Self {
        Self {
            notification_repo,
            follow_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// A user's notifications, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_user(user_id, unread_only, limit, offset)
            .await
    }

    /// Count a user's unread notifications.
    pub async fn unread_count(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Mark one notification as read.
    pub async fn mark_read(&self, user_id: &str, id: &str) -> AppResult<()> {
        if self.notification_repo.mark_read(id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("notification {id}")))
        }
    }

    /// Mark all of a user's notifications as read.
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_read(user_id).await
    }

    /// Delete one notification.
    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        if self.notification_repo.delete(id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("notification {id}")))
        }
    }

    /// Notify the post author and every follower about a new comment,
    /// skipping the commenter themselves.
    pub async fn fan_out_comment(
        &self,
        post: &post::Model,
        actor: &user::Model,
        comment: &comment::Model,
    ) -> AppResult<()> {
        let mut recipients = self.follow_repo.follower_ids(&post.id).await?;
        if !recipients.contains(&post.author_id) {
            recipients.push(post.author_id.clone());
        }
        recipients.retain(|id| id != &actor.id);

        let message = format!("{} commented on \"{}\"", actor.login, post.title);
        let models = recipients
            .into_iter()
            .map(|user_id| notification::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user_id),
                actor_id: Set(Some(actor.id.clone())),
                target_type: Set(NotificationTarget::Comment),
                target_id: Set(comment.id.clone()),
                message: Set(message.clone()),
                is_read: Set(false),
                created_at: Set(Utc::now().into()),
            })
            .collect();

        self.notification_repo.create_many(models).await
    }

    /// Notify a post author that someone voted on their post.
    pub async fn notify_post_voted(
        &self,
        post: &post::Model,
        actor: &user::Model,
        liked: bool,
    ) -> AppResult<()> {
        let verb = if liked { "liked" } else { "disliked" };
        let message = format!("{} {} \"{}\"", actor.login, verb, post.title);

        self.notification_repo
            .create(notification::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(post.author_id.clone()),
                actor_id: Set(Some(actor.id.clone())),
                target_type: Set(NotificationTarget::Post),
                target_id: Set(post.id.clone()),
                message: Set(message),
                is_read: Set(false),
                created_at: Set(Utc::now().into()),
            })
            .await?;
        Ok(())
    }

    /// Notify the reporter that their report was resolved.
    pub async fn notify_report_resolved(&self, report: &report::Model) -> AppResult<()> {
        let message = match report.action {
            Some(report::ReportAction::Deleted) => {
                "Your report was resolved: the content was removed".to_string()
            }
            Some(report::ReportAction::Warned) => {
                "Your report was resolved: the author was warned".to_string()
            }
            _ => "Your report was reviewed and closed".to_string(),
        };

        self.notification_repo
            .create(notification::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(report.reporter_id.clone()),
                actor_id: Set(report.resolved_by.clone()),
                target_type: Set(NotificationTarget::Report),
                target_id: Set(report.id.clone()),
                message: Set(message),
                is_read: Set(false),
                created_at: Set(Utc::now().into()),
            })
            .await?;
        Ok(())
    }

    /// Notify a content author about a moderation outcome against their
    /// post or comment.
    pub async fn notify_author_moderated(
        &self,
        author_id: &str,
        report: &report::Model,
        message: String,
    ) -> AppResult<()> {
        let (target_type, target_id) = match (&report.post_id, &report.comment_id) {
            (Some(post_id), _) => (NotificationTarget::Post, post_id.clone()),
            (_, Some(comment_id)) => (NotificationTarget::Comment, comment_id.clone()),
            _ => (NotificationTarget::Report, report.id.clone()),
        };

        self.notification_repo
            .create(notification::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(author_id.to_string()),
                actor_id: Set(report.resolved_by.clone()),
                target_type: Set(target_type),
                target_id: Set(target_id),
                message: Set(message),
                is_read: Set(false),
                created_at: Set(Utc::now().into()),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use usof_db::test_utils::test_notification;

    fn make_service(
        notif_db: sea_orm::DatabaseConnection,
        follow_db: sea_orm::DatabaseConnection,
    ) -> NotificationService {
        NotificationService::new(
            NotificationRepository::new(Arc::new(notif_db)),
            FollowRepository::new(Arc::new(follow_db)),
        )
    }

    #[tokio::test]
    async fn test_mark_read_unknown_notification() {
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([sea_orm::MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let result = service.mark_read("u1", "missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_returns_rows() {
        let n1 = test_notification("n1", "u1", "p1");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n1]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let result = service.list("u1", false, 10, 0).await.unwrap();
        assert_eq!(result.len(), 1);
    }
}
