//! Report service.
//!
//! Users flag posts or comments; admins resolve the report with one of
//! three actions. Resolution is terminal: a resolved report cannot be
//! reopened or re-resolved.

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use usof_common::{AppError, AppResult, IdGenerator};
use usof_db::{
    entities::{
        report::{self, ReportAction, ReportStatus},
        user::{self, UserRole},
    },
    repositories::{CommentRepository, PostRepository, ReportRepository, ReportStats},
};
use validator::Validate;

use crate::services::notification::NotificationService;

/// Input for filing a report. Exactly one of `post_id` / `comment_id`
/// must be set.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReportInput {
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

/// Input for resolving a report.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResolveReportInput {
    pub action: ReportAction,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

/// Report service for business logic.
#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub fn new(
        report_repo: ReportRepository,
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            report_repo,
            post_repo,
            comment_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a report. Admins and the reporter can see it.
    pub async fn get(&self, actor: &user::Model, id: &str) -> AppResult<report::Model> {
        let report = self.report_repo.get_by_id(id).await?;
        if actor.role != UserRole::Admin && report.reporter_id != actor.id {
            return Err(AppError::NotFound(format!("report {id}")));
        }
        Ok(report)
    }

    /// List reports, optionally by status. Admin only; the HTTP layer
    /// enforces the role.
    pub async fn list(
        &self,
        status: Option<ReportStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        self.report_repo.list(status, limit, offset).await
    }

    /// Report counts by status. Admin only; the HTTP layer enforces the
    /// role.
    pub async fn stats(&self) -> AppResult<ReportStats> {
        self.report_repo.stats().await
    }

    /// Reports filed by the actor.
    pub async fn list_own(
        &self,
        actor: &user::Model,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        self.report_repo.find_by_reporter(&actor.id, limit, offset).await
    }

    /// File a report against a post or a comment.
    pub async fn create(
        &self,
        actor: &user::Model,
        input: CreateReportInput,
    ) -> AppResult<report::Model> {
        input.validate()?;

        match (&input.post_id, &input.comment_id) {
            (Some(post_id), None) => {
                self.post_repo.get_by_id(post_id).await?;
                if self
                    .report_repo
                    .find_by_reporter_and_post(&actor.id, post_id)
                    .await?
                    .is_some()
                {
                    return Err(AppError::Conflict(
                        "You already reported this post".to_string(),
                    ));
                }
            }
            (None, Some(comment_id)) => {
                self.comment_repo.get_by_id(comment_id).await?;
                if self
                    .report_repo
                    .find_by_reporter_and_comment(&actor.id, comment_id)
                    .await?
                    .is_some()
                {
                    return Err(AppError::Conflict(
                        "You already reported this comment".to_string(),
                    ));
                }
            }
            _ => {
                return Err(AppError::BadRequest(
                    "Report exactly one post or one comment".to_string(),
                ));
            }
        }

        let created = self
            .report_repo
            .create(report::ActiveModel {
                id: Set(self.id_gen.generate()),
                reporter_id: Set(actor.id.clone()),
                post_id: Set(input.post_id),
                comment_id: Set(input.comment_id),
                reason: Set(input.reason),
                status: Set(ReportStatus::Pending),
                resolved_by: Set(None),
                action: Set(None),
                resolution_message: Set(None),
                created_at: Set(Utc::now().into()),
                resolved_at: Set(None),
            })
            .await?;

        tracing::info!(report_id = %created.id, reporter_id = %actor.id, "Filed report");
        Ok(created)
    }

    /// Withdraw a report. Reporters can withdraw their own pending
    /// reports; admins can delete any report.
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let report = self.report_repo.get_by_id(id).await?;

        if actor.role == UserRole::Admin {
            return self.report_repo.delete(id).await;
        }
        if report.reporter_id != actor.id {
            return Err(AppError::NotFound(format!("report {id}")));
        }
        if report.status != ReportStatus::Pending {
            return Err(AppError::Conflict(
                "Resolved reports cannot be withdrawn".to_string(),
            ));
        }
        self.report_repo.delete(id).await
    }

    /// Resolve a pending report. Admin only; the HTTP layer enforces the
    /// role. A `Deleted` action deactivates the reported content in the
    /// same transaction as the status change.
    pub async fn resolve(
        &self,
        admin: &user::Model,
        id: &str,
        input: ResolveReportInput,
    ) -> AppResult<report::Model> {
        input.validate()?;

        let report = self.report_repo.get_by_id(id).await?;
        if report.status != ReportStatus::Pending {
            return Err(AppError::Conflict("Report is already resolved".to_string()));
        }

        let author_id = self.content_author(&report).await?;

        let resolved = self
            .report_repo
            .resolve(report, &admin.id, input.action, input.message.clone())
            .await?;

        if let Err(e) = self.notifications.notify_report_resolved(&resolved).await {
            tracing::warn!(error = %e, "Failed to notify reporter about resolution");
        }

        if input.action != ReportAction::Ignored {
            if let Some(author_id) = author_id {
                let message = match input.action {
                    ReportAction::Deleted => {
                        "Your content was removed after a report".to_string()
                    }
                    _ => input.message.unwrap_or_else(|| {
                        "A moderator issued a warning about your content".to_string()
                    }),
                };
                if let Err(e) = self
                    .notifications
                    .notify_author_moderated(&author_id, &resolved, message)
                    .await
                {
                    tracing::warn!(error = %e, "Failed to notify content author");
                }
            }
        }

        tracing::info!(report_id = %id, admin_id = %admin.id, action = ?input.action, "Resolved report");
        Ok(resolved)
    }

    async fn content_author(&self, report: &report::Model) -> AppResult<Option<String>> {
        if let Some(post_id) = &report.post_id {
            return Ok(self
                .post_repo
                .find_by_id(post_id)
                .await?
                .map(|p| p.author_id));
        }
        if let Some(comment_id) = &report.comment_id {
            return Ok(self
                .comment_repo
                .find_by_id(comment_id)
                .await?
                .map(|c| c.author_id));
        }
        Ok(None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use usof_db::{
        repositories::{FollowRepository, NotificationRepository},
        test_utils::{test_admin, test_post, test_report, test_user},
    };

    fn make_service(
        report_db: sea_orm::DatabaseConnection,
        post_db: sea_orm::DatabaseConnection,
        comment_db: sea_orm::DatabaseConnection,
    ) -> ReportService {
        let notif_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let follow_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        ReportService::new(
            ReportRepository::new(Arc::new(report_db)),
            PostRepository::new(Arc::new(post_db)),
            CommentRepository::new(Arc::new(comment_db)),
            NotificationService::new(
                NotificationRepository::new(notif_db),
                FollowRepository::new(follow_db),
            ),
        )
    }

    #[tokio::test]
    async fn test_create_without_target_rejected() {
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .create(
                &actor,
                CreateReportInput {
                    post_id: None,
                    comment_id: None,
                    reason: "spam".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_create_with_both_targets_rejected() {
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .create(
                &actor,
                CreateReportInput {
                    post_id: Some("p1".to_string()),
                    comment_id: Some("c1".to_string()),
                    reason: "spam".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_duplicate_report_conflicts() {
        let post = test_post("p1", "u2", "spammy");
        let existing = test_report("r1", "u1", "p1");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .create(
                &actor,
                CreateReportInput {
                    post_id: Some("p1".to_string()),
                    comment_id: None,
                    reason: "spam".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_resolve_already_resolved_conflicts() {
        let mut report = test_report("r1", "u1", "p1");
        report.status = ReportStatus::Resolved;

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[report]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let admin = test_admin("a1", "root");

        let result = service
            .resolve(
                &admin,
                "r1",
                ResolveReportInput {
                    action: ReportAction::Ignored,
                    message: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_get_by_stranger_hidden() {
        let report = test_report("r1", "u2", "p1");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[report]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service.get(&actor, "r1").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
