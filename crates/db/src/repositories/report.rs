//! Report repository.

use std::sync::Arc;

use crate::aggregates;
use crate::entities::{
    Comment, Post, Report, comment, post,
    report::{self, ReportAction, ReportStatus},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use serde::Serialize;
use usof_common::{AppError, AppResult};

/// Report counts by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    /// All reports ever filed.
    pub total: u64,
    /// Reports awaiting an admin decision.
    pub pending: u64,
    /// Reports an admin has resolved.
    pub resolved: u64,
}

/// Report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a report by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<report::Model>> {
        Report::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a report by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<report::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("report {id}")))
    }

    /// A reporter's existing report on a post, if any.
    pub async fn find_by_reporter_and_post(
        &self,
        reporter_id: &str,
        post_id: &str,
    ) -> AppResult<Option<report::Model>> {
        Report::find()
            .filter(report::Column::ReporterId.eq(reporter_id))
            .filter(report::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// A reporter's existing report on a comment, if any.
    pub async fn find_by_reporter_and_comment(
        &self,
        reporter_id: &str,
        comment_id: &str,
    ) -> AppResult<Option<report::Model>> {
        Report::find()
            .filter(report::Column::ReporterId.eq(reporter_id))
            .filter(report::Column::CommentId.eq(comment_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new report.
    pub async fn create(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List reports, optionally filtered by status, newest first.
    pub async fn list(
        &self,
        status: Option<ReportStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        let mut query = Report::find();

        if let Some(status) = status {
            query = query.filter(report::Column::Status.eq(status));
        }

        query
            .order_by_desc(report::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Reports filed by a user, newest first (paginated).
    pub async fn find_by_reporter(
        &self,
        reporter_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::ReporterId.eq(reporter_id))
            .order_by_desc(report::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a report.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Report::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Report counts by status. Resolution is terminal, so anything not
    /// pending is resolved.
    pub async fn stats(&self) -> AppResult<ReportStats> {
        let total = Report::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let pending = Report::find()
            .filter(report::Column::Status.eq(ReportStatus::Pending))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ReportStats {
            total,
            pending,
            resolved: total - pending,
        })
    }

    /// Resolve a pending report.
    ///
    /// The status change and, for a `Deleted` action, the deactivation of
    /// the reported content happen in one transaction.
    pub async fn resolve(
        &self,
        report: report::Model,
        admin_id: &str,
        action: ReportAction,
        resolution_message: Option<String>,
    ) -> AppResult<report::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let post_id = report.post_id.clone();
        let comment_id = report.comment_id.clone();

        let mut active: report::ActiveModel = report.into();
        active.status = Set(ReportStatus::Resolved);
        active.resolved_by = Set(Some(admin_id.to_string()));
        active.action = Set(Some(action));
        active.resolution_message = Set(resolution_message);
        active.resolved_at = Set(Some(Utc::now().into()));

        let resolved = active
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if action == ReportAction::Deleted {
            if let Some(post_id) = &post_id {
                Post::update_many()
                    .col_expr(
                        post::Column::Status,
                        Expr::value(post::ContentStatus::Inactive),
                    )
                    .filter(post::Column::Id.eq(post_id.as_str()))
                    .exec(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }

            if let Some(comment_id) = &comment_id {
                let target = Comment::find_by_id(comment_id.as_str())
                    .one(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                if let Some(target) = target {
                    let mut active: comment::ActiveModel = target.clone().into();
                    active.status = Set(comment::ContentStatus::Inactive);
                    active
                        .update(&txn)
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;

                    aggregates::recompute_post_comments_count(&txn, &target.post_id).await?;
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(resolved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::test_report;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<report::Model>::new()])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_pending() {
        let r1 = test_report("r1", "u1", "p1");
        let r2 = test_report("r2", "u2", "p1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[r1, r2]])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        let result = repo.list(Some(ReportStatus::Pending), 10, 0).await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|r| r.status == ReportStatus::Pending));
    }

    #[tokio::test]
    async fn test_stats_splits_resolved_from_pending() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([
                    [maplit::btreemap! {
                        "num_items" => sea_orm::Value::BigInt(Some(7))
                    }],
                    [maplit::btreemap! {
                        "num_items" => sea_orm::Value::BigInt(Some(3))
                    }],
                ])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        let stats = repo.stats().await.unwrap();

        assert_eq!(stats.total, 7);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.resolved, 4);
    }
}
