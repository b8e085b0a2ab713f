//! Like repository.

use std::sync::Arc;

use crate::aggregates;
use crate::entities::{
    Like,
    like::{self, TargetType, VoteType},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use usof_common::{AppError, AppResult};

/// What a vote toggle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A fresh vote was recorded.
    Created(like::Model),
    /// An opposite vote was flipped.
    Updated(like::Model),
    /// The same vote existed and was withdrawn.
    Removed,
}

/// Like repository for database operations.
#[derive(Clone)]
pub struct LikeRepository {
    db: Arc<DatabaseConnection>,
}

impl LikeRepository {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All votes on a target, newest first.
    pub async fn find_by_target(
        &self,
        target_type: TargetType,
        target_id: &str,
    ) -> AppResult<Vec<like::Model>> {
        Like::find()
            .filter(like::Column::TargetType.eq(target_type))
            .filter(like::Column::TargetId.eq(target_id))
            .order_by_desc(like::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Toggle a vote.
    ///
    /// Same vote again withdraws it, the opposite vote flips it, no prior
    /// vote records a new one. The vote row, the target's `likes_count`,
    /// and the target author's rating all move in one transaction.
    pub async fn toggle(
        &self,
        new_id: String,
        author_id: &str,
        target_type: TargetType,
        target_id: &str,
        target_author_id: &str,
        vote: VoteType,
    ) -> AppResult<ToggleOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let existing = Like::find()
            .filter(like::Column::AuthorId.eq(author_id))
            .filter(like::Column::TargetType.eq(target_type))
            .filter(like::Column::TargetId.eq(target_id))
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let outcome = match existing {
            Some(row) if row.vote == vote => {
                Like::delete_by_id(row.id.as_str())
                    .exec(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                ToggleOutcome::Removed
            }
            Some(row) => {
                let mut active: like::ActiveModel = row.into();
                active.vote = Set(vote);
                let updated = active
                    .update(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                ToggleOutcome::Updated(updated)
            }
            None => {
                let created = like::ActiveModel {
                    id: Set(new_id),
                    author_id: Set(author_id.to_string()),
                    target_type: Set(target_type),
                    target_id: Set(target_id.to_string()),
                    vote: Set(vote),
                    created_at: Set(Utc::now().into()),
                }
                .insert(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
                ToggleOutcome::Created(created)
            }
        };

        Self::recompute(&txn, target_type, target_id, target_author_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(outcome)
    }

    /// Withdraw a user's vote on a target, refreshing the same aggregates
    /// as [`toggle`](Self::toggle). No-op when no vote exists.
    pub async fn remove(
        &self,
        author_id: &str,
        target_type: TargetType,
        target_id: &str,
        target_author_id: &str,
    ) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let result = Like::delete_many()
            .filter(like::Column::AuthorId.eq(author_id))
            .filter(like::Column::TargetType.eq(target_type))
            .filter(like::Column::TargetId.eq(target_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = result.rows_affected > 0;
        if removed {
            Self::recompute(&txn, target_type, target_id, target_author_id).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(removed)
    }

    async fn recompute(
        txn: &DatabaseTransaction,
        target_type: TargetType,
        target_id: &str,
        target_author_id: &str,
    ) -> AppResult<()> {
        aggregates::recompute_target_likes_count(txn, target_type, target_id).await?;
        aggregates::recompute_user_rating(txn, target_author_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::test_like;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_by_target_lists_votes() {
        let l1 = test_like("l1", "u1", "p1", VoteType::Like);
        let l2 = test_like("l2", "u2", "p1", VoteType::Dislike);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[l1, l2]])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        let result = repo.find_by_target(TargetType::Post, "p1").await.unwrap();

        assert_eq!(result.len(), 2);
    }
}
