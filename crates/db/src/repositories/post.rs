//! Post repository.

use std::sync::Arc;

use crate::aggregates;
use crate::entities::{
    Like, Post, PostCategory, PostImage, comment, follow, like, post, post_category, post_image,
};
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::Query,
};
use usof_common::{AppError, AppResult};

/// Sort order for post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    /// Highest likes count first.
    #[default]
    Likes,
    /// Newest first.
    Date,
}

/// Filter set for post listings.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    /// Only posts in this category.
    pub category_id: Option<String>,
    /// Only posts by this author.
    pub author_id: Option<String>,
    /// Only posts with this status. Ignored unless `see_all_statuses`.
    pub status: Option<post::ContentStatus>,
    /// Published on or after.
    pub date_from: Option<DateTime<FixedOffset>>,
    /// Published on or before.
    pub date_to: Option<DateTime<FixedOffset>>,
    /// Admin view: no visibility scoping, `status` filter applies as given.
    pub see_all_statuses: bool,
    /// Non-admin viewer: sees active posts plus their own inactive ones.
    pub viewer_id: Option<String>,
    pub sort: PostSort,
    pub limit: u64,
    pub offset: u64,
}

impl PostQuery {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();

        if self.see_all_statuses {
            if let Some(status) = &self.status {
                cond = cond.add(post::Column::Status.eq(status.clone()));
            }
        } else if let Some(viewer) = &self.viewer_id {
            cond = cond.add(
                Condition::any()
                    .add(post::Column::Status.eq(post::ContentStatus::Active))
                    .add(post::Column::AuthorId.eq(viewer.clone())),
            );
        } else {
            cond = cond.add(post::Column::Status.eq(post::ContentStatus::Active));
        }

        if let Some(author_id) = &self.author_id {
            cond = cond.add(post::Column::AuthorId.eq(author_id.clone()));
        }

        if let Some(category_id) = &self.category_id {
            cond = cond.add(
                post::Column::Id.in_subquery(
                    Query::select()
                        .column(post_category::Column::PostId)
                        .from(post_category::Entity)
                        .and_where(post_category::Column::CategoryId.eq(category_id.clone()))
                        .to_owned(),
                ),
            );
        }

        if let Some(from) = self.date_from {
            cond = cond.add(post::Column::PublishedAt.gte(from));
        }
        if let Some(to) = self.date_to {
            cond = cond.add(post::Column::PublishedAt.lte(to));
        }

        cond
    }
}

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post along with the vote rows that point at it or its
    /// comments, then recompute the author's rating. FKs cascade the rest.
    pub async fn delete(&self, id: &str, author_id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Like::delete_many()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(like::Column::TargetType.eq(like::TargetType::Post))
                            .add(like::Column::TargetId.eq(id)),
                    )
                    .add(
                        Condition::all()
                            .add(like::Column::TargetType.eq(like::TargetType::Comment))
                            .add(
                                like::Column::TargetId.in_subquery(
                                    Query::select()
                                        .column(comment::Column::Id)
                                        .from(comment::Entity)
                                        .and_where(comment::Column::PostId.eq(id))
                                        .to_owned(),
                                ),
                            ),
                    ),
            )
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Post::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        aggregates::recompute_user_rating(&txn, author_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List posts matching a filter set.
    pub async fn list(&self, query: &PostQuery) -> AppResult<Vec<post::Model>> {
        let mut select = Post::find().filter(query.condition());

        select = match query.sort {
            PostSort::Likes => select
                .order_by_desc(post::Column::LikesCount)
                .order_by_desc(post::Column::PublishedAt),
            PostSort::Date => select.order_by_desc(post::Column::PublishedAt),
        };

        select
            .limit(query.limit)
            .offset(query.offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count posts matching a filter set.
    pub async fn count(&self, query: &PostQuery) -> AppResult<u64> {
        Post::find()
            .filter(query.condition())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Posts the given user follows, newest first.
    pub async fn find_followed(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(
                post::Column::Id.in_subquery(
                    Query::select()
                        .column(follow::Column::PostId)
                        .from(follow::Entity)
                        .and_where(follow::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            )
            .filter(
                Condition::any()
                    .add(post::Column::Status.eq(post::ContentStatus::Active))
                    .add(post::Column::AuthorId.eq(user_id)),
            )
            .order_by_desc(post::Column::PublishedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Categories ====================

    /// Category IDs attached to a post.
    pub async fn category_ids(&self, post_id: &str) -> AppResult<Vec<String>> {
        let links = PostCategory::find()
            .filter(post_category::Column::PostId.eq(post_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(links.into_iter().map(|l| l.category_id).collect())
    }

    /// Replace a post's category links.
    pub async fn set_categories(&self, post_id: &str, category_ids: &[String]) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        PostCategory::delete_many()
            .filter(post_category::Column::PostId.eq(post_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !category_ids.is_empty() {
            let links = category_ids.iter().map(|cat| post_category::ActiveModel {
                post_id: Set(post_id.to_string()),
                category_id: Set(cat.clone()),
            });
            PostCategory::insert_many(links)
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Images ====================

    /// Images attached to a post.
    pub async fn images(&self, post_id: &str) -> AppResult<Vec<post_image::Model>> {
        PostImage::find()
            .filter(post_image::Column::PostId.eq(post_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Attach an image to a post.
    pub async fn add_image(&self, model: post_image::ActiveModel) -> AppResult<post_image::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove all images from a post, returning the removed rows so the
    /// caller can delete the stored files.
    pub async fn clear_images(&self, post_id: &str) -> AppResult<Vec<post_image::Model>> {
        let images = self.images(post_id).await?;
        PostImage::delete_many()
            .filter(post_image::Column::PostId.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(images)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::test_post;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_returns_posts() {
        let p1 = test_post("p1", "u1", "first");
        let p2 = test_post("p2", "u2", "second");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[p1, p2]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let query = PostQuery {
            limit: 10,
            ..PostQuery::default()
        };
        let result = repo.list(&query).await.unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_find_followed() {
        let p1 = test_post("p1", "u2", "followed post");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[p1]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.find_followed("u1", 10, 0).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "p1");
    }
}
