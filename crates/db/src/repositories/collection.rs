//! Collection repository.

use std::sync::Arc;

use crate::entities::{Collection, CollectionPost, Post, collection, collection_post, post};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Query,
};
use usof_common::{AppError, AppResult};

/// Collection repository for database operations.
#[derive(Clone)]
pub struct CollectionRepository {
    db: Arc<DatabaseConnection>,
}

impl CollectionRepository {
    /// Create a new collection repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a collection by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<collection::Model>> {
        Collection::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a collection by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<collection::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("collection {id}")))
    }

    /// Find a collection by owner and title.
    pub async fn find_by_owner_and_title(
        &self,
        owner_id: &str,
        title: &str,
    ) -> AppResult<Option<collection::Model>> {
        Collection::find()
            .filter(collection::Column::OwnerId.eq(owner_id))
            .filter(collection::Column::Title.eq(title))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Collections owned by a user, newest first.
    pub async fn find_by_owner(&self, owner_id: &str) -> AppResult<Vec<collection::Model>> {
        Collection::find()
            .filter(collection::Column::OwnerId.eq(owner_id))
            .order_by_desc(collection::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Public collections owned by a user, newest first.
    pub async fn find_public_by_owner(&self, owner_id: &str) -> AppResult<Vec<collection::Model>> {
        Collection::find()
            .filter(collection::Column::OwnerId.eq(owner_id))
            .filter(collection::Column::Visibility.eq(collection::Visibility::Public))
            .order_by_desc(collection::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new collection.
    pub async fn create(&self, model: collection::ActiveModel) -> AppResult<collection::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a collection.
    pub async fn update(&self, model: collection::ActiveModel) -> AppResult<collection::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a collection. Memberships cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Collection::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Check whether a post is in a collection.
    pub async fn contains(&self, collection_id: &str, post_id: &str) -> AppResult<bool> {
        let found = CollectionPost::find_by_id((collection_id.to_string(), post_id.to_string()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(found.is_some())
    }

    /// Add a post to a collection.
    pub async fn add_post(
        &self,
        model: collection_post::ActiveModel,
    ) -> AppResult<collection_post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove a post from a collection. Returns whether it was a member.
    pub async fn remove_post(&self, collection_id: &str, post_id: &str) -> AppResult<bool> {
        let result = CollectionPost::delete_many()
            .filter(collection_post::Column::CollectionId.eq(collection_id))
            .filter(collection_post::Column::PostId.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Posts in a collection, newest first (paginated).
    pub async fn posts(
        &self,
        collection_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(
                post::Column::Id.in_subquery(
                    Query::select()
                        .column(collection_post::Column::PostId)
                        .from(collection_post::Entity)
                        .and_where(collection_post::Column::CollectionId.eq(collection_id))
                        .to_owned(),
                ),
            )
            .order_by_desc(post::Column::PublishedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count posts in a collection.
    pub async fn count_posts(&self, collection_id: &str) -> AppResult<u64> {
        CollectionPost::find()
            .filter(collection_post::Column::CollectionId.eq(collection_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::test_collection;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_by_owner_and_title_found() {
        let col = test_collection("col1", "u1", "favorites");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[col.clone()]])
                .into_connection(),
        );

        let repo = CollectionRepository::new(db);
        let result = repo.find_by_owner_and_title("u1", "favorites").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().id, "col1");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<collection::Model>::new()])
                .into_connection(),
        );

        let repo = CollectionRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
