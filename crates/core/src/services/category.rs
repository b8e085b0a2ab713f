//! Category service.

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use usof_common::{AppError, AppResult, IdGenerator};
use usof_db::{entities::category, repositories::CategoryRepository};
use validator::Validate;

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 128))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Input for updating a category.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 128))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Category service for business logic. Mutations are admin-only; the
/// HTTP layer enforces the role.
#[derive(Clone)]
pub struct CategoryService {
    category_repo: CategoryRepository,
    id_gen: IdGenerator,
}

impl CategoryService {
    /// Create a new category service.
    #[must_use]
    pub fn new(category_repo: CategoryRepository) -> Self {
        Self {
            category_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a category by ID.
    pub async fn get(&self, id: &str) -> AppResult<category::Model> {
        self.category_repo.get_by_id(id).await
    }

    /// List categories alphabetically.
    pub async fn list(&self, limit: u64, offset: u64) -> AppResult<(Vec<category::Model>, u64)> {
        let categories = self.category_repo.list(limit, offset).await?;
        let total = self.category_repo.count().await?;
        Ok((categories, total))
    }

    /// Create a category. Titles are globally unique.
    pub async fn create(&self, input: CreateCategoryInput) -> AppResult<category::Model> {
        input.validate()?;

        if self
            .category_repo
            .find_by_title(&input.title)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Category title is already taken".to_string(),
            ));
        }

        self.category_repo
            .create(category::ActiveModel {
                id: Set(self.id_gen.generate()),
                title: Set(input.title),
                description: Set(input.description),
                created_at: Set(Utc::now().into()),
            })
            .await
    }

    /// Update a category.
    pub async fn update(&self, id: &str, input: UpdateCategoryInput) -> AppResult<category::Model> {
        input.validate()?;

        let existing = self.category_repo.get_by_id(id).await?;

        if let Some(title) = &input.title {
            if title != &existing.title
                && self.category_repo.find_by_title(title).await?.is_some()
            {
                return Err(AppError::Conflict(
                    "Category title is already taken".to_string(),
                ));
            }
        }

        let mut active: category::ActiveModel = existing.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }

        self.category_repo.update(active).await
    }

    /// Delete a category. Posts keep existing; only the links go.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.category_repo.get_by_id(id).await?;
        self.category_repo.delete(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use usof_db::test_utils::test_category;

    fn make_service(db: sea_orm::DatabaseConnection) -> CategoryService {
        CategoryService::new(CategoryRepository::new(Arc::new(db)))
    }

    #[tokio::test]
    async fn test_create_duplicate_title_conflicts() {
        let existing = test_category("c1", "rust");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let result = service
            .create(CreateCategoryInput {
                title: "rust".to_string(),
                description: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_category() {
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<category::Model>::new()])
                .into_connection(),
        );

        let result = service.delete("missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
