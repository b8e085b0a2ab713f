//! Post service.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use usof_common::{AppError, AppResult, IdGenerator, StorageBackend};
use usof_db::{
    entities::{
        post::{self, ContentStatus},
        post_image,
        user::{self, UserRole},
    },
    repositories::{CategoryRepository, PostQuery, PostRepository},
};
use validator::Validate;

/// Input for creating a post.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostInput {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(min = 1, max = 100_000))]
    pub content: String,
    /// Category IDs to attach.
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Input for updating a post.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePostInput {
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100_000))]
    pub content: Option<String>,
    pub categories: Option<Vec<String>>,
    pub status: Option<ContentStatus>,
    /// Admin only.
    pub is_locked: Option<bool>,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    category_repo: CategoryRepository,
    storage: Arc<dyn StorageBackend>,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        category_repo: CategoryRepository,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            post_repo,
            category_repo,
            storage,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a post, enforcing status visibility.
    pub async fn get(&self, id: &str, viewer: Option<&user::Model>) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_id(id).await?;
        ensure_visible(&post, viewer)?;
        Ok(post)
    }

    /// List posts. Admins see every status and may filter on it; everyone
    /// else sees active posts plus their own inactive ones.
    pub async fn list(
        &self,
        mut query: PostQuery,
        viewer: Option<&user::Model>,
    ) -> AppResult<(Vec<post::Model>, u64)> {
        query.see_all_statuses = viewer.is_some_and(|u| u.role == UserRole::Admin);
        query.viewer_id = viewer.map(|u| u.id.clone());

        let posts = self.post_repo.list(&query).await?;
        let total = self.post_repo.count(&query).await?;
        Ok((posts, total))
    }

    /// Posts the viewer follows.
    pub async fn list_followed(
        &self,
        viewer: &user::Model,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post::Model>> {
        self.post_repo.find_followed(&viewer.id, limit, offset).await
    }

    /// Create a post with its category links.
    pub async fn create(
        &self,
        actor: &user::Model,
        input: CreatePostInput,
    ) -> AppResult<post::Model> {
        input.validate()?;
        self.ensure_categories_exist(&input.categories).await?;

        let created = self
            .post_repo
            .create(post::ActiveModel {
                id: Set(self.id_gen.generate()),
                author_id: Set(actor.id.clone()),
                title: Set(input.title),
                content: Set(input.content),
                status: Set(ContentStatus::Active),
                is_locked: Set(false),
                likes_count: Set(0),
                comments_count: Set(0),
                published_at: Set(Utc::now().into()),
                updated_at: Set(None),
            })
            .await?;

        if !input.categories.is_empty() {
            self.post_repo
                .set_categories(&created.id, &input.categories)
                .await?;
        }

        tracing::info!(post_id = %created.id, author_id = %actor.id, "Created post");
        Ok(created)
    }

    /// Update a post.
    ///
    /// Authors edit their own title, content, categories, and status.
    /// Admins change categories, status, and the lock flag, but not the
    /// text of someone else's post.
    pub async fn update(
        &self,
        actor: &user::Model,
        id: &str,
        input: UpdatePostInput,
    ) -> AppResult<post::Model> {
        input.validate()?;

        let existing = self.post_repo.get_by_id(id).await?;
        let is_author = existing.author_id == actor.id;
        let is_admin = actor.role == UserRole::Admin;

        if !is_author && !is_admin {
            return Err(AppError::Forbidden(
                "Only the author or an admin can edit a post".to_string(),
            ));
        }
        if (input.title.is_some() || input.content.is_some()) && !is_author {
            return Err(AppError::Forbidden(
                "Only the author can edit post content".to_string(),
            ));
        }
        if input.is_locked.is_some() && !is_admin {
            return Err(AppError::Forbidden("Only an admin can lock a post".to_string()));
        }

        if let Some(categories) = &input.categories {
            self.ensure_categories_exist(categories).await?;
            self.post_repo.set_categories(id, categories).await?;
        }

        let mut active: post::ActiveModel = existing.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        if let Some(is_locked) = input.is_locked {
            active.is_locked = Set(is_locked);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.post_repo.update(active).await
    }

    /// Delete a post and its uploaded images. Author or admin.
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let existing = self.post_repo.get_by_id(id).await?;
        if existing.author_id != actor.id && actor.role != UserRole::Admin {
            return Err(AppError::Forbidden(
                "Only the author or an admin can delete a post".to_string(),
            ));
        }

        let images = self.post_repo.clear_images(id).await?;
        self.post_repo.delete(id, &existing.author_id).await?;

        // Files go after the rows so a storage hiccup cannot resurrect the
        // post; leftovers only waste disk.
        for image in images {
            if let Err(e) = self.storage.delete(&image.path).await {
                tracing::warn!(error = %e, path = %image.path, "Failed to delete post image file");
            }
        }

        tracing::info!(post_id = %id, actor_id = %actor.id, "Deleted post");
        Ok(())
    }

    /// Category IDs attached to a post.
    pub async fn category_ids(&self, post_id: &str) -> AppResult<Vec<String>> {
        self.post_repo.category_ids(post_id).await
    }

    /// Images attached to a post.
    pub async fn images(&self, post_id: &str) -> AppResult<Vec<post_image::Model>> {
        self.post_repo.images(post_id).await
    }

    /// Attach already-stored image files to a post. Author only.
    pub async fn attach_images(
        &self,
        actor: &user::Model,
        post_id: &str,
        paths: Vec<String>,
    ) -> AppResult<Vec<post_image::Model>> {
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.author_id != actor.id {
            return Err(AppError::Forbidden(
                "Only the author can attach images".to_string(),
            ));
        }

        let mut attached = Vec::with_capacity(paths.len());
        for path in paths {
            attached.push(
                self.post_repo
                    .add_image(post_image::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        post_id: Set(post_id.to_string()),
                        path: Set(path),
                    })
                    .await?,
            );
        }
        Ok(attached)
    }

    async fn ensure_categories_exist(&self, ids: &[String]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = self.category_repo.find_by_ids(ids).await?;
        if found.len() != ids.len() {
            return Err(AppError::BadRequest("Unknown category".to_string()));
        }
        Ok(())
    }
}

/// Inactive posts are visible to admins and their authors only.
fn ensure_visible(post: &post::Model, viewer: Option<&user::Model>) -> AppResult<()> {
    if post.status == ContentStatus::Active {
        return Ok(());
    }
    let allowed = viewer.is_some_and(|u| u.role == UserRole::Admin || u.id == post.author_id);
    if allowed {
        Ok(())
    } else {
        Err(AppError::PostNotFound(post.id.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use usof_common::LocalStorage;
    use usof_db::test_utils::{test_admin, test_post, test_user};

    fn make_service(
        post_db: sea_orm::DatabaseConnection,
        category_db: sea_orm::DatabaseConnection,
    ) -> PostService {
        PostService::new(
            PostRepository::new(Arc::new(post_db)),
            CategoryRepository::new(Arc::new(category_db)),
            Arc::new(LocalStorage::new(
                "/tmp/usof-test-uploads".into(),
                "/uploads".to_string(),
            )),
        )
    }

    #[tokio::test]
    async fn test_get_inactive_post_hidden_from_stranger() {
        let mut post = test_post("p1", "u2", "hidden");
        post.status = ContentStatus::Inactive;

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let viewer = test_user("u1", "alice");

        let result = service.get("p1", Some(&viewer)).await;
        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_get_inactive_post_visible_to_author() {
        let mut post = test_post("p1", "u1", "mine");
        post.status = ContentStatus::Inactive;

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let viewer = test_user("u1", "alice");

        let result = service.get("p1", Some(&viewer)).await.unwrap();
        assert_eq!(result.id, "p1");
    }

    #[tokio::test]
    async fn test_get_inactive_post_visible_to_admin() {
        let mut post = test_post("p1", "u2", "moderated");
        post.status = ContentStatus::Inactive;

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let viewer = test_admin("a1", "root");

        let result = service.get("p1", Some(&viewer)).await.unwrap();
        assert_eq!(result.id, "p1");
    }

    #[tokio::test]
    async fn test_create_with_unknown_category() {
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<usof_db::entities::category::Model>::new()])
                .into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .create(
                &actor,
                CreatePostInput {
                    title: "title".to_string(),
                    content: "body".to_string(),
                    categories: vec!["ghost".to_string()],
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_content_by_admin_forbidden() {
        let post = test_post("p1", "u1", "original");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_admin("a1", "root");

        let result = service
            .update(
                &actor,
                "p1",
                UpdatePostInput {
                    content: Some("rewritten".to_string()),
                    ..UpdatePostInput::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_lock_by_author_forbidden() {
        let post = test_post("p1", "u1", "mine");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .update(
                &actor,
                "p1",
                UpdatePostInput {
                    is_locked: Some(true),
                    ..UpdatePostInput::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
