//! Collection service.
//!
//! Collections are per-user groupings of posts, public or private.
//! Titles are unique within one owner's collections, not globally.

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use usof_common::{AppError, AppResult, IdGenerator};
use usof_db::{
    entities::{
        collection::{self, Visibility},
        collection_post, post,
        user::{self, UserRole},
    },
    repositories::{CollectionRepository, PostRepository},
};
use validator::Validate;

/// Input for creating a collection.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCollectionInput {
    #[validate(length(min = 1, max = 128))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub visibility: Visibility,
}

/// Input for updating a collection.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCollectionInput {
    #[validate(length(min = 1, max = 128))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
}

/// Collection service for business logic.
#[derive(Clone)]
pub struct CollectionService {
    collection_repo: CollectionRepository,
    post_repo: PostRepository,
    id_gen: IdGenerator,
}

impl CollectionService {
    /// Create a new collection service.
    #[must_use]
    pub fn new(collection_repo: CollectionRepository, post_repo: PostRepository) -> Self {
        Self {
            collection_repo,
            post_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a collection, enforcing visibility. Private collections are
    /// visible to their owner and admins only.
    pub async fn get(
        &self,
        id: &str,
        viewer: Option<&user::Model>,
    ) -> AppResult<collection::Model> {
        let collection = self.collection_repo.get_by_id(id).await?;
        ensure_visible(&collection, viewer)?;
        Ok(collection)
    }

    /// The viewer's own collections.
    pub async fn list_own(&self, viewer: &user::Model) -> AppResult<Vec<collection::Model>> {
        self.collection_repo.find_by_owner(&viewer.id).await
    }

    /// Collections of another user. Strangers see public ones only.
    pub async fn list_of_user(
        &self,
        owner_id: &str,
        viewer: Option<&user::Model>,
    ) -> AppResult<Vec<collection::Model>> {
        let privileged =
            viewer.is_some_and(|u| u.role == UserRole::Admin || u.id == owner_id);
        if privileged {
            self.collection_repo.find_by_owner(owner_id).await
        } else {
            self.collection_repo.find_public_by_owner(owner_id).await
        }
    }

    /// Create a collection.
    pub async fn create(
        &self,
        actor: &user::Model,
        input: CreateCollectionInput,
    ) -> AppResult<collection::Model> {
        input.validate()?;

        if self
            .collection_repo
            .find_by_owner_and_title(&actor.id, &input.title)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "A collection with this title already exists".to_string(),
            ));
        }

        self.collection_repo
            .create(collection::ActiveModel {
                id: Set(self.id_gen.generate()),
                owner_id: Set(actor.id.clone()),
                title: Set(input.title),
                description: Set(input.description),
                visibility: Set(input.visibility),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            })
            .await
    }

    /// Update a collection. Owner only.
    pub async fn update(
        &self,
        actor: &user::Model,
        id: &str,
        input: UpdateCollectionInput,
    ) -> AppResult<collection::Model> {
        input.validate()?;

        let existing = self.collection_repo.get_by_id(id).await?;
        if existing.owner_id != actor.id {
            return Err(AppError::Forbidden(
                "Only the owner can edit a collection".to_string(),
            ));
        }

        if let Some(title) = &input.title {
            if title != &existing.title
                && self
                    .collection_repo
                    .find_by_owner_and_title(&actor.id, title)
                    .await?
                    .is_some()
            {
                return Err(AppError::Conflict(
                    "A collection with this title already exists".to_string(),
                ));
            }
        }

        let mut active: collection::ActiveModel = existing.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(visibility) = input.visibility {
            active.visibility = Set(visibility);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.collection_repo.update(active).await
    }

    /// Delete a collection. Owner or admin.
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let existing = self.collection_repo.get_by_id(id).await?;
        if existing.owner_id != actor.id && actor.role != UserRole::Admin {
            return Err(AppError::Forbidden(
                "Only the owner or an admin can delete a collection".to_string(),
            ));
        }

        self.collection_repo.delete(id).await
    }

    /// Add a post to a collection. Owner only.
    pub async fn add_post(
        &self,
        actor: &user::Model,
        collection_id: &str,
        post_id: &str,
    ) -> AppResult<()> {
        let collection = self.collection_repo.get_by_id(collection_id).await?;
        if collection.owner_id != actor.id {
            return Err(AppError::Forbidden(
                "Only the owner can modify a collection".to_string(),
            ));
        }

        let post = self.post_repo.get_by_id(post_id).await?;
        if post.status != post::ContentStatus::Active
            && actor.role != UserRole::Admin
            && actor.id != post.author_id
        {
            return Err(AppError::PostNotFound(post_id.to_string()));
        }

        if self.collection_repo.contains(collection_id, post_id).await? {
            return Err(AppError::Conflict(
                "Post is already in this collection".to_string(),
            ));
        }

        self.collection_repo
            .add_post(collection_post::ActiveModel {
                collection_id: Set(collection_id.to_string()),
                post_id: Set(post_id.to_string()),
                added_at: Set(Utc::now().into()),
            })
            .await?;
        Ok(())
    }

    /// Remove a post from a collection. Owner only.
    pub async fn remove_post(
        &self,
        actor: &user::Model,
        collection_id: &str,
        post_id: &str,
    ) -> AppResult<()> {
        let collection = self.collection_repo.get_by_id(collection_id).await?;
        if collection.owner_id != actor.id {
            return Err(AppError::Forbidden(
                "Only the owner can modify a collection".to_string(),
            ));
        }

        if self.collection_repo.remove_post(collection_id, post_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(
                "Post is not in this collection".to_string(),
            ))
        }
    }

    /// Posts in a collection, with the same visibility rule as `get`.
    pub async fn posts(
        &self,
        id: &str,
        viewer: Option<&user::Model>,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<post::Model>, u64)> {
        let collection = self.collection_repo.get_by_id(id).await?;
        ensure_visible(&collection, viewer)?;

        let posts = self.collection_repo.posts(id, limit, offset).await?;
        let total = self.collection_repo.count_posts(id).await?;
        Ok((posts, total))
    }
}

fn ensure_visible(
    collection: &collection::Model,
    viewer: Option<&user::Model>,
) -> AppResult<()> {
    if collection.visibility == Visibility::Public {
        return Ok(());
    }
    let allowed = viewer
        .is_some_and(|u| u.role == UserRole::Admin || u.id == collection.owner_id);
    if allowed {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("collection {}", collection.id)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use usof_db::test_utils::{test_collection, test_user};

    fn make_service(
        collection_db: sea_orm::DatabaseConnection,
        post_db: sea_orm::DatabaseConnection,
    ) -> CollectionService {
        CollectionService::new(
            CollectionRepository::new(Arc::new(collection_db)),
            PostRepository::new(Arc::new(post_db)),
        )
    }

    #[tokio::test]
    async fn test_private_collection_hidden_from_stranger() {
        let collection = test_collection("col1", "u2", "secret");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[collection]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let viewer = test_user("u1", "alice");

        let result = service.get("col1", Some(&viewer)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_private_collection_visible_to_owner() {
        let collection = test_collection("col1", "u1", "mine");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[collection]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let viewer = test_user("u1", "alice");

        let result = service.get("col1", Some(&viewer)).await.unwrap();
        assert_eq!(result.id, "col1");
    }

    #[tokio::test]
    async fn test_create_duplicate_title_conflicts() {
        let existing = test_collection("col1", "u1", "favorites");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .create(
                &actor,
                CreateCollectionInput {
                    title: "favorites".to_string(),
                    description: None,
                    visibility: Visibility::Private,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_by_non_owner_forbidden() {
        let existing = test_collection("col1", "u2", "theirs");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .update(&actor, "col1", UpdateCollectionInput::default())
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
