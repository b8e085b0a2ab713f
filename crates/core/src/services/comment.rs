//! Comment service.
//!
//! Comments form a tree. Rows are stored flat with an optional parent and
//! assembled per request; a reply whose parent row is gone is promoted to
//! a root so no thread silently disappears.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use usof_common::{AppError, AppResult, IdGenerator};
use usof_db::{
    entities::{
        comment::{self, ContentStatus},
        post,
        user::{self, UserRole},
    },
    repositories::{CommentRepository, PostRepository},
};
use validator::Validate;

use crate::services::notification::NotificationService;

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 10_000))]
    pub content: String,
    /// Reply target. `None` makes a root comment.
    pub parent_id: Option<String>,
}

/// A comment with its nested replies.
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: comment::Model,
    pub replies: Vec<CommentNode>,
}

/// Assemble a comment tree from flat rows in creation order.
///
/// Two passes: the first indexes replies under parents that are present in
/// the input, the second nests them. Replies to absent parents become
/// roots, so the result is independent of input order and never drops a
/// row.
#[must_use]
pub fn build_tree(rows: Vec<comment::Model>) -> Vec<CommentNode> {
    let present: HashSet<String> = rows.iter().map(|c| c.id.clone()).collect();

    let mut children: HashMap<String, Vec<comment::Model>> = HashMap::new();
    let mut roots: Vec<comment::Model> = Vec::new();

    for row in rows {
        match &row.parent_id {
            Some(parent) if present.contains(parent) => {
                children.entry(parent.clone()).or_default().push(row);
            }
            _ => roots.push(row),
        }
    }

    fn nest(
        row: comment::Model,
        children: &mut HashMap<String, Vec<comment::Model>>,
    ) -> CommentNode {
        let replies = children
            .remove(&row.id)
            .unwrap_or_default()
            .into_iter()
            .map(|child| nest(child, children))
            .collect();
        CommentNode {
            comment: row,
            replies,
        }
    }

    roots.into_iter().map(|row| nest(row, &mut children)).collect()
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a comment. Inactive comments stay visible to admins and to
    /// their own authors.
    pub async fn get(&self, id: &str, viewer: Option<&user::Model>) -> AppResult<comment::Model> {
        let comment = self.comment_repo.get_by_id(id).await?;
        let visible = comment.status == ContentStatus::Active
            || viewer.is_some_and(|u| u.role == UserRole::Admin || u.id == comment.author_id);
        if visible {
            Ok(comment)
        } else {
            Err(AppError::CommentNotFound(id.to_string()))
        }
    }

    /// The comment tree of a post.
    ///
    /// Inactive comments stay visible to admins and to their own authors.
    pub async fn tree(
        &self,
        post_id: &str,
        viewer: Option<&user::Model>,
    ) -> AppResult<Vec<CommentNode>> {
        let post = self.post_repo.get_by_id(post_id).await?;
        ensure_post_visible(&post, viewer)?;

        let is_admin = viewer.is_some_and(|u| u.role == UserRole::Admin);
        let viewer_id = viewer.map(|u| u.id.as_str());

        let rows = self
            .comment_repo
            .find_by_post(post_id)
            .await?
            .into_iter()
            .filter(|c| {
                c.status == ContentStatus::Active
                    || is_admin
                    || viewer_id == Some(c.author_id.as_str())
            })
            .collect();

        Ok(build_tree(rows))
    }

    /// Comment on a post.
    pub async fn create(
        &self,
        actor: &user::Model,
        post_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;

        let post = self.post_repo.get_by_id(post_id).await?;
        ensure_post_visible(&post, Some(actor))?;

        if post.is_locked {
            return Err(AppError::Forbidden("Post is locked".to_string()));
        }

        if let Some(parent_id) = &input.parent_id {
            let parent = self.comment_repo.get_by_id(parent_id).await?;
            if parent.post_id != post_id {
                return Err(AppError::BadRequest(
                    "Parent comment belongs to another post".to_string(),
                ));
            }
        }

        let created = self
            .comment_repo
            .create(comment::ActiveModel {
                id: Set(self.id_gen.generate()),
                post_id: Set(post_id.to_string()),
                author_id: Set(actor.id.clone()),
                content: Set(input.content),
                status: Set(ContentStatus::Active),
                parent_id: Set(input.parent_id),
                likes_count: Set(0),
                published_at: Set(Utc::now().into()),
                updated_at: Set(None),
            })
            .await?;

        if let Err(e) = self
            .notifications
            .fan_out_comment(&post, actor, &created)
            .await
        {
            tracing::warn!(error = %e, "Failed to fan out comment notifications");
        }

        Ok(created)
    }

    /// Edit a comment's content. Author only.
    pub async fn update_content(
        &self,
        actor: &user::Model,
        id: &str,
        content: String,
    ) -> AppResult<comment::Model> {
        if content.is_empty() || content.len() > 10_000 {
            return Err(AppError::Validation(
                "Comment content must be between 1 and 10000 characters".to_string(),
            ));
        }

        let existing = self.comment_repo.get_by_id(id).await?;
        if existing.author_id != actor.id {
            return Err(AppError::Forbidden(
                "Only the author can edit a comment".to_string(),
            ));
        }

        let mut active: comment::ActiveModel = existing.into();
        active.content = Set(content);
        active.updated_at = Set(Some(Utc::now().into()));
        self.comment_repo.update(active).await
    }

    /// Change a comment's status. Author or admin.
    pub async fn set_status(
        &self,
        actor: &user::Model,
        id: &str,
        status: ContentStatus,
    ) -> AppResult<comment::Model> {
        let existing = self.comment_repo.get_by_id(id).await?;
        if existing.author_id != actor.id && actor.role != UserRole::Admin {
            return Err(AppError::Forbidden(
                "Only the author or an admin can change comment status".to_string(),
            ));
        }

        self.comment_repo.set_status(id, status).await
    }

    /// Delete a comment. Author or admin. Replies stay and surface as
    /// roots in the tree.
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let existing = self.comment_repo.get_by_id(id).await?;
        if existing.author_id != actor.id && actor.role != UserRole::Admin {
            return Err(AppError::Forbidden(
                "Only the author or an admin can delete a comment".to_string(),
            ));
        }

        self.comment_repo.delete(existing).await
    }
}

/// Inactive posts are visible to admins and their authors only.
fn ensure_post_visible(post: &post::Model, viewer: Option<&user::Model>) -> AppResult<()> {
    if post.status == post::ContentStatus::Active {
        return Ok(());
    }
    let allowed = viewer
        .is_some_and(|u| u.role == UserRole::Admin || u.id == post.author_id);
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
    use std::sync::Arc;
    use usof_db::{
        repositories::{FollowRepository, NotificationRepository},
        test_utils::{test_comment, test_post, test_reply, test_user},
    };

    fn make_notifications() -> NotificationService {
        let notif_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let follow_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        NotificationService::new(
            NotificationRepository::new(notif_db),
            FollowRepository::new(follow_db),
        )
    }

    fn make_service(
        comment_db: sea_orm::DatabaseConnection,
        post_db: sea_orm::DatabaseConnection,
    ) -> CommentService {
        CommentService::new(
            CommentRepository::new(Arc::new(comment_db)),
            PostRepository::new(Arc::new(post_db)),
            make_notifications(),
        )
    }

    #[test]
    fn test_build_tree_nests_replies() {
        let root = test_comment("c1", "p1", "u1");
        let reply = test_reply("c2", "p1", "u2", "c1");
        let nested = test_reply("c3", "p1", "u1", "c2");

        let tree = build_tree(vec![root, reply, nested]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, "c1");
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].comment.id, "c2");
        assert_eq!(tree[0].replies[0].replies[0].comment.id, "c3");
    }

    #[test]
    fn test_build_tree_promotes_orphans_to_roots() {
        let root = test_comment("c1", "p1", "u1");
        let orphan = test_reply("c2", "p1", "u2", "gone");

        let tree = build_tree(vec![root, orphan]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[1].comment.id, "c2");
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn test_build_tree_is_order_independent() {
        let root = test_comment("c1", "p1", "u1");
        let reply = test_reply("c2", "p1", "u2", "c1");

        // Reply arrives before its parent
        let tree = build_tree(vec![reply, root]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, "c1");
        assert_eq!(tree[0].replies.len(), 1);
    }

    #[test]
    fn test_build_tree_empty() {
        assert!(build_tree(vec![]).is_empty());
    }

    #[tokio::test]
    async fn test_create_on_missing_post() {
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .create(
                &actor,
                "missing",
                CreateCommentInput {
                    content: "hi".to_string(),
                    parent_id: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_on_locked_post_forbidden() {
        let mut post = test_post("p1", "u2", "locked post");
        post.is_locked = true;

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .create(
                &actor,
                "p1",
                CreateCommentInput {
                    content: "hi".to_string(),
                    parent_id: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_with_parent_from_other_post() {
        let post = test_post("p1", "u2", "a post");
        let foreign_parent = test_comment("c9", "p2", "u3");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[foreign_parent]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .create(
                &actor,
                "p1",
                CreateCommentInput {
                    content: "hi".to_string(),
                    parent_id: Some("c9".to_string()),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_content_by_non_author_forbidden() {
        let existing = test_comment("c1", "p1", "u2");

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let actor = test_user("u1", "alice");

        let result = service
            .update_content(&actor, "c1", "edited".to_string())
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
