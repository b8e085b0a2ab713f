//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use usof_common::{AppError, AppResult, IdGenerator};
use usof_db::{
    entities::user::{self, UserRole},
    repositories::UserRepository,
};
use validator::Validate;

/// Input for creating a user directly (admin only).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 3, max = 32))]
    pub login: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub full_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: UserRole,
}

/// Input for updating a user profile.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(length(min = 3, max = 32))]
    pub login: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub full_name: Option<String>,
    /// Role changes require the admin role on the actor.
    pub role: Option<UserRole>,
}

/// User service for profile management.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// List users ordered by rating.
    pub async fn list(&self, limit: u64, offset: u64) -> AppResult<(Vec<user::Model>, u64)> {
        let users = self.user_repo.list(limit, offset).await?;
        let total = self.user_repo.count().await?;
        Ok((users, total))
    }

    /// Create a user with a chosen role. Admin operation; the account is
    /// created pre-confirmed.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if self.user_repo.find_by_login(&input.login).await?.is_some() {
            return Err(AppError::Conflict("Login is already taken".to_string()));
        }
        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            login: Set(input.login),
            email: Set(input.email),
            full_name: Set(input.full_name),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(input.role),
            rating: Set(0),
            profile_picture: Set(None),
            email_confirmed: Set(true),
            email_confirmation_token: Set(None),
            password_reset_token: Set(None),
            password_reset_expires_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        self.user_repo.create(model).await
    }

    /// Update a profile. Users edit themselves; admins edit anyone and may
    /// change roles.
    pub async fn update(
        &self,
        actor: &user::Model,
        target_id: &str,
        input: UpdateUserInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let is_admin = actor.role == UserRole::Admin;
        if actor.id != target_id && !is_admin {
            return Err(AppError::Forbidden(
                "Cannot edit another user's profile".to_string(),
            ));
        }
        if input.role.is_some() && !is_admin {
            return Err(AppError::Forbidden("Cannot change own role".to_string()));
        }

        let target = self.user_repo.get_by_id(target_id).await?;

        if let Some(login) = &input.login {
            if login != &target.login
                && self.user_repo.find_by_login(login).await?.is_some()
            {
                return Err(AppError::Conflict("Login is already taken".to_string()));
            }
        }
        if let Some(email) = &input.email {
            if email != &target.email
                && self.user_repo.find_by_email(email).await?.is_some()
            {
                return Err(AppError::Conflict("Email is already registered".to_string()));
            }
        }

        let mut active: user::ActiveModel = target.into();
        if let Some(login) = input.login {
            active.login = Set(login);
        }
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        if let Some(full_name) = input.full_name {
            active.full_name = Set(full_name);
        }
        if let Some(role) = input.role {
            active.role = Set(role);
        }

        self.user_repo.update(active).await
    }

    /// Set a user's avatar to an uploaded file path.
    pub async fn set_avatar(&self, user_id: &str, path: String) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.profile_picture = Set(Some(path));
        self.user_repo.update(active).await
    }

    /// Delete an account. Users delete themselves; admins delete anyone.
    pub async fn delete(&self, actor: &user::Model, target_id: &str) -> AppResult<()> {
        if actor.id != target_id && actor.role != UserRole::Admin {
            return Err(AppError::Forbidden(
                "Cannot delete another user's account".to_string(),
            ));
        }

        self.user_repo.get_by_id(target_id).await?;
        self.user_repo.delete(target_id).await?;
        tracing::info!(user_id = %target_id, actor_id = %actor.id, "Deleted user account");
        Ok(())
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use usof_db::test_utils::{test_admin, test_user};

    fn make_service(db: sea_orm::DatabaseConnection) -> UserService {
        UserService::new(UserRepository::new(Arc::new(db)))
    }

    #[tokio::test]
    async fn test_update_other_user_forbidden() {
        let service = make_service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let actor = test_user("u1", "alice");

        let result = service
            .update(&actor, "u2", UpdateUserInput::default())
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_own_role_forbidden() {
        let service = make_service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let actor = test_user("u1", "alice");

        let result = service
            .update(
                &actor,
                "u1",
                UpdateUserInput {
                    role: Some(UserRole::Admin),
                    ..UpdateUserInput::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_admin_can_target_other_user() {
        let target = test_user("u2", "bob");
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[target.clone()]])
                .append_query_results([[target]])
                .into_connection(),
        );
        let actor = test_admin("a1", "root");

        let result = service
            .update(&actor, "u2", UpdateUserInput::default())
            .await
            .unwrap();

        assert_eq!(result.id, "u2");
    }

    #[tokio::test]
    async fn test_delete_other_user_forbidden() {
        let service = make_service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let actor = test_user("u1", "alice");

        let result = service.delete(&actor, "u2").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
