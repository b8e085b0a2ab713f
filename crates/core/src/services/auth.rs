//! Authentication service.
//!
//! Registration, login, email confirmation, and password reset. Sessions
//! are opaque tokens stored server-side; the HTTP layer carries them in a
//! cookie and renews them on use.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::Set;
use serde::Deserialize;
use usof_common::{AppError, AppResult, IdGenerator, config::SessionConfig};
use usof_db::{
    entities::{session, user},
    repositories::{SessionRepository, UserRepository},
};
use validator::Validate;

use crate::services::email::EmailService;

/// How long a password reset token stays valid.
const RESET_TOKEN_MINUTES: i64 = 10;

/// Registration input.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 32))]
    pub login: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub full_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub password_confirmation: String,
}

/// Login input. `login` accepts either the login or the email.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub login: String,
    pub password: String,
}

/// Password reset input.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordInput {
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub password_confirmation: String,
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<FixedOffset>,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    session_repo: SessionRepository,
    email: EmailService,
    session_config: SessionConfig,
    id_gen: IdGenerator,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        session_repo: SessionRepository,
        email: EmailService,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            email,
            session_config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user and mail them a confirmation link.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if input.password != input.password_confirmation {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }

        if self.user_repo.find_by_login(&input.login).await?.is_some() {
            return Err(AppError::Conflict("Login is already taken".to_string()));
        }
        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let confirmation_token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            login: Set(input.login),
            email: Set(input.email.clone()),
            full_name: Set(input.full_name),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(user::UserRole::User),
            rating: Set(0),
            profile_picture: Set(None),
            email_confirmed: Set(false),
            email_confirmation_token: Set(Some(confirmation_token.clone())),
            password_reset_token: Set(None),
            password_reset_expires_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        let created = self.user_repo.create(model).await?;

        // Registration succeeds even when the relay is down; the user can
        // request a new link.
        if let Err(e) = self
            .email
            .send_confirmation(&input.email, &confirmation_token)
            .await
        {
            tracing::warn!(error = %e, "Failed to send confirmation mail");
        }

        tracing::info!(user_id = %created.id, "Registered new user");
        Ok(created)
    }

    /// Log in with login or email, opening a new session.
    pub async fn login(&self, input: LoginInput) -> AppResult<(user::Model, SessionToken)> {
        let user = self
            .user_repo
            .find_by_login_or_email(&input.login)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        if !user.email_confirmed {
            return Err(AppError::Forbidden(
                "Email address is not confirmed".to_string(),
            ));
        }

        let session = self.open_session(&user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, session))
    }

    /// Open a session for a user.
    pub async fn open_session(&self, user_id: &str) -> AppResult<SessionToken> {
        let token = self.id_gen.generate_token();
        let expires_at: DateTime<FixedOffset> =
            (Utc::now() + Duration::minutes(self.session_config.lifetime_minutes)).into();

        self.session_repo
            .create(session::ActiveModel {
                id: Set(token.clone()),
                user_id: Set(user_id.to_string()),
                expires_at: Set(expires_at),
                created_at: Set(Utc::now().into()),
            })
            .await?;

        Ok(SessionToken { token, expires_at })
    }

    /// Close a session.
    pub async fn logout(&self, token: &str) -> AppResult<()> {
        self.session_repo.delete(token).await
    }

    /// Authenticate a session token, sliding its expiry forward.
    ///
    /// Expired sessions are dropped and treated as absent.
    pub async fn authenticate_session(
        &self,
        token: &str,
    ) -> AppResult<Option<(user::Model, SessionToken)>> {
        let Some(session) = self.session_repo.find_by_token(token).await? else {
            return Ok(None);
        };

        if session.expires_at < Utc::now() {
            self.session_repo.delete(token).await?;
            return Ok(None);
        }

        let Some(user) = self.user_repo.find_by_id(&session.user_id).await? else {
            self.session_repo.delete(token).await?;
            return Ok(None);
        };

        let expires_at: DateTime<FixedOffset> =
            (Utc::now() + Duration::minutes(self.session_config.lifetime_minutes)).into();
        self.session_repo.renew(token, expires_at).await?;

        Ok(Some((
            user,
            SessionToken {
                token: token.to_string(),
                expires_at,
            },
        )))
    }

    /// Confirm an email address via its token.
    pub async fn confirm_email(&self, token: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_confirmation_token(token)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid confirmation token".to_string()))?;

        let mut active: user::ActiveModel = user.into();
        active.email_confirmed = Set(true);
        active.email_confirmation_token = Set(None);
        self.user_repo.update(active).await
    }

    /// Re-send the confirmation link for an unconfirmed account.
    ///
    /// Responds identically whether or not the address is registered.
    pub async fn resend_confirmation(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            return Ok(());
        };
        if user.email_confirmed {
            return Ok(());
        }

        let token = self.id_gen.generate_token();
        let mut active: user::ActiveModel = user.into();
        active.email_confirmation_token = Set(Some(token.clone()));
        self.user_repo.update(active).await?;

        self.email.send_confirmation(email, &token).await
    }

    /// Start a password reset, mailing a short-lived token.
    ///
    /// Responds identically whether or not the address is registered.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            return Ok(());
        };

        let token = self.id_gen.generate_token();
        let expires_at: DateTime<FixedOffset> =
            (Utc::now() + Duration::minutes(RESET_TOKEN_MINUTES)).into();

        let mut active: user::ActiveModel = user.into();
        active.password_reset_token = Set(Some(token.clone()));
        active.password_reset_expires_at = Set(Some(expires_at));
        self.user_repo.update(active).await?;

        self.email.send_password_reset(email, &token).await
    }

    /// Complete a password reset. Invalidates every open session of the
    /// account.
    pub async fn reset_password(&self, token: &str, input: ResetPasswordInput) -> AppResult<()> {
        input.validate()?;

        if input.password != input.password_confirmation {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }

        let user = self
            .user_repo
            .find_by_reset_token(token)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid reset token".to_string()))?;

        let expired = user
            .password_reset_expires_at
            .is_none_or(|at| at < Utc::now());
        if expired {
            return Err(AppError::BadRequest("Reset token has expired".to_string()));
        }

        let user_id = user.id.clone();
        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(&input.password)?);
        active.password_reset_token = Set(None);
        active.password_reset_expires_at = Set(None);
        self.user_repo.update(active).await?;

        self.session_repo.delete_by_user(&user_id).await?;
        tracing::info!(user_id = %user_id, "Password reset completed");
        Ok(())
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use usof_common::config::SmtpConfig;
    use usof_db::test_utils::test_user;

    fn make_service(user_db: sea_orm::DatabaseConnection) -> AuthService {
        let session_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        AuthService::new(
            UserRepository::new(Arc::new(user_db)),
            SessionRepository::new(session_db),
            EmailService::new(SmtpConfig::default(), "http://localhost:3000".to_string())
                .unwrap(),
            SessionConfig::default(),
        )
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_rejects_password_mismatch() {
        let service =
            make_service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = service
            .register(RegisterInput {
                login: "alice".to_string(),
                email: "alice@example.com".to_string(),
                full_name: "Alice".to_string(),
                password: "password123".to_string(),
                password_confirmation: "password456".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_taken_login() {
        let existing = test_user("u1", "alice");
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let result = service
            .register(RegisterInput {
                login: "alice".to_string(),
                email: "new@example.com".to_string(),
                full_name: "Alice".to_string(),
                password: "password123".to_string(),
                password_confirmation: "password123".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_login_unknown_user_is_unauthorized() {
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<usof_db::entities::user::Model>::new()])
                .into_connection(),
        );

        let result = service
            .login(LoginInput {
                login: "ghost".to_string(),
                password: "whatever1".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthorized() {
        let mut existing = test_user("u1", "alice");
        existing.password_hash = hash_password("right password").unwrap();

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let result = service
            .login(LoginInput {
                login: "alice".to_string(),
                password: "wrong password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_unconfirmed_email_is_forbidden() {
        let mut existing = test_user("u1", "alice");
        existing.password_hash = hash_password("right password").unwrap();
        existing.email_confirmed = false;

        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let result = service
            .login(LoginInput {
                login: "alice".to_string(),
                password: "right password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let mut session = usof_db::test_utils::test_session("tok", "u1");
        session.expires_at = (Utc::now() - Duration::minutes(5)).into();

        let session_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session]])
            .append_exec_results([sea_orm::MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let service = AuthService::new(
            UserRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            SessionRepository::new(Arc::new(session_db)),
            EmailService::new(SmtpConfig::default(), "http://localhost:3000".to_string())
                .unwrap(),
            SessionConfig::default(),
        );

        let result = service.authenticate_session("tok").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_confirm_email_invalid_token() {
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<usof_db::entities::user::Model>::new()])
                .into_connection(),
        );

        let result = service.confirm_email("bogus").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_resend_confirmation_unknown_email_is_silent() {
        let service = make_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<usof_db::entities::user::Model>::new()])
                .into_connection(),
        );

        service
            .resend_confirmation("nobody@example.com")
            .await
            .unwrap();
    }
}
