//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use usof_common::AppResult;
use usof_core::{LoginInput, RegisterInput, ResetPasswordInput};
use usof_db::entities::user;

use crate::{
    extractors::AuthUser,
    middleware::{AppState, session_cookie},
    response::no_content,
};

/// Register response.
#[derive(Serialize)]
struct UserResponse {
    user: user::Model,
}

/// Register a new account. A confirmation link is mailed before login is
/// possible.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<impl IntoResponse> {
    let user = state.auth_service.register(input).await?;
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// Log in with login or email, setting the session cookie.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> AppResult<impl IntoResponse> {
    let (user, session) = state.auth_service.login(input).await?;
    let jar = jar.add(session_cookie(&state.session_config, &session));
    Ok((jar, Json(UserResponse { user })))
}

/// Log out, closing the session and clearing the cookie.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> AppResult<impl IntoResponse> {
    let jar = if let Some(cookie) = jar.get(&state.session_config.cookie_name) {
        state.auth_service.logout(cookie.value()).await?;
        jar.remove(Cookie::from(state.session_config.cookie_name.clone()))
    } else {
        jar
    };
    Ok((jar, no_content()))
}

/// The authenticated user's own profile.
async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse { user })
}

/// Email confirmation request.
#[derive(Debug, Deserialize)]
struct ConfirmEmailRequest {
    token: String,
}

/// Confirm an email address.
async fn confirm_email(
    State(state): State<AppState>,
    Json(req): Json<ConfirmEmailRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state.auth_service.confirm_email(&req.token).await?;
    Ok(Json(UserResponse { user }))
}

/// Confirm an email address from the mailed link. Browsers open the link
/// with a plain GET, so the token rides in the path.
async fn confirm_email_link(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = state.auth_service.confirm_email(&token).await?;
    Ok(Json(UserResponse { user }))
}

/// Request carrying only an email address.
#[derive(Debug, Deserialize)]
struct EmailRequest {
    email: String,
}

/// Re-send the confirmation link.
async fn resend_confirmation(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> AppResult<impl IntoResponse> {
    state.auth_service.resend_confirmation(&req.email).await?;
    Ok(no_content())
}

/// Request a password reset link.
async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> AppResult<impl IntoResponse> {
    state.auth_service.request_password_reset(&req.email).await?;
    Ok(no_content())
}

/// Password reset confirmation request.
#[derive(Debug, Deserialize)]
struct ResetConfirmRequest {
    token: String,
    password: String,
    password_confirmation: String,
}

/// Complete a password reset.
async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(req): Json<ResetConfirmRequest>,
) -> AppResult<impl IntoResponse> {
    state
        .auth_service
        .reset_password(
            &req.token,
            ResetPasswordInput {
                password: req.password,
                password_confirmation: req.password_confirmation,
            },
        )
        .await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/confirm-email", post(confirm_email))
        .route("/confirm-email/{token}", get(confirm_email_link))
        .route("/resend-confirmation", post(resend_confirmation))
        .route("/password-reset", post(request_password_reset))
        .route("/password-reset/confirm", post(confirm_password_reset))
}
