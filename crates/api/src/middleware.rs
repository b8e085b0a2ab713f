//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::SET_COOKIE},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use usof_common::{StorageBackend, config::SessionConfig};
use usof_core::{
    AuthService, CategoryService, CollectionService, CommentService, FollowService, LikeService,
    NotificationService, PostService, ReportService, SessionToken, UserService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub category_service: CategoryService,
    pub collection_service: CollectionService,
    pub like_service: LikeService,
    pub follow_service: FollowService,
    pub notification_service: NotificationService,
    pub report_service: ReportService,
    pub storage: Arc<dyn StorageBackend>,
    pub session_config: SessionConfig,
}

/// Build the session cookie for a freshly issued or renewed session.
///
/// The cookie itself carries no expiry; the server-side record is the
/// source of truth and slides on every authenticated request.
#[must_use]
pub fn session_cookie(config: &SessionConfig, session: &SessionToken) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Session authentication middleware.
///
/// Reads the session cookie, loads the user into request extensions, and
/// slides the session expiry. Requests without a valid session pass
/// through unauthenticated; the extractors decide whether that is an
/// error.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let mut renewed = None;

    if let Some(cookie) = jar.get(&state.session_config.cookie_name) {
        match state.auth_service.authenticate_session(cookie.value()).await {
            Ok(Some((user, session))) => {
                req.extensions_mut().insert(user);
                renewed = Some(session);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Session lookup failed"),
        }
    }

    let mut response = next.run(req).await;

    if let Some(session) = renewed {
        let cookie = session_cookie(&state.session_config, &session);
        if let Ok(value) = cookie.to_string().parse() {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}
