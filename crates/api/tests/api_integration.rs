//! API integration tests.
//!
//! Route the full router with mock database connections and verify
//! status codes and error bodies end to end.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use tower::ServiceExt;
use usof_api::{middleware, router as api_router};
use usof_common::{LocalStorage, config::SessionConfig, config::SmtpConfig};
use usof_core::{
    AuthService, CategoryService, CollectionService, CommentService, EmailService, FollowService,
    LikeService, NotificationService, PostService, ReportService, UserService,
};
use usof_db::repositories::{
    CategoryRepository, CollectionRepository, CommentRepository, FollowRepository, LikeRepository,
    NotificationRepository, PostRepository, ReportRepository, SessionRepository, UserRepository,
};
use usof_db::test_utils::{test_admin, test_post, test_session, test_user};

fn empty_db() -> Arc<DatabaseConnection> {
    Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}

/// Build app state around explicit user, session, and post connections;
/// every other repository gets an empty mock.
fn test_state(
    user_db: Arc<DatabaseConnection>,
    session_db: Arc<DatabaseConnection>,
    post_db: Arc<DatabaseConnection>,
) -> middleware::AppState {
    test_state_with(user_db, session_db, post_db, empty_db(), "/tmp/usof-test-uploads")
}

/// Like [`test_state`], with an explicit report connection and storage
/// directory for tests that exercise those.
fn test_state_with(
    user_db: Arc<DatabaseConnection>,
    session_db: Arc<DatabaseConnection>,
    post_db: Arc<DatabaseConnection>,
    report_db: Arc<DatabaseConnection>,
    storage_dir: &str,
) -> middleware::AppState {
    let storage = Arc::new(LocalStorage::new(
        storage_dir.into(),
        "/uploads".to_string(),
    ));
    let email = EmailService::new(SmtpConfig::default(), "http://localhost:3000".to_string())
        .expect("email service");

    let user_repo = UserRepository::new(user_db);
    let session_repo = SessionRepository::new(session_db);
    let post_repo = PostRepository::new(post_db);
    let comment_repo = CommentRepository::new(empty_db());
    let category_repo = CategoryRepository::new(empty_db());
    let collection_repo = CollectionRepository::new(empty_db());
    let like_repo = LikeRepository::new(empty_db());
    let follow_repo = FollowRepository::new(empty_db());
    let notification_repo = NotificationRepository::new(empty_db());

    let notification_service =
        NotificationService::new(notification_repo, follow_repo.clone());

    middleware::AppState {
        auth_service: AuthService::new(
            user_repo.clone(),
            session_repo,
            email,
            SessionConfig::default(),
        ),
        user_service: UserService::new(user_repo),
        post_service: PostService::new(
            post_repo.clone(),
            category_repo.clone(),
            storage.clone(),
        ),
        comment_service: CommentService::new(
            comment_repo.clone(),
            post_repo.clone(),
            notification_service.clone(),
        ),
        category_service: CategoryService::new(category_repo),
        collection_service: CollectionService::new(collection_repo, post_repo.clone()),
        like_service: LikeService::new(
            like_repo,
            post_repo.clone(),
            comment_repo,
            notification_service.clone(),
        ),
        follow_service: FollowService::new(follow_repo, post_repo),
        notification_service,
        report_service: ReportService::new(
            ReportRepository::new(report_db),
            PostRepository::new(empty_db()),
            CommentRepository::new(empty_db()),
            NotificationService::new(
                NotificationRepository::new(empty_db()),
                FollowRepository::new(empty_db()),
            ),
        ),
        storage,
        session_config: SessionConfig::default(),
    }
}

fn test_router(state: middleware::AppState) -> Router {
    api_router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ))
        .with_state(state)
}

fn default_router() -> Router {
    test_router(test_state(empty_db(), empty_db(), empty_db()))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let response = default_router()
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_me_without_session_is_unauthorized() {
    let response = default_router()
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_me_with_valid_session() {
    let session_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_session("tok", "u1")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection(),
    );
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u1", "alice")]])
            .into_connection(),
    );

    let response = test_router(test_state(user_db, session_db, empty_db()))
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::COOKIE, "usof_session=tok")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // Sliding expiry re-sets the cookie
    assert!(response.headers().contains_key(header::SET_COOKIE));

    let body = body_json(response).await;
    assert_eq!(body["user"]["login"], "alice");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_password_mismatch_is_validation_error() {
    let response = default_router()
        .oneshot(
            Request::builder()
                .uri("/auth/register")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"login":"alice","email":"alice@example.com","full_name":"Alice","password":"password123","password_confirmation":"password456"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_create_post_without_session_is_unauthorized() {
    let response = default_router()
        .oneshot(
            Request::builder()
                .uri("/posts")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"title":"t","content":"c"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_post_returns_404_with_code() {
    let post_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<usof_db::entities::post::Model>::new()])
            .into_connection(),
    );

    let response = test_router(test_state(empty_db(), empty_db(), post_db))
        .oneshot(
            Request::builder()
                .uri("/posts/gone")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "POST_NOT_FOUND");
}

#[tokio::test]
async fn test_category_mutation_requires_admin() {
    let session_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_session("tok", "u1")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection(),
    );
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u1", "alice")]])
            .into_connection(),
    );

    let response = test_router(test_state(user_db, session_db, empty_db()))
        .oneshot(
            Request::builder()
                .uri("/categories")
                .method("POST")
                .header(header::COOKIE, "usof_session=tok")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"title":"rust"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_confirm_email_link_opens_with_get() {
    let mut unconfirmed = test_user("u1", "alice");
    unconfirmed.email_confirmed = false;
    unconfirmed.email_confirmation_token = Some("ctok".to_string());
    let confirmed = test_user("u1", "alice");

    // Token lookup, then the confirming update returning the row.
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![unconfirmed], vec![confirmed]])
            .into_connection(),
    );

    let response = test_router(test_state(user_db, empty_db(), empty_db()))
        .oneshot(
            Request::builder()
                .uri("/auth/confirm-email/ctok")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["login"], "alice");
}

#[tokio::test]
async fn test_image_upload_to_foreign_post_stores_nothing() {
    let dir = "/tmp/usof-test-upload-guard";
    let _ = tokio::fs::remove_dir_all(dir).await;

    let session_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_session("tok", "u1")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection(),
    );
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u1", "alice")]])
            .into_connection(),
    );
    let post_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_post("p1", "u2", "theirs")]])
            .into_connection(),
    );

    let boundary = "usofboundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"postImages\"; filename=\"a.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         png-bytes\r\n\
         --{boundary}--\r\n"
    );

    let response = test_router(test_state_with(
        user_db,
        session_db,
        post_db,
        empty_db(),
        dir,
    ))
    .oneshot(
        Request::builder()
            .uri("/posts/p1/images")
            .method("POST")
            .header(header::COOKIE, "usof_session=tok")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    // The rejection happened before any file reached storage
    assert!(!std::path::Path::new(dir).exists());
}

#[tokio::test]
async fn test_report_stats_for_admin() {
    let session_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_session("tok", "a1")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection(),
    );
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_admin("a1", "root")]])
            .into_connection(),
    );
    let report_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                [BTreeMap::from([(
                    "num_items",
                    sea_orm::Value::BigInt(Some(5)),
                )])],
                [BTreeMap::from([(
                    "num_items",
                    sea_orm::Value::BigInt(Some(2)),
                )])],
            ])
            .into_connection(),
    );

    let response = test_router(test_state_with(
        user_db,
        session_db,
        empty_db(),
        report_db,
        "/tmp/usof-test-uploads",
    ))
    .oneshot(
        Request::builder()
            .uri("/reports/stats")
            .header(header::COOKIE, "usof_session=tok")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stats"]["total"], 5);
    assert_eq!(body["stats"]["pending"], 2);
    assert_eq!(body["stats"]["resolved"], 3);
}

#[tokio::test]
async fn test_notifications_require_session() {
    let response = default_router()
        .oneshot(
            Request::builder()
                .uri("/notifications")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
