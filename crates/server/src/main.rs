//! Usof server entry point.

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, http::HeaderValue, middleware};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use usof_api::{middleware::AppState, router as api_router};
use usof_common::{Config, LocalStorage};
use usof_core::{
    AuthService, CategoryService, CollectionService, CommentService, EmailService, FollowService,
    LikeService, NotificationService, PostService, ReportService, UserService,
};
use usof_db::repositories::{
    CategoryRepository, CollectionRepository, CommentRepository, FollowRepository, LikeRepository,
    NotificationRepository, PostRepository, ReportRepository, SessionRepository, UserRepository,
};

/// Upper bound for request bodies; covers ten 5 MB image uploads plus
/// form overhead.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    match config
        .server
        .cors_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "usof=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting usof server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database and run migrations
    let db = usof_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    usof_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let session_repo = SessionRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let category_repo = CategoryRepository::new(Arc::clone(&db));
    let collection_repo = CollectionRepository::new(Arc::clone(&db));
    let like_repo = LikeRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));

    // Initialize services
    let storage = Arc::new(LocalStorage::new(
        config.uploads.dir.clone().into(),
        config.uploads.base_url.clone(),
    ));
    let email = EmailService::new(config.smtp.clone(), config.server.url.clone())?;

    let notification_service =
        NotificationService::new(notification_repo, follow_repo.clone());
    let auth_service = AuthService::new(
        user_repo.clone(),
        session_repo,
        email,
        config.session.clone(),
    );
    let user_service = UserService::new(user_repo);
    let post_service = PostService::new(
        post_repo.clone(),
        category_repo.clone(),
        storage.clone(),
    );
    let comment_service = CommentService::new(
        comment_repo.clone(),
        post_repo.clone(),
        notification_service.clone(),
    );
    let category_service = CategoryService::new(category_repo);
    let collection_service = CollectionService::new(collection_repo, post_repo.clone());
    let like_service = LikeService::new(
        like_repo,
        post_repo.clone(),
        comment_repo.clone(),
        notification_service.clone(),
    );
    let follow_service = FollowService::new(follow_repo, post_repo.clone());
    let report_service = ReportService::new(
        report_repo,
        post_repo,
        comment_repo,
        notification_service.clone(),
    );

    let state = AppState {
        auth_service,
        user_service,
        post_service,
        comment_service,
        category_service,
        collection_service,
        like_service,
        follow_service,
        notification_service,
        report_service,
        storage,
        session_config: config.session.clone(),
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .nest_service(
            &config.uploads.base_url,
            ServeDir::new(&config.uploads.dir),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            usof_api::middleware::session_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        .with_state(state);

    // Start server with graceful shutdown
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
