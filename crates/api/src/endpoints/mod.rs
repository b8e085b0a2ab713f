//! API endpoints.

mod auth;
mod categories;
mod collections;
mod comments;
mod notifications;
mod posts;
mod reports;
mod users;

use axum::{Router, extract::multipart::Field};
use serde::Deserialize;
use usof_common::{AppError, AppResult, StorageBackend, StoredFile, generate_storage_key};

use crate::middleware::AppState;

/// Largest accepted upload per image file.
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Read one multipart field as an image and write it to storage.
async fn store_image_field(
    storage: &dyn StorageBackend,
    user_id: &str,
    field: Field<'_>,
) -> AppResult<StoredFile> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();

    if !content_type.starts_with("image/") {
        return Err(AppError::BadRequest(
            "Only image uploads are accepted".to_string(),
        ));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?;
    if data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest("Image exceeds the 5 MB limit".to_string()));
    }

    let key = generate_storage_key(user_id, &file_name);
    storage.upload(&key, &data, &content_type).await
}

/// Default page size for list endpoints.
const fn default_limit() -> u64 {
    20
}

/// Largest accepted page size.
const MAX_LIMIT: u64 = 100;

/// Shared limit/offset query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
struct Pagination {
    #[serde(default = "default_limit")]
    limit: u64,
    #[serde(default)]
    offset: u64,
}

impl Pagination {
    fn limit(self) -> u64 {
        self.limit.min(MAX_LIMIT)
    }
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/posts", posts::router())
        .nest("/comments", comments::router())
        .nest("/categories", categories::router())
        .nest("/collections", collections::router())
        .nest("/notifications", notifications::router())
        .nest("/reports", reports::router())
}
