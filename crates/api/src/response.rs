//! API response helpers.

use axum::{http::StatusCode, response::IntoResponse};

/// Empty success response.
#[must_use]
pub fn no_content() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
