//! HTTP API layer for usof.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: auth, users, posts, comments, categories,
//!   collections, notifications, reports
//! - **Extractors**: session authentication, admin gate
//! - **Middleware**: session cookie handling with sliding expiry
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
