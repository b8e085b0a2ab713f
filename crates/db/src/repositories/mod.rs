//! Repository layer.
//!
//! Each repository wraps the shared connection and exposes the queries a
//! service needs, returning [`AppResult`](usof_common::AppResult).

mod category;
mod collection;
mod comment;
mod follow;
mod like;
mod notification;
mod post;
mod report;
mod session;
mod user;

pub use category::CategoryRepository;
pub use collection::CollectionRepository;
pub use comment::CommentRepository;
pub use follow::FollowRepository;
pub use like::{LikeRepository, ToggleOutcome};
pub use notification::NotificationRepository;
pub use post::{PostQuery, PostRepository, PostSort};
pub use report::{ReportRepository, ReportStats};
pub use session::SessionRepository;
pub use user::UserRepository;
