//! Business logic services.

#![allow(missing_docs)]

pub mod auth;
pub mod category;
pub mod collection;
pub mod comment;
pub mod email;
pub mod follow;
pub mod like;
pub mod notification;
pub mod post;
pub mod report;
pub mod user;

pub use auth::{AuthService, LoginInput, RegisterInput, ResetPasswordInput, SessionToken};
pub use category::{CategoryService, CreateCategoryInput, UpdateCategoryInput};
pub use collection::{
    CollectionService, CreateCollectionInput, UpdateCollectionInput,
};
pub use comment::{CommentNode, CommentService, CreateCommentInput, build_tree};
pub use email::EmailService;
pub use follow::FollowService;
pub use like::LikeService;
pub use notification::NotificationService;
pub use post::{CreatePostInput, PostService, UpdatePostInput};
pub use report::{CreateReportInput, ReportService, ResolveReportInput};
pub use user::{CreateUserInput, UpdateUserInput, UserService};
