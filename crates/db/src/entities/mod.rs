//! Database entities.

pub mod category;
pub mod collection;
pub mod collection_post;
pub mod comment;
pub mod follow;
pub mod like;
pub mod notification;
pub mod post;
pub mod post_category;
pub mod post_image;
pub mod report;
pub mod session;
pub mod user;

pub use category::Entity as Category;
pub use collection::Entity as Collection;
pub use collection_post::Entity as CollectionPost;
pub use comment::Entity as Comment;
pub use follow::Entity as Follow;
pub use like::Entity as Like;
pub use notification::Entity as Notification;
pub use post::Entity as Post;
pub use post_category::Entity as PostCategory;
pub use post_image::Entity as PostImage;
pub use report::Entity as Report;
pub use session::Entity as Session;
pub use user::Entity as User;
