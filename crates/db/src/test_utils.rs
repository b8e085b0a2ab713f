//! Model builders shared by repository and service tests.

use chrono::Utc;

use crate::entities::{
    category, collection, comment, follow, like, notification, post, report, session, user,
};

/// Build a user model with sensible defaults.
#[must_use]
pub fn test_user(id: &str, login: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        login: login.to_string(),
        email: format!("{login}@example.com"),
        full_name: login.to_string(),
        password_hash: "$argon2id$stub".to_string(),
        role: user::UserRole::User,
        rating: 0,
        profile_picture: None,
        email_confirmed: true,
        email_confirmation_token: None,
        password_reset_token: None,
        password_reset_expires_at: None,
        created_at: Utc::now().into(),
    }
}

/// Build an admin user model.
#[must_use]
pub fn test_admin(id: &str, login: &str) -> user::Model {
    user::Model {
        role: user::UserRole::Admin,
        ..test_user(id, login)
    }
}

/// Build a session model expiring in ten minutes.
#[must_use]
pub fn test_session(token: &str, user_id: &str) -> session::Model {
    session::Model {
        id: token.to_string(),
        user_id: user_id.to_string(),
        expires_at: (Utc::now() + chrono::Duration::minutes(10)).into(),
        created_at: Utc::now().into(),
    }
}

/// Build an active post model.
#[must_use]
pub fn test_post(id: &str, author_id: &str, title: &str) -> post::Model {
    post::Model {
        id: id.to_string(),
        author_id: author_id.to_string(),
        title: title.to_string(),
        content: "content".to_string(),
        status: post::ContentStatus::Active,
        is_locked: false,
        likes_count: 0,
        comments_count: 0,
        published_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Build a category model.
#[must_use]
pub fn test_category(id: &str, title: &str) -> category::Model {
    category::Model {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        created_at: Utc::now().into(),
    }
}

/// Build an active root comment model.
#[must_use]
pub fn test_comment(id: &str, post_id: &str, author_id: &str) -> comment::Model {
    comment::Model {
        id: id.to_string(),
        post_id: post_id.to_string(),
        author_id: author_id.to_string(),
        content: "a comment".to_string(),
        status: comment::ContentStatus::Active,
        parent_id: None,
        likes_count: 0,
        published_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Build a reply to another comment.
#[must_use]
pub fn test_reply(id: &str, post_id: &str, author_id: &str, parent_id: &str) -> comment::Model {
    comment::Model {
        parent_id: Some(parent_id.to_string()),
        ..test_comment(id, post_id, author_id)
    }
}

/// Build a like on a post.
#[must_use]
pub fn test_like(id: &str, author_id: &str, target_id: &str, vote: like::VoteType) -> like::Model {
    like::Model {
        id: id.to_string(),
        author_id: author_id.to_string(),
        target_type: like::TargetType::Post,
        target_id: target_id.to_string(),
        vote,
        created_at: Utc::now().into(),
    }
}

/// Build a follow model.
#[must_use]
pub fn test_follow(id: &str, user_id: &str, post_id: &str) -> follow::Model {
    follow::Model {
        id: id.to_string(),
        user_id: user_id.to_string(),
        post_id: post_id.to_string(),
        created_at: Utc::now().into(),
    }
}

/// Build a private collection model.
#[must_use]
pub fn test_collection(id: &str, owner_id: &str, title: &str) -> collection::Model {
    collection::Model {
        id: id.to_string(),
        owner_id: owner_id.to_string(),
        title: title.to_string(),
        description: None,
        visibility: collection::Visibility::Private,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Build an unread notification model.
#[must_use]
pub fn test_notification(id: &str, user_id: &str, target_id: &str) -> notification::Model {
    notification::Model {
        id: id.to_string(),
        user_id: user_id.to_string(),
        actor_id: None,
        target_type: notification::NotificationTarget::Post,
        target_id: target_id.to_string(),
        message: "something happened".to_string(),
        is_read: false,
        created_at: Utc::now().into(),
    }
}

/// Build a pending report against a post.
#[must_use]
pub fn test_report(id: &str, reporter_id: &str, post_id: &str) -> report::Model {
    report::Model {
        id: id.to_string(),
        reporter_id: reporter_id.to_string(),
        post_id: Some(post_id.to_string()),
        comment_id: None,
        reason: "spam".to_string(),
        status: report::ReportStatus::Pending,
        resolved_by: None,
        action: None,
        resolution_message: None,
        created_at: Utc::now().into(),
        resolved_at: None,
    }
}
