//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User roles.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum UserRole {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "admin")]
    Admin,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub login: String,

    #[sea_orm(unique)]
    pub email: String,

    pub full_name: String,

    /// Argon2 password hash. Never serialized into responses.
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: UserRole,

    /// Sum of likes minus dislikes over all of this user's posts and
    /// comments (denormalized, recomputed on every vote)
    #[sea_orm(default_value = 0)]
    pub rating: i32,

    /// Relative storage key of the avatar image
    #[sea_orm(nullable)]
    pub profile_picture: Option<String>,

    #[sea_orm(default_value = false)]
    pub email_confirmed: bool,

    #[serde(skip_serializing)]
    #[sea_orm(nullable)]
    pub email_confirmation_token: Option<String>,

    #[serde(skip_serializing)]
    #[sea_orm(nullable)]
    pub password_reset_token: Option<String>,

    #[serde(skip_serializing)]
    #[sea_orm(nullable)]
    pub password_reset_expires_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
