//! Abuse report entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report lifecycle states. Resolution is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ReportStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "resolved")]
    Resolved,
}

/// Admin action taken when resolving a report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ReportAction {
    #[sea_orm(string_value = "ignored")]
    Ignored,
    /// Flips the reported content to inactive
    #[sea_orm(string_value = "deleted")]
    Deleted,
    #[sea_orm(string_value = "warned")]
    Warned,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub reporter_id: String,

    /// Exactly one of post_id / comment_id is set
    #[sea_orm(nullable, indexed)]
    pub post_id: Option<String>,

    #[sea_orm(nullable, indexed)]
    pub comment_id: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    pub status: ReportStatus,

    /// Admin who resolved the report
    #[sea_orm(nullable)]
    pub resolved_by: Option<String>,

    #[sea_orm(nullable)]
    pub action: Option<ReportAction>,

    #[sea_orm(column_type = "Text", nullable)]
    pub resolution_message: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub resolved_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReporterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Reporter,

    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,

    #[sea_orm(
        belongs_to = "super::comment::Entity",
        from = "Column::CommentId",
        to = "super::comment::Column::Id",
        on_delete = "Cascade"
    )]
    Comment,
}

impl ActiveModelBehavior for ActiveModel {}
