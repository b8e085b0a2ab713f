//! Create report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Report::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Report::ReporterId).string_len(32).not_null())
                    .col(ColumnDef::new(Report::PostId).string_len(32))
                    .col(ColumnDef::new(Report::CommentId).string_len(32))
                    .col(ColumnDef::new(Report::Reason).text().not_null())
                    .col(ColumnDef::new(Report::Status).string_len(16).not_null().default("pending"))
                    .col(ColumnDef::new(Report::ResolvedBy).string_len(32))
                    .col(ColumnDef::new(Report::Action).string_len(16))
                    .col(ColumnDef::new(Report::ResolutionMessage).text())
                    .col(
                        ColumnDef::new(Report::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Report::ResolvedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_reporter")
                            .from(Report::Table, Report::ReporterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_post")
                            .from(Report::Table, Report::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_comment")
                            .from(Report::Table, Report::CommentId)
                            .to(Comment::Table, Comment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (reporter_id, post_id) - one report per user per post
        manager
            .create_index(
                Index::create()
                    .name("idx_report_reporter_post")
                    .table(Report::Table)
                    .col(Report::ReporterId)
                    .col(Report::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: (reporter_id, comment_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_reporter_comment")
                    .table(Report::Table)
                    .col(Report::ReporterId)
                    .col(Report::CommentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: status (moderation queue filters on it)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_status")
                    .table(Report::Table)
                    .col(Report::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
    ReporterId,
    PostId,
    CommentId,
    Reason,
    Status,
    ResolvedBy,
    Action,
    ResolutionMessage,
    CreatedAt,
    ResolvedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
}
