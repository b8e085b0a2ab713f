//! Create post table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Post::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Post::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Post::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Post::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Post::Content).text().not_null())
                    .col(ColumnDef::new(Post::Status).string_len(16).not_null().default("active"))
                    .col(ColumnDef::new(Post::IsLocked).boolean().not_null().default(false))
                    .col(ColumnDef::new(Post::LikesCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Post::CommentsCount).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Post::PublishedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Post::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_author")
                            .from(Post::Table, Post::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: author_id (for listing a user's posts)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_author_id")
                    .table(Post::Table)
                    .col(Post::AuthorId)
                    .to_owned(),
            )
            .await?;

        // Index: status (feed queries filter on it)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_status")
                    .table(Post::Table)
                    .col(Post::Status)
                    .to_owned(),
            )
            .await?;

        // Index: published_at (date sorting and range filters)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_published_at")
                    .table(Post::Table)
                    .col(Post::PublishedAt)
                    .to_owned(),
            )
            .await?;

        // Index: likes_count (default feed sort)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_likes_count")
                    .table(Post::Table)
                    .col(Post::LikesCount)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Post::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
    AuthorId,
    Title,
    Content,
    Status,
    IsLocked,
    LikesCount,
    CommentsCount,
    PublishedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
