//! Create collection tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Collection::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Collection::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Collection::OwnerId).string_len(32).not_null())
                    .col(ColumnDef::new(Collection::Title).string_len(128).not_null())
                    .col(ColumnDef::new(Collection::Description).text())
                    .col(
                        ColumnDef::new(Collection::Visibility)
                            .string_len(16)
                            .not_null()
                            .default("private"),
                    )
                    .col(
                        ColumnDef::new(Collection::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Collection::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_collection_owner")
                            .from(Collection::Table, Collection::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (owner_id, title) - titles unique per owner
        manager
            .create_index(
                Index::create()
                    .name("idx_collection_owner_title")
                    .table(Collection::Table)
                    .col(Collection::OwnerId)
                    .col(Collection::Title)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CollectionPost::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CollectionPost::CollectionId).string_len(32).not_null())
                    .col(ColumnDef::new(CollectionPost::PostId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(CollectionPost::AddedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(CollectionPost::CollectionId)
                            .col(CollectionPost::PostId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_collection_post_collection")
                            .from(CollectionPost::Table, CollectionPost::CollectionId)
                            .to(Collection::Table, Collection::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_collection_post_post")
                            .from(CollectionPost::Table, CollectionPost::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: post_id (for removing a deleted post from collections)
        manager
            .create_index(
                Index::create()
                    .name("idx_collection_post_post_id")
                    .table(CollectionPost::Table)
                    .col(CollectionPost::PostId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CollectionPost::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Collection::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Collection {
    Table,
    Id,
    OwnerId,
    Title,
    Description,
    Visibility,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum CollectionPost {
    Table,
    CollectionId,
    PostId,
    AddedAt,
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
