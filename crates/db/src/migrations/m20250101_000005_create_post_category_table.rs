//! Create post-category join table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PostCategory::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PostCategory::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(PostCategory::CategoryId).string_len(32).not_null())
                    .primary_key(
                        Index::create()
                            .col(PostCategory::PostId)
                            .col(PostCategory::CategoryId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_category_post")
                            .from(PostCategory::Table, PostCategory::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_category_category")
                            .from(PostCategory::Table, PostCategory::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: category_id (for listing posts in a category)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_category_category_id")
                    .table(PostCategory::Table)
                    .col(PostCategory::CategoryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PostCategory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PostCategory {
    Table,
    PostId,
    CategoryId,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}

#[derive(Iden)]
enum Category {
    Table,
    Id,
}
