//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(User::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(User::Login).string_len(128).not_null())
                    .col(ColumnDef::new(User::Email).string_len(256).not_null())
                    .col(ColumnDef::new(User::FullName).string_len(256).not_null())
                    .col(ColumnDef::new(User::PasswordHash).string_len(256).not_null())
                    .col(ColumnDef::new(User::Role).string_len(16).not_null().default("user"))
                    .col(ColumnDef::new(User::Rating).integer().not_null().default(0))
                    .col(ColumnDef::new(User::ProfilePicture).string_len(1024))
                    .col(ColumnDef::new(User::EmailConfirmed).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::EmailConfirmationToken).string_len(64))
                    .col(ColumnDef::new(User::PasswordResetToken).string_len(64))
                    .col(ColumnDef::new(User::PasswordResetExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: login
        manager
            .create_index(
                Index::create()
                    .name("idx_user_login")
                    .table(User::Table)
                    .col(User::Login)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: email
        manager
            .create_index(
                Index::create()
                    .name("idx_user_email")
                    .table(User::Table)
                    .col(User::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: rating (for leaderboard-style sorting)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_rating")
                    .table(User::Table)
                    .col(User::Rating)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Login,
    Email,
    FullName,
    PasswordHash,
    Role,
    Rating,
    ProfilePicture,
    EmailConfirmed,
    EmailConfirmationToken,
    PasswordResetToken,
    PasswordResetExpiresAt,
    CreatedAt,
}
