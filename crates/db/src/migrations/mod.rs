//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_user_table;
mod m20250101_000002_create_session_table;
mod m20250101_000003_create_category_table;
mod m20250101_000004_create_post_table;
mod m20250101_000005_create_post_category_table;
mod m20250101_000006_create_post_image_table;
mod m20250101_000007_create_comment_table;
mod m20250101_000008_create_like_table;
mod m20250101_000009_create_follow_table;
mod m20250101_000010_create_collection_tables;
mod m20250101_000011_create_notification_table;
mod m20250101_000012_create_report_table;

/// Migration runner.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_table::Migration),
            Box::new(m20250101_000002_create_session_table::Migration),
            Box::new(m20250101_000003_create_category_table::Migration),
            Box::new(m20250101_000004_create_post_table::Migration),
            Box::new(m20250101_000005_create_post_category_table::Migration),
            Box::new(m20250101_000006_create_post_image_table::Migration),
            Box::new(m20250101_000007_create_comment_table::Migration),
            Box::new(m20250101_000008_create_like_table::Migration),
            Box::new(m20250101_000009_create_follow_table::Migration),
            Box::new(m20250101_000010_create_collection_tables::Migration),
            Box::new(m20250101_000011_create_notification_table::Migration),
            Box::new(m20250101_000012_create_report_table::Migration),
        ]
    }
}
