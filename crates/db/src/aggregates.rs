//! Denormalized counter maintenance.
//!
//! Counters are recomputed from their source tables inside the same
//! transaction as the write that invalidated them, so they can never
//! drift under concurrent voting or commenting.

use sea_orm::{ConnectionTrait, DbBackend, Statement};

use usof_common::{AppError, AppResult};

use crate::entities::like::TargetType;

/// Recomputes `likes_count` for a post or comment from the like table.
/// Likes count +1, dislikes -1.
pub async fn recompute_target_likes_count<C: ConnectionTrait>(
    conn: &C,
    target_type: TargetType,
    target_id: &str,
) -> AppResult<()> {
    // Table name and the stored target_type discriminant coincide.
    let table = match target_type {
        TargetType::Post => "post",
        TargetType::Comment => "comment",
    };
    let sql = format!(
        "UPDATE \"{table}\" SET likes_count = ( \
            SELECT COALESCE(SUM(CASE WHEN vote = 'like' THEN 1 ELSE -1 END), 0) \
            FROM \"like\" \
            WHERE target_type = $1 AND target_id = $2 \
        ) WHERE id = $2"
    );
    conn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql,
        [table.into(), target_id.into()],
    ))
    .await
    .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

/// Recomputes `comments_count` for a post. Only active comments count.
pub async fn recompute_post_comments_count<C: ConnectionTrait>(
    conn: &C,
    post_id: &str,
) -> AppResult<()> {
    conn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "UPDATE \"post\" SET comments_count = ( \
            SELECT COUNT(*) FROM \"comment\" \
            WHERE post_id = $1 AND status = 'active' \
        ) WHERE id = $1",
        [post_id.into()],
    ))
    .await
    .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

/// Recomputes a user's rating: the sum of vote values over all likes on
/// that user's posts and comments.
pub async fn recompute_user_rating<C: ConnectionTrait>(conn: &C, user_id: &str) -> AppResult<()> {
    conn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "UPDATE \"user\" SET rating = ( \
            SELECT COALESCE(SUM(CASE WHEN l.vote = 'like' THEN 1 ELSE -1 END), 0) \
            FROM \"like\" l \
            WHERE (l.target_type = 'post' AND l.target_id IN \
                      (SELECT id FROM \"post\" WHERE author_id = $1)) \
               OR (l.target_type = 'comment' AND l.target_id IN \
                      (SELECT id FROM \"comment\" WHERE author_id = $1)) \
        ) WHERE id = $1",
        [user_id.into()],
    ))
    .await
    .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}
