//! Row counts for the `db stats` command.

use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::FromRow)]
pub struct TableCounts {
    pub categories: i64,
    pub channels: i64,
    pub videos: i64,
    pub collaborations: i64,
    pub mentions: i64,
    pub unprocessed_videos: i64,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn table_counts(pool: &PgPool) -> Result<TableCounts, DbError> {
    let counts = sqlx::query_as::<_, TableCounts>(
        "SELECT \
             (SELECT COUNT(*) FROM categories)     AS categories, \
             (SELECT COUNT(*) FROM channels)       AS channels, \
             (SELECT COUNT(*) FROM videos)         AS videos, \
             (SELECT COUNT(*) FROM collaborations) AS collaborations, \
             (SELECT COUNT(*) FROM mentions)       AS mentions, \
             (SELECT COUNT(*) FROM videos WHERE mentions_processed_at IS NULL) \
                                                   AS unprocessed_videos",
    )
    .fetch_one(pool)
    .await?;
    Ok(counts)
}
