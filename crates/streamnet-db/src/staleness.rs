//! Selection of entities that are due for a refresh.
//!
//! Never-refreshed rows always come first (`NULLS FIRST`), then the oldest
//! refresh timestamp. Ties break on id so batches are deterministic.

use chrono::Utc;
use sqlx::PgPool;
use streamnet_core::is_due;

use crate::categories::CategoryRow;
use crate::channels::{ChannelRow, CHANNEL_COLUMNS};
use crate::DbError;

/// Categories to rescan for live streams, least recently scanned first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn categories_due_for_scan(pool: &PgPool, limit: i64) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, first_seen, last_scanned FROM categories \
         ORDER BY last_scanned ASC NULLS FIRST, id ASC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Channels whose archive should be polled next, least recently polled first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn channels_due_for_video_refresh(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ChannelRow>, DbError> {
    let rows = sqlx::query_as::<_, ChannelRow>(&format!(
        "SELECT {CHANNEL_COLUMNS} FROM channels \
         ORDER BY last_fetched_videos ASC NULLS FIRST, id ASC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Whether a channel's profile is missing or older than `max_age_days`.
///
/// An unknown channel is always due.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn channel_due_for_detail_refresh(
    pool: &PgPool,
    channel_id: &str,
    max_age_days: i64,
) -> Result<bool, DbError> {
    let last = sqlx::query_scalar::<_, Option<chrono::DateTime<Utc>>>(
        "SELECT last_fetched_details FROM channels WHERE id = $1",
    )
    .bind(channel_id)
    .fetch_optional(pool)
    .await?
    .flatten();
    Ok(is_due(last, max_age_days, Utc::now()))
}
