//! Database operations for the `collaborations` edge table.
//!
//! An edge is stored once per unordered channel pair as
//! `(channel_low, channel_high)`. Every observation adds one to the count
//! and its duration to the running total; the first timestamp is write-once
//! and the last timestamp only moves forward.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use streamnet_core::canonical_pair;

use crate::DbError;

/// A row from the `collaborations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollaborationRow {
    pub channel_low: String,
    pub channel_high: String,
    pub collaboration_count: i64,
    pub total_duration_seconds: i64,
    pub first_collaboration_at: Option<DateTime<Utc>>,
    pub last_collaboration_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

/// Merges one co-appearance into the edge for an already-canonical pair.
pub(crate) async fn upsert_edge<'e, E>(
    executor: E,
    low: &str,
    high: &str,
    observed_at: DateTime<Utc>,
    duration_seconds: i64,
) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO collaborations \
             (channel_low, channel_high, collaboration_count, total_duration_seconds, \
              first_collaboration_at, last_collaboration_at, last_updated) \
         VALUES ($1, $2, 1, $3, $4, $4, NOW()) \
         ON CONFLICT (channel_low, channel_high) DO UPDATE SET \
             collaboration_count    = collaborations.collaboration_count + 1, \
             total_duration_seconds = collaborations.total_duration_seconds \
                                      + EXCLUDED.total_duration_seconds, \
             first_collaboration_at = COALESCE(collaborations.first_collaboration_at, \
                                               EXCLUDED.first_collaboration_at), \
             last_collaboration_at  = GREATEST(collaborations.last_collaboration_at, \
                                               EXCLUDED.last_collaboration_at), \
             last_updated           = NOW()",
    )
    .bind(low)
    .bind(high)
    .bind(duration_seconds.max(0))
    .bind(observed_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Records that channels `a` and `b` appeared together at `observed_at` for
/// `duration_seconds`. Argument order does not matter.
///
/// Returns `false` without touching the store when `a == b`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails (e.g. an unknown channel).
pub async fn observe_collaboration(
    pool: &PgPool,
    a: &str,
    b: &str,
    observed_at: DateTime<Utc>,
    duration_seconds: i64,
) -> Result<bool, DbError> {
    let Some((low, high)) = canonical_pair(a, b) else {
        return Ok(false);
    };
    upsert_edge(pool, low, high, observed_at, duration_seconds).await?;
    Ok(true)
}

/// Looks up the edge between two channels in either argument order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn get_collaboration(
    pool: &PgPool,
    a: &str,
    b: &str,
) -> Result<Option<CollaborationRow>, DbError> {
    let Some((low, high)) = canonical_pair(a, b) else {
        return Ok(None);
    };
    let row = sqlx::query_as::<_, CollaborationRow>(
        "SELECT channel_low, channel_high, collaboration_count, total_duration_seconds, \
                first_collaboration_at, last_collaboration_at, last_updated \
         FROM collaborations WHERE channel_low = $1 AND channel_high = $2",
    )
    .bind(low)
    .bind(high)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
