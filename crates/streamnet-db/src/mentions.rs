//! Database operations for the `mentions` table and the per-video mention
//! transaction.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use streamnet_core::{canonical_pair, MentionRecord};

use crate::collaborations::upsert_edge;
use crate::DbError;

/// A row from the `mentions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MentionRow {
    pub source_channel_id: String,
    pub target_channel_id: String,
    pub video_id: String,
    pub mentioned_at: DateTime<Utc>,
}

/// The resolved mentions of one video, ready to be committed.
#[derive(Debug, Clone)]
pub struct VideoMentions {
    pub video_id: String,
    /// Owner of the video; the source of every mention.
    pub source_channel_id: String,
    /// Publish time of the video, used as the mention and edge timestamp.
    pub mentioned_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub target_channel_ids: Vec<String>,
}

async fn insert_mentions<'e, E>(executor: E, mentions: &[MentionRecord]) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    if mentions.is_empty() {
        return Ok(0);
    }

    let sources: Vec<&str> = mentions.iter().map(|m| m.source_channel_id.as_str()).collect();
    let targets: Vec<&str> = mentions.iter().map(|m| m.target_channel_id.as_str()).collect();
    let videos: Vec<&str> = mentions.iter().map(|m| m.video_id.as_str()).collect();
    let timestamps: Vec<DateTime<Utc>> = mentions.iter().map(|m| m.mentioned_at).collect();

    let result = sqlx::query(
        "INSERT INTO mentions (source_channel_id, target_channel_id, video_id, mentioned_at) \
         SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::timestamptz[]) \
         ON CONFLICT (source_channel_id, target_channel_id, video_id) DO NOTHING",
    )
    .bind(&sources)
    .bind(&targets)
    .bind(&videos)
    .bind(&timestamps)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Bulk insert-if-absent on `(source, target, video)`.
///
/// Returns the number of new mentions.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (e.g. an unknown channel or video).
pub async fn observe_mentions(pool: &PgPool, mentions: &[MentionRecord]) -> Result<u64, DbError> {
    Ok(insert_mentions(pool, mentions).await?)
}

/// Commits one video's mention scan atomically.
///
/// In a single transaction: claims the video's processed marker (only if it
/// is still unset), inserts a mention per distinct target, and merges a
/// collaboration edge between the owner and each target. Self-mentions are
/// dropped.
///
/// Returns `true` if this call did the work. `false` means the video was
/// already processed (or is being processed by a concurrent worker that won
/// the claim) and nothing was written.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the video does not exist, or
/// [`DbError::Sqlx`] on failure; the transaction is rolled back.
pub async fn record_video_mentions(
    pool: &PgPool,
    scan: &VideoMentions,
) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    let claimed = sqlx::query(
        "UPDATE videos SET mentions_processed_at = NOW() \
         WHERE id = $1 AND mentions_processed_at IS NULL",
    )
    .bind(&scan.video_id)
    .execute(&mut *tx)
    .await?;

    if claimed.rows_affected() == 0 {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM videos WHERE id = $1)")
            .bind(&scan.video_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.rollback().await?;
        return if exists { Ok(false) } else { Err(DbError::NotFound) };
    }

    let targets: BTreeSet<&str> = scan
        .target_channel_ids
        .iter()
        .map(String::as_str)
        .filter(|t| *t != scan.source_channel_id)
        .collect();

    let records: Vec<MentionRecord> = targets
        .iter()
        .map(|target| MentionRecord {
            source_channel_id: scan.source_channel_id.clone(),
            target_channel_id: (*target).to_owned(),
            video_id: scan.video_id.clone(),
            mentioned_at: scan.mentioned_at,
        })
        .collect();
    insert_mentions(&mut *tx, &records).await?;

    for target in &targets {
        if let Some((low, high)) = canonical_pair(&scan.source_channel_id, target) {
            upsert_edge(&mut *tx, low, high, scan.mentioned_at, scan.duration_seconds).await?;
        }
    }

    tx.commit().await?;
    tracing::debug!(
        video_id = %scan.video_id,
        mentions = records.len(),
        "recorded video mentions"
    );
    Ok(true)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_mentions_for_video(
    pool: &PgPool,
    video_id: &str,
) -> Result<Vec<MentionRow>, DbError> {
    let rows = sqlx::query_as::<_, MentionRow>(
        "SELECT source_channel_id, target_channel_id, video_id, mentioned_at \
         FROM mentions WHERE video_id = $1 \
         ORDER BY target_channel_id",
    )
    .bind(video_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
