//! Database operations for the `videos` table.
//!
//! Videos are insert-if-absent: once a row exists its descriptive fields are
//! never rewritten. The only mutable column is `mentions_processed_at`.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use streamnet_core::VideoRecord;

use crate::DbError;

const VIDEO_COLUMNS: &str = "id, channel_id, title, description, url, thumbnail_url, \
     view_count, video_type, language, created_at_api, published_at, duration, \
     duration_seconds, muted_segments, fetched_at, mentions_processed_at";

/// A row from the `videos` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VideoRow {
    pub id: String,
    pub channel_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub view_count: Option<i64>,
    pub video_type: Option<String>,
    pub language: Option<String>,
    pub created_at_api: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub duration: Option<String>,
    pub duration_seconds: Option<i64>,
    pub muted_segments: Option<serde_json::Value>,
    pub fetched_at: DateTime<Utc>,
    pub mentions_processed_at: Option<DateTime<Utc>>,
}

impl VideoRow {
    /// Title and description joined for mention scanning.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        [self.title.as_deref(), self.description.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Bulk insert-if-absent via `UNNEST`; returns the number of new rows.
async fn insert_videos<'e, E>(executor: E, videos: &[VideoRecord]) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    if videos.is_empty() {
        return Ok(0);
    }

    let mut ids: Vec<&str> = Vec::with_capacity(videos.len());
    let mut channel_ids: Vec<&str> = Vec::with_capacity(videos.len());
    let mut titles: Vec<Option<&str>> = Vec::with_capacity(videos.len());
    let mut descriptions: Vec<Option<&str>> = Vec::with_capacity(videos.len());
    let mut urls: Vec<Option<&str>> = Vec::with_capacity(videos.len());
    let mut thumbnails: Vec<Option<&str>> = Vec::with_capacity(videos.len());
    let mut view_counts: Vec<Option<i64>> = Vec::with_capacity(videos.len());
    let mut video_types: Vec<Option<&str>> = Vec::with_capacity(videos.len());
    let mut languages: Vec<Option<&str>> = Vec::with_capacity(videos.len());
    let mut created_ats: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(videos.len());
    let mut published_ats: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(videos.len());
    let mut durations: Vec<Option<&str>> = Vec::with_capacity(videos.len());
    let mut duration_secs: Vec<Option<i64>> = Vec::with_capacity(videos.len());
    let mut muted: Vec<Option<serde_json::Value>> = Vec::with_capacity(videos.len());

    for v in videos {
        ids.push(&v.id);
        channel_ids.push(&v.channel_id);
        titles.push(v.title.as_deref());
        descriptions.push(v.description.as_deref());
        urls.push(v.url.as_deref());
        thumbnails.push(v.thumbnail_url.as_deref());
        view_counts.push(v.view_count);
        video_types.push(v.video_type.as_deref());
        languages.push(v.language.as_deref());
        created_ats.push(v.created_at_api);
        published_ats.push(v.published_at);
        durations.push(v.duration.as_deref());
        duration_secs.push(v.duration_seconds);
        muted.push(v.muted_segments.clone());
    }

    let result = sqlx::query(
        "INSERT INTO videos \
             (id, channel_id, title, description, url, thumbnail_url, view_count, \
              video_type, language, created_at_api, published_at, duration, \
              duration_seconds, muted_segments) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], \
              $7::int8[], $8::text[], $9::text[], $10::timestamptz[], $11::timestamptz[], \
              $12::text[], $13::int8[], $14::jsonb[]) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(&ids)
    .bind(&channel_ids)
    .bind(&titles)
    .bind(&descriptions)
    .bind(&urls)
    .bind(&thumbnails)
    .bind(&view_counts)
    .bind(&video_types)
    .bind(&languages)
    .bind(&created_ats)
    .bind(&published_ats)
    .bind(&durations)
    .bind(&duration_secs)
    .bind(&muted)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Records videos that are not yet stored. Existing rows are left as-is.
///
/// Returns the number of videos inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (e.g. an unknown `channel_id`).
pub async fn observe_videos(pool: &PgPool, videos: &[VideoRecord]) -> Result<u64, DbError> {
    Ok(insert_videos(pool, videos).await?)
}

/// Stores a channel's freshly fetched videos and stamps
/// `channels.last_fetched_videos` in the same transaction, so the channel
/// only looks fresh once its videos are durable.
///
/// Returns the number of videos inserted.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the channel does not exist (nothing is
/// written), or [`DbError::Sqlx`] on query failure.
pub async fn observe_channel_videos(
    pool: &PgPool,
    channel_id: &str,
    videos: &[VideoRecord],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let stamped = sqlx::query("UPDATE channels SET last_fetched_videos = NOW() WHERE id = $1")
        .bind(channel_id)
        .execute(&mut *tx)
        .await?;
    if stamped.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    let inserted = insert_videos(&mut *tx, videos).await?;

    tx.commit().await?;
    Ok(inserted)
}

/// Sets the mentions-processed marker. A marker that is already set keeps
/// its original timestamp.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the video does not exist, or
/// [`DbError::Sqlx`] on query failure.
pub async fn mark_video_mentions_processed(pool: &PgPool, video_id: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE videos SET mentions_processed_at = COALESCE(mentions_processed_at, NOW()) \
         WHERE id = $1",
    )
    .bind(video_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn get_video(pool: &PgPool, video_id: &str) -> Result<Option<VideoRow>, DbError> {
    let row = sqlx::query_as::<_, VideoRow>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1"
    ))
    .bind(video_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Videos not yet scanned for mentions, oldest fetch first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn unprocessed_videos_batch(pool: &PgPool, limit: i64) -> Result<Vec<VideoRow>, DbError> {
    let rows = sqlx::query_as::<_, VideoRow>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos \
         WHERE mentions_processed_at IS NULL \
         ORDER BY fetched_at ASC, id ASC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Newest stored `published_at` for a channel; the cutoff for incremental
/// video fetches.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn latest_video_published_at(
    pool: &PgPool,
    channel_id: &str,
) -> Result<Option<DateTime<Utc>>, DbError> {
    let latest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
        "SELECT MAX(published_at) FROM videos WHERE channel_id = $1",
    )
    .bind(channel_id)
    .fetch_one(pool)
    .await?;
    Ok(latest)
}
