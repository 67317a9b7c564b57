//! Database operations for the `channels` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use streamnet_core::{ChannelDetails, ChannelStub};

use crate::DbError;

pub(crate) const CHANNEL_COLUMNS: &str = "id, login, display_name, description, \
     profile_image_url, broadcaster_type, view_count, follower_count, created_at, \
     first_seen, last_fetched_details, last_fetched_videos";

/// A row from the `channels` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChannelRow {
    pub id: String,
    pub login: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub profile_image_url: Option<String>,
    pub broadcaster_type: Option<String>,
    pub view_count: Option<i64>,
    pub follower_count: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub first_seen: DateTime<Utc>,
    pub last_fetched_details: Option<DateTime<Utc>>,
    pub last_fetched_videos: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a channel stub if neither its id nor its login is known yet.
/// An existing row is never modified.
///
/// Returns `true` if a row was inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn observe_channel_stub(pool: &PgPool, stub: &ChannelStub) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO channels (id, login, display_name) VALUES ($1, $2, $3) \
         ON CONFLICT DO NOTHING",
    )
    .bind(&stub.id)
    .bind(&stub.login)
    .bind(stub.display_name.as_deref())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Batch form of [`observe_channel_stub`].
///
/// Returns the number of stubs inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn observe_channel_stubs(pool: &PgPool, stubs: &[ChannelStub]) -> Result<u64, DbError> {
    if stubs.is_empty() {
        return Ok(0);
    }

    let ids: Vec<&str> = stubs.iter().map(|s| s.id.as_str()).collect();
    let logins: Vec<&str> = stubs.iter().map(|s| s.login.as_str()).collect();
    let display_names: Vec<Option<&str>> =
        stubs.iter().map(|s| s.display_name.as_deref()).collect();

    let result = sqlx::query(
        "INSERT INTO channels (id, login, display_name) \
         SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[]) \
         ON CONFLICT DO NOTHING",
    )
    .bind(&ids)
    .bind(&logins)
    .bind(&display_names)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Upserts a full channel profile in one statement and stamps
/// `last_fetched_details = NOW()`.
///
/// - `created_at` is kept once set (platform value is immutable).
/// - `first_seen` is never touched on conflict.
/// - `follower_count` keeps the stored value when this observation has none.
/// - Every other profile field is overwritten with the new observation.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails, including a unique
/// violation when another channel already holds this login.
pub async fn observe_channel_details(
    pool: &PgPool,
    details: &ChannelDetails,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO channels \
             (id, login, display_name, description, profile_image_url, broadcaster_type, \
              view_count, follower_count, created_at, last_fetched_details) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW()) \
         ON CONFLICT (id) DO UPDATE SET \
             login                = EXCLUDED.login, \
             display_name         = EXCLUDED.display_name, \
             description          = EXCLUDED.description, \
             profile_image_url    = EXCLUDED.profile_image_url, \
             broadcaster_type     = EXCLUDED.broadcaster_type, \
             view_count           = EXCLUDED.view_count, \
             follower_count       = COALESCE(EXCLUDED.follower_count, channels.follower_count), \
             created_at           = COALESCE(channels.created_at, EXCLUDED.created_at), \
             last_fetched_details = NOW()",
    )
    .bind(&details.id)
    .bind(&details.login)
    .bind(details.display_name.as_deref())
    .bind(details.description.as_deref())
    .bind(details.profile_image_url.as_deref())
    .bind(details.broadcaster_type.as_deref())
    .bind(details.view_count)
    .bind(details.follower_count)
    .bind(details.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn get_channel(pool: &PgPool, channel_id: &str) -> Result<Option<ChannelRow>, DbError> {
    let row = sqlx::query_as::<_, ChannelRow>(&format!(
        "SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = $1"
    ))
    .bind(channel_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Case-insensitive login lookup for mention resolution.
///
/// Returns `(lower-cased login, channel id)` pairs for the logins that are
/// known; unknown logins are simply absent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn find_channel_ids_by_logins(
    pool: &PgPool,
    logins: &[String],
) -> Result<Vec<(String, String)>, DbError> {
    if logins.is_empty() {
        return Ok(Vec::new());
    }
    let lowered: Vec<String> = logins.iter().map(|l| l.to_lowercase()).collect();

    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT LOWER(login), id FROM channels WHERE LOWER(login) = ANY($1::text[])",
    )
    .bind(&lowered)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
