//! `crawl channels`: refresh profiles and archived videos of stale channels.

use anyhow::Context;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use streamnet_core::{is_due, AppConfig};
use streamnet_db::ChannelRow;
use streamnet_twitch::{TwitchClient, UserQuery, MAX_PAGE_SIZE};

use super::Tally;

/// Refreshes the channels least recently polled for videos.
///
/// For each selected channel:
/// - profile details (with follower total) are refetched when older than
///   `details_max_age_days`, in batches of up to 100 ids per users call;
/// - archived videos are fetched when older than `videos_max_age_days`,
///   stopping at the newest video already stored (or at
///   `fetch_videos_after` for a channel with none), and stored together with
///   the channel's fetch stamp.
///
/// Up to `max_concurrent_channels` video refreshes run at once.
///
/// # Errors
///
/// Returns an error if the selection query fails or if every attempted
/// refresh failed. Per-channel failures are logged and skipped.
pub(crate) async fn run_crawl_channels(
    pool: &sqlx::PgPool,
    client: &TwitchClient,
    config: &AppConfig,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    let limit = limit.unwrap_or(config.refresh_cycle_channels);
    let channels = streamnet_db::channels_due_for_video_refresh(pool, limit)
        .await
        .context("selecting channels for refresh")?;

    let now = Utc::now();
    let details_due: Vec<String> = channels
        .iter()
        .filter(|c| is_due(c.last_fetched_details, config.details_max_age_days, now))
        .map(|c| c.id.clone())
        .collect();
    let videos_due: Vec<&ChannelRow> = channels
        .iter()
        .filter(|c| is_due(c.last_fetched_videos, config.videos_max_age_days, now))
        .collect();

    if details_due.is_empty() && videos_due.is_empty() {
        println!("no channels due for refresh");
        return Ok(());
    }

    let mut tally = Tally::default();
    let refreshed_details = refresh_details(pool, client, &details_due, &mut tally).await;

    let results: Vec<(&ChannelRow, anyhow::Result<u64>)> = stream::iter(videos_due)
        .map(|channel| async move { (channel, refresh_videos(pool, client, config, channel).await) })
        .buffer_unordered(config.max_concurrent_channels.max(1))
        .collect()
        .await;

    let mut new_videos: u64 = 0;
    let mut refreshed_videos: usize = 0;
    for (channel, result) in results {
        match result {
            Ok(inserted) => {
                new_videos += inserted;
                refreshed_videos += 1;
                tally.success();
            }
            Err(e) => {
                tracing::warn!(
                    channel_id = %channel.id,
                    login = %channel.login,
                    error = %format!("{e:#}"),
                    "video refresh failed"
                );
                tally.failures(1);
            }
        }
    }

    tally.finish("channel refreshes")?;
    println!(
        "refreshed {refreshed_details} profiles and {refreshed_videos} video lists; \
         {new_videos} new videos"
    );
    Ok(())
}

/// Refetches profiles for `ids`. Returns how many were stored.
async fn refresh_details(
    pool: &sqlx::PgPool,
    client: &TwitchClient,
    ids: &[String],
    tally: &mut Tally,
) -> usize {
    let mut stored = 0;
    for chunk in ids.chunks(MAX_PAGE_SIZE) {
        let users = match client.get_users(UserQuery::Ids(chunk)).await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(channels = chunk.len(), error = %e, "users lookup failed");
                tally.failures(chunk.len());
                continue;
            }
        };
        if users.len() < chunk.len() {
            tracing::debug!(
                requested = chunk.len(),
                returned = users.len(),
                "some channels were not returned by users lookup"
            );
        }

        for mut details in users {
            match client.get_follower_count(&details.id).await {
                Ok(total) => details.follower_count = Some(total),
                // keep the stored follower count
                Err(e) => tracing::warn!(
                    channel_id = %details.id,
                    error = %e,
                    "follower count lookup failed"
                ),
            }
            match streamnet_db::observe_channel_details(pool, &details).await {
                Ok(()) => {
                    stored += 1;
                    tally.success();
                }
                Err(e) => {
                    tracing::warn!(
                        channel_id = %details.id,
                        login = %details.login,
                        error = %e,
                        "storing channel details failed"
                    );
                    tally.failures(1);
                }
            }
        }
    }
    stored
}

async fn refresh_videos(
    pool: &sqlx::PgPool,
    client: &TwitchClient,
    config: &AppConfig,
    channel: &ChannelRow,
) -> anyhow::Result<u64> {
    let cutoff = streamnet_db::latest_video_published_at(pool, &channel.id)
        .await?
        .or(config.fetch_videos_after);
    let videos = client
        .get_channel_videos(&channel.id, config.videos_per_channel, cutoff)
        .await?;
    let inserted = streamnet_db::observe_channel_videos(pool, &channel.id, &videos).await?;
    tracing::debug!(
        channel_id = %channel.id,
        fetched = videos.len(),
        new = inserted,
        "refreshed channel videos"
    );
    Ok(inserted)
}
