//! `crawl mentions`: turn `@login` references in video text into mention
//! rows and collaboration edges.

use streamnet_core::{extract_mentions, resolve_mentions, AppConfig};
use streamnet_db::{VideoMentions, VideoRow};

use super::Tally;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum VideoOutcome {
    /// Mentions committed; carries the number of distinct targets.
    Recorded(usize),
    /// Another run already claimed this video.
    AlreadyProcessed,
    /// The login lookup failed; the video stays unprocessed.
    Degraded,
}

/// Processes unprocessed videos in batches of `batch_size`, oldest fetch
/// first, for at most `max_batches` batches.
///
/// Videos whose mention lookup failed stay unprocessed and are retried on a
/// later pass. A batch in which no video could be processed ends the pass
/// early, since the next batch would select the same videos again.
///
/// # Errors
///
/// Returns an error if a batch query fails or if every attempted video
/// failed.
pub(crate) async fn run_crawl_mentions(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    batch_size: Option<i64>,
    max_batches: Option<u32>,
) -> anyhow::Result<()> {
    let batch_size = batch_size.unwrap_or(config.mention_batch_size).max(1);
    let max_batches = max_batches.unwrap_or(config.mention_max_batches);

    let mut tally = Tally::default();
    let mut videos_with_mentions: usize = 0;
    let mut mentions_recorded: usize = 0;

    for batch_number in 0..max_batches {
        let batch = streamnet_db::unprocessed_videos_batch(pool, batch_size).await?;
        if batch.is_empty() {
            break;
        }

        let succeeded_before = tally.succeeded;
        for video in &batch {
            match process_video(pool, video).await {
                Ok(VideoOutcome::Recorded(count)) => {
                    if count > 0 {
                        videos_with_mentions += 1;
                        mentions_recorded += count;
                    }
                    tally.success();
                }
                Ok(VideoOutcome::AlreadyProcessed) => tally.success(),
                Ok(VideoOutcome::Degraded) => tally.failures(1),
                Err(e) => {
                    tracing::warn!(
                        video_id = %video.id,
                        channel_id = %video.channel_id,
                        error = %format!("{e:#}"),
                        "recording video mentions failed"
                    );
                    tally.failures(1);
                }
            }
        }

        if tally.succeeded == succeeded_before {
            tracing::warn!(
                batch = batch_number,
                videos = batch.len(),
                "no video in batch could be processed; stopping"
            );
            break;
        }
    }

    if tally.total() == 0 {
        println!("no unprocessed videos");
        return Ok(());
    }

    let tally = tally.finish("videos")?;
    println!(
        "processed {} videos; {mentions_recorded} mentions across {videos_with_mentions} videos",
        tally.succeeded
    );
    Ok(())
}

/// Extracts, resolves, and commits the mentions of a single video.
///
/// The owner is excluded from its own targets. Mentions are stamped with the
/// video's publish time, falling back to when it was fetched.
pub(crate) async fn process_video(
    pool: &sqlx::PgPool,
    video: &VideoRow,
) -> anyhow::Result<VideoOutcome> {
    let candidates = extract_mentions(&video.searchable_text());
    let resolution = resolve_mentions(&candidates, |logins| async move {
        streamnet_db::find_channel_ids_by_logins(pool, &logins).await
    })
    .await;

    if resolution.degraded {
        return Ok(VideoOutcome::Degraded);
    }
    if !resolution.not_found.is_empty() {
        tracing::debug!(
            video_id = %video.id,
            unresolved = resolution.not_found.len(),
            "some mentioned logins are not known channels"
        );
    }

    let target_channel_ids: Vec<String> = resolution
        .found
        .into_values()
        .filter(|id| *id != video.channel_id)
        .collect();
    let count = target_channel_ids.len();

    let scan = VideoMentions {
        video_id: video.id.clone(),
        source_channel_id: video.channel_id.clone(),
        mentioned_at: video.published_at.unwrap_or(video.fetched_at),
        duration_seconds: video.duration_seconds.unwrap_or(0),
        target_channel_ids,
    };

    if streamnet_db::record_video_mentions(pool, &scan).await? {
        Ok(VideoOutcome::Recorded(count))
    } else {
        Ok(VideoOutcome::AlreadyProcessed)
    }
}
