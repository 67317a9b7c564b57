//! `crawl categories`: discover categories and the channels live in them.

use anyhow::Context;
use streamnet_core::AppConfig;
use streamnet_db::CategoryRow;
use streamnet_twitch::TwitchClient;

use super::Tally;

/// Fetches the current top categories, records them, then scans every
/// category due for a scan and records each live broadcaster as a channel
/// stub. A category is stamped as scanned only after its stubs are stored.
///
/// When `dry_run` is `true` the fetched categories are printed and nothing
/// is written.
///
/// # Errors
///
/// Returns an error if the top-categories fetch or the category upsert
/// fails, or if every category scan failed. Individual scan failures are
/// logged and skipped.
pub(crate) async fn run_crawl_categories(
    pool: &sqlx::PgPool,
    client: &TwitchClient,
    config: &AppConfig,
    limit: Option<usize>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let limit = limit.unwrap_or(config.top_categories);
    let categories = client
        .get_top_categories(limit)
        .await
        .context("fetching top categories")?;

    if dry_run {
        println!("dry-run: fetched {} categories", categories.len());
        for category in &categories {
            println!("{:<12}{}", category.id, category.name);
        }
        return Ok(());
    }

    let new_categories = streamnet_db::observe_categories(pool, &categories).await?;
    tracing::info!(
        fetched = categories.len(),
        new = new_categories,
        "observed top categories"
    );

    let scan_limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let due = streamnet_db::categories_due_for_scan(pool, scan_limit).await?;
    if due.is_empty() {
        println!("no categories due for a scan");
        return Ok(());
    }

    let mut tally = Tally::default();
    let mut new_channels: u64 = 0;
    for category in &due {
        match scan_category(pool, client, config, category).await {
            Ok(inserted) => {
                new_channels += inserted;
                tally.success();
            }
            Err(e) => {
                tracing::warn!(
                    category_id = %category.id,
                    category = %category.name,
                    error = %format!("{e:#}"),
                    "category scan failed"
                );
                tally.failures(1);
            }
        }
    }

    let tally = tally.finish("category scans")?;
    println!(
        "scanned {} of {} categories; {new_channels} new channels",
        tally.succeeded,
        tally.total()
    );
    Ok(())
}

async fn scan_category(
    pool: &sqlx::PgPool,
    client: &TwitchClient,
    config: &AppConfig,
    category: &CategoryRow,
) -> anyhow::Result<u64> {
    let stubs = client
        .get_streams_for_category(&category.id, config.streams_per_category)
        .await?;
    let inserted = streamnet_db::observe_channel_stubs(pool, &stubs).await?;
    streamnet_db::observe_category_scanned(pool, &category.id).await?;
    tracing::debug!(
        category_id = %category.id,
        live = stubs.len(),
        new = inserted,
        "scanned category"
    );
    Ok(inserted)
}
