//! Crawl command handlers for the CLI.
//!
//! These are called from `main` after the database pool, config, and Twitch
//! client are established. Per-entity failures are logged and counted rather
//! than propagated so one bad channel does not abort a whole pass; a pass in
//! which every entity failed returns an error.

mod categories;
mod channels;
mod mentions;

use clap::Subcommand;
use streamnet_core::AppConfig;
use streamnet_twitch::TwitchClient;

pub(crate) use categories::run_crawl_categories;
pub(crate) use channels::run_crawl_channels;
pub(crate) use mentions::run_crawl_mentions;

/// Sub-commands available under `crawl`.
#[derive(Debug, Subcommand)]
pub enum CrawlCommands {
    /// Fetch top categories and record the channels streaming in them
    Categories {
        /// Number of top categories to fetch (defaults to STREAMNET_TOP_CATEGORIES)
        #[arg(long)]
        limit: Option<usize>,

        /// Print the fetched categories without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Refresh channel profiles and archived videos for stale channels
    Channels {
        /// Channels to consider this pass (defaults to STREAMNET_REFRESH_CYCLE_CHANNELS)
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        limit: Option<i64>,
    },
    /// Scan unprocessed videos for @mentions and record collaborations
    Mentions {
        /// Videos per batch (defaults to STREAMNET_MENTION_BATCH_SIZE)
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
        batch_size: Option<i64>,

        /// Upper bound on batches this pass (defaults to STREAMNET_MENTION_MAX_BATCHES)
        #[arg(long)]
        max_batches: Option<u32>,
    },
    /// Run categories, channels, and mentions in order
    All,
}

/// Dispatch a `crawl` sub-command.
///
/// # Errors
///
/// Returns the first pass-level error; see the individual handlers.
pub(crate) async fn run_crawl(
    pool: &sqlx::PgPool,
    client: &TwitchClient,
    config: &AppConfig,
    command: CrawlCommands,
) -> anyhow::Result<()> {
    match command {
        CrawlCommands::Categories { limit, dry_run } => {
            run_crawl_categories(pool, client, config, limit, dry_run).await
        }
        CrawlCommands::Channels { limit } => run_crawl_channels(pool, client, config, limit).await,
        CrawlCommands::Mentions {
            batch_size,
            max_batches,
        } => run_crawl_mentions(pool, config, batch_size, max_batches).await,
        CrawlCommands::All => {
            run_crawl_categories(pool, client, config, None, false).await?;
            run_crawl_channels(pool, client, config, None).await?;
            run_crawl_mentions(pool, config, None, None).await
        }
    }
}

/// Success and failure counts for one crawl pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tally {
    pub succeeded: usize,
    pub failed: usize,
}

impl Tally {
    pub(crate) fn success(&mut self) {
        self.succeeded += 1;
    }

    pub(crate) fn failures(&mut self, count: usize) {
        self.failed += count;
    }

    pub(crate) fn total(self) -> usize {
        self.succeeded + self.failed
    }

    /// Logs partial failure and turns a pass where nothing succeeded into an
    /// error. An empty pass is not a failure.
    pub(crate) fn finish(self, entity: &'static str) -> anyhow::Result<Self> {
        if self.failed > 0 {
            tracing::warn!(
                failed = self.failed,
                total = self.total(),
                entity,
                "some entities failed during crawl"
            );
        }
        if self.failed > 0 && self.succeeded == 0 {
            anyhow::bail!("all {} {entity} failed", self.failed);
        }
        Ok(self)
    }
}

#[cfg(test)]
#[path = "crawl_test.rs"]
mod tests;
