mod crawl;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::crawl::CrawlCommands;

#[derive(Debug, Parser)]
#[command(name = "streamnet")]
#[command(about = "Twitch collaboration network crawler")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Harvest categories, channels, videos, and mentions
    Crawl {
        #[command(subcommand)]
        command: CrawlCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Print row counts per table
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("streamnet: nothing to do; try `streamnet --help`");
        return Ok(());
    };

    let config = streamnet_core::load_app_config_from_env().context("loading configuration")?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = streamnet_db::PoolConfig::from_app_config(&config);
    let pool = streamnet_db::connect_pool(&config.database_url, pool_config)
        .await
        .context("connecting to database")?;

    match command {
        Commands::Db { command } => run_db(&pool, command).await,
        Commands::Crawl { command } => {
            let client = streamnet_twitch::TwitchClient::from_app_config(&config)
                .context("building Twitch client")?;
            crawl::run_crawl(&pool, &client, &config, command).await
        }
    }
}

async fn run_db(pool: &sqlx::PgPool, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            streamnet_db::ping(pool).await?;
            println!("database reachable");
        }
        DbCommands::Migrate => {
            let applied = streamnet_db::run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Stats => {
            let counts = streamnet_db::table_counts(pool).await?;
            println!("{:<20}{:>12}", "TABLE", "ROWS");
            for (name, value) in [
                ("categories", counts.categories),
                ("channels", counts.channels),
                ("videos", counts.videos),
                ("collaborations", counts.collaborations),
                ("mentions", counts.mentions),
                ("unprocessed videos", counts.unprocessed_videos),
            ] {
                println!("{name:<20}{value:>12}");
            }
        }
    }
    Ok(())
}
