//! Offline unit tests for streamnet-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use streamnet_core::{AppConfig, Environment};
use streamnet_db::{PoolConfig, TableCounts, VideoRow};

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        twitch_client_id: "client".to_string(),
        twitch_client_secret: "secret".to_string(),
        twitch_auth_url: "https://id.twitch.tv/oauth2/token".to_string(),
        twitch_api_base_url: "https://api.twitch.tv/helix".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        request_timeout_secs: 15,
        max_retries: 3,
        retry_backoff_base_ms: 1000,
        rate_limit_buffer_ms: 1000,
        rate_limit_fallback_wait_ms: 15_000,
        retry_server_errors: false,
        token_safety_margin_secs: 300,
        inter_page_delay_ms: 100,
        details_max_age_days: 7,
        videos_max_age_days: 2,
        top_categories: 50,
        streams_per_category: 50,
        refresh_cycle_channels: 500,
        videos_per_channel: 100,
        mention_batch_size: 500,
        mention_max_batches: 100,
        max_concurrent_channels: 1,
        fetch_videos_after: None,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

fn video_row(title: Option<&str>, description: Option<&str>) -> VideoRow {
    VideoRow {
        id: "v1".to_string(),
        channel_id: "100".to_string(),
        title: title.map(str::to_string),
        description: description.map(str::to_string),
        url: None,
        thumbnail_url: None,
        view_count: None,
        video_type: Some("archive".to_string()),
        language: None,
        created_at_api: None,
        published_at: None,
        duration: None,
        duration_seconds: None,
        muted_segments: None,
        fetched_at: Utc::now(),
        mentions_processed_at: None,
    }
}

#[test]
fn searchable_text_joins_title_and_description() {
    let row = video_row(Some("with @alpha"), Some("and @beta"));
    assert_eq!(row.searchable_text(), "with @alpha and @beta");
}

#[test]
fn searchable_text_skips_missing_parts() {
    assert_eq!(video_row(None, Some("desc")).searchable_text(), "desc");
    assert_eq!(video_row(Some("title"), None).searchable_text(), "title");
    assert_eq!(video_row(None, None).searchable_text(), "");
}

#[test]
fn table_counts_default_is_all_zero() {
    let counts = TableCounts::default();
    assert_eq!(counts.categories, 0);
    assert_eq!(counts.unprocessed_videos, 0);
}
