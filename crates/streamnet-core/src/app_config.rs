use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Runtime settings for a crawl process, read once at startup.
///
/// Retry, rate-limit, and staleness values are plain numbers consumed by the
/// Twitch client and the crawl commands; nothing here is re-read mid-run.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub twitch_client_id: String,
    pub twitch_client_secret: String,
    pub twitch_auth_url: String,
    pub twitch_api_base_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub rate_limit_buffer_ms: u64,
    pub rate_limit_fallback_wait_ms: u64,
    pub retry_server_errors: bool,
    pub token_safety_margin_secs: u64,
    pub inter_page_delay_ms: u64,
    pub details_max_age_days: i64,
    pub videos_max_age_days: i64,
    pub top_categories: usize,
    pub streams_per_category: usize,
    pub refresh_cycle_channels: i64,
    pub videos_per_channel: usize,
    pub mention_batch_size: i64,
    pub mention_max_batches: u32,
    pub max_concurrent_channels: usize,
    /// Lower bound for video fetches on channels with no stored videos.
    pub fetch_videos_after: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("twitch_client_id", &self.twitch_client_id)
            .field("twitch_client_secret", &"[redacted]")
            .field("twitch_auth_url", &self.twitch_auth_url)
            .field("twitch_api_base_url", &self.twitch_api_base_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("rate_limit_buffer_ms", &self.rate_limit_buffer_ms)
            .field(
                "rate_limit_fallback_wait_ms",
                &self.rate_limit_fallback_wait_ms,
            )
            .field("retry_server_errors", &self.retry_server_errors)
            .field("token_safety_margin_secs", &self.token_safety_margin_secs)
            .field("inter_page_delay_ms", &self.inter_page_delay_ms)
            .field("details_max_age_days", &self.details_max_age_days)
            .field("videos_max_age_days", &self.videos_max_age_days)
            .field("top_categories", &self.top_categories)
            .field("streams_per_category", &self.streams_per_category)
            .field("refresh_cycle_channels", &self.refresh_cycle_channels)
            .field("videos_per_channel", &self.videos_per_channel)
            .field("mention_batch_size", &self.mention_batch_size)
            .field("mention_max_batches", &self.mention_max_batches)
            .field("max_concurrent_channels", &self.max_concurrent_channels)
            .field("fetch_videos_after", &self.fetch_videos_after)
            .finish()
    }
}
