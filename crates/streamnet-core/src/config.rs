use chrono::{DateTime, Utc};

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_AUTH_URL: &str = "https://id.twitch.tv/oauth2/token";
const DEFAULT_API_BASE_URL: &str = "https://api.twitch.tv/helix";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can feed a plain
/// `HashMap` instead of mutating global state.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        or_default(var, default)
            .parse::<i64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
        }
    };

    let database_url = require("DATABASE_URL")?;
    let twitch_client_id = require("TWITCH_CLIENT_ID")?;
    let twitch_client_secret = require("TWITCH_CLIENT_SECRET")?;

    let env = parse_environment(&or_default("STREAMNET_ENV", "development"))?;
    let log_level = or_default("STREAMNET_LOG_LEVEL", "info");
    let twitch_auth_url = or_default("STREAMNET_TWITCH_AUTH_URL", DEFAULT_AUTH_URL);
    let twitch_api_base_url = or_default("STREAMNET_TWITCH_API_BASE_URL", DEFAULT_API_BASE_URL);

    let db_max_connections = parse_u32("STREAMNET_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("STREAMNET_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("STREAMNET_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let request_timeout_secs = parse_u64("STREAMNET_REQUEST_TIMEOUT_SECS", "15")?;
    let max_retries = parse_u32("STREAMNET_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("STREAMNET_RETRY_BACKOFF_BASE_MS", "1000")?;
    let rate_limit_buffer_ms = parse_u64("STREAMNET_RATE_LIMIT_BUFFER_MS", "1000")?;
    let rate_limit_fallback_wait_ms = parse_u64("STREAMNET_RATE_LIMIT_FALLBACK_WAIT_MS", "15000")?;
    let retry_server_errors = parse_bool("STREAMNET_RETRY_SERVER_ERRORS", "false")?;
    let token_safety_margin_secs = parse_u64("STREAMNET_TOKEN_SAFETY_MARGIN_SECS", "300")?;
    let inter_page_delay_ms = parse_u64("STREAMNET_INTER_PAGE_DELAY_MS", "100")?;

    let details_max_age_days = parse_i64("STREAMNET_DETAILS_MAX_AGE_DAYS", "7")?;
    let videos_max_age_days = parse_i64("STREAMNET_VIDEOS_MAX_AGE_DAYS", "2")?;
    let top_categories = parse_usize("STREAMNET_TOP_CATEGORIES", "50")?;
    let streams_per_category = parse_usize("STREAMNET_STREAMS_PER_CATEGORY", "50")?;
    let refresh_cycle_channels = parse_i64("STREAMNET_REFRESH_CYCLE_CHANNELS", "500")?;
    let videos_per_channel = parse_usize("STREAMNET_VIDEOS_PER_CHANNEL", "100")?;
    let mention_batch_size = parse_i64("STREAMNET_MENTION_BATCH_SIZE", "500")?;
    let mention_max_batches = parse_u32("STREAMNET_MENTION_MAX_BATCHES", "100")?;
    let max_concurrent_channels = parse_usize("STREAMNET_MAX_CONCURRENT_CHANNELS", "1")?;

    let fetch_videos_after = match lookup("STREAMNET_FETCH_VIDEOS_AFTER") {
        Ok(raw) if !raw.trim().is_empty() => Some(
            DateTime::parse_from_rfc3339(raw.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| invalid("STREAMNET_FETCH_VIDEOS_AFTER", e.to_string()))?,
        ),
        _ => None,
    };

    if details_max_age_days < 0 {
        return Err(invalid(
            "STREAMNET_DETAILS_MAX_AGE_DAYS",
            "must not be negative".to_string(),
        ));
    }
    if videos_max_age_days < 0 {
        return Err(invalid(
            "STREAMNET_VIDEOS_MAX_AGE_DAYS",
            "must not be negative".to_string(),
        ));
    }
    if refresh_cycle_channels < 0 {
        return Err(invalid(
            "STREAMNET_REFRESH_CYCLE_CHANNELS",
            "must not be negative".to_string(),
        ));
    }
    if mention_batch_size < 1 {
        return Err(invalid(
            "STREAMNET_MENTION_BATCH_SIZE",
            "must be at least 1".to_string(),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        twitch_client_id,
        twitch_client_secret,
        twitch_auth_url,
        twitch_api_base_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        rate_limit_buffer_ms,
        rate_limit_fallback_wait_ms,
        retry_server_errors,
        token_safety_margin_secs,
        inter_page_delay_ms,
        details_max_age_days,
        videos_max_age_days,
        top_categories,
        streams_per_category,
        refresh_cycle_channels,
        videos_per_channel,
        mention_batch_size,
        mention_max_batches,
        max_concurrent_channels,
        fetch_videos_after,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "STREAMNET_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
