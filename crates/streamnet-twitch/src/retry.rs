//! Retry and rate-limit timing for the Helix requester.
//!
//! [`RetryPolicy`] holds the numeric knobs and computes waits; the request
//! loop in [`crate::client`] decides *whether* to retry based on the response
//! class. Keeping the arithmetic here makes it testable without a server.

use std::time::Duration;

use streamnet_core::AppConfig;

/// Upper bound on any single back-off sleep.
const MAX_DELAY_MS: u64 = 60_000;

/// Header carrying the epoch second at which the rate-limit bucket refills.
pub const RATELIMIT_RESET_HEADER: &str = "ratelimit-reset";
pub const RATELIMIT_REMAINING_HEADER: &str = "ratelimit-remaining";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first request.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    /// Added on top of the reset instant reported by a 429.
    pub rate_limit_buffer_ms: u64,
    /// Used when a 429 carries no usable reset header.
    pub rate_limit_fallback_wait_ms: u64,
    pub retry_server_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1_000,
            rate_limit_buffer_ms: 1_000,
            rate_limit_fallback_wait_ms: 15_000,
            retry_server_errors: false,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            rate_limit_buffer_ms: config.rate_limit_buffer_ms,
            rate_limit_fallback_wait_ms: config.rate_limit_fallback_wait_ms,
            retry_server_errors: config.retry_server_errors,
        }
    }

    /// Back-off before retry number `attempt + 1`: `base * 2^attempt`, capped at 60 s.
    ///
    /// | attempt | delay (base = 1 000 ms) |
    /// |---------|-------------------------|
    /// | 0       | 1 000 ms                |
    /// | 1       | 2 000 ms                |
    /// | 2       | 4 000 ms                |
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let computed = self
            .backoff_base_ms
            .saturating_mul(1u64 << attempt.min(16));
        Duration::from_millis(computed.min(MAX_DELAY_MS))
    }

    /// Wait after a 429, given the raw `Ratelimit-Reset` header and the
    /// current time in epoch milliseconds.
    ///
    /// A reset instant already in the past waits only the buffer. A missing
    /// or unparseable header waits the fixed fallback.
    #[must_use]
    pub fn rate_limit_wait(&self, reset_header: Option<&str>, now_ms: i64) -> Duration {
        let Some(reset_secs) = reset_header.and_then(|v| v.trim().parse::<i64>().ok()) else {
            return Duration::from_millis(self.rate_limit_fallback_wait_ms);
        };
        let until_reset = reset_secs.saturating_mul(1_000).saturating_sub(now_ms).max(0);
        let until_reset = u64::try_from(until_reset).unwrap_or(0);
        Duration::from_millis(until_reset.saturating_add(self.rate_limit_buffer_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            backoff_base_ms: 1_000,
            rate_limit_buffer_ms: 500,
            rate_limit_fallback_wait_ms: 15_000,
            retry_server_errors: false,
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let p = policy();
        assert_eq!(p.backoff_delay(0), Duration::from_millis(1_000));
        assert_eq!(p.backoff_delay(1), Duration::from_millis(2_000));
        assert_eq!(p.backoff_delay(2), Duration::from_millis(4_000));
    }

    #[test]
    fn backoff_is_capped() {
        let p = policy();
        assert_eq!(p.backoff_delay(10), Duration::from_millis(MAX_DELAY_MS));
        assert_eq!(p.backoff_delay(u32::MAX), Duration::from_millis(MAX_DELAY_MS));
    }

    #[test]
    fn zero_base_never_sleeps() {
        let p = RetryPolicy {
            backoff_base_ms: 0,
            ..policy()
        };
        assert_eq!(p.backoff_delay(3), Duration::ZERO);
    }

    #[test]
    fn rate_limit_waits_until_reset_plus_buffer() {
        let now_ms = 1_700_000_000_250;
        let wait = policy().rate_limit_wait(Some("1700000003"), now_ms);
        assert_eq!(wait, Duration::from_millis(2_750 + 500));
    }

    #[test]
    fn rate_limit_reset_in_past_waits_only_buffer() {
        let wait = policy().rate_limit_wait(Some("1000"), 1_700_000_000_000);
        assert_eq!(wait, Duration::from_millis(500));
    }

    #[test]
    fn rate_limit_without_header_uses_fallback() {
        assert_eq!(
            policy().rate_limit_wait(None, 0),
            Duration::from_millis(15_000)
        );
    }

    #[test]
    fn rate_limit_with_garbage_header_uses_fallback() {
        assert_eq!(
            policy().rate_limit_wait(Some("soon"), 0),
            Duration::from_millis(15_000)
        );
    }
}
