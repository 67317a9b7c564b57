//! Rate-limited HTTP client for the Twitch Helix API.
//!
//! Every call obtains a token from the shared [`AuthTokenManager`], sends the
//! `Client-Id` and bearer headers, and applies the retry policy for 429, 401,
//! timeouts and (optionally) 5xx responses. Use [`TwitchClient::from_app_config`]
//! for production or [`TwitchClient::with_base_urls`] to point at a mock
//! server in tests.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method, StatusCode, Url};
use streamnet_core::AppConfig;
use tokio::sync::Mutex;

use crate::auth::{AuthTokenManager, ClientCredentials};
use crate::error::TwitchError;
use crate::retry::{RetryPolicy, RATELIMIT_REMAINING_HEADER, RATELIMIT_RESET_HEADER};

const DEFAULT_AUTH_URL: &str = "https://id.twitch.tv/oauth2/token";
const DEFAULT_API_BASE_URL: &str = "https://api.twitch.tv/helix";
const USER_AGENT: &str = "streamnet/0.1 (network-crawler)";

pub struct TwitchClient {
    http: Client,
    base_url: Url,
    client_id: String,
    auth: Mutex<AuthTokenManager>,
    policy: RetryPolicy,
    pub(crate) inter_page_delay: Duration,
}

impl TwitchClient {
    /// Creates a client pointed at the production Helix API.
    ///
    /// # Errors
    ///
    /// Returns [`TwitchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        credentials: ClientCredentials,
        timeout_secs: u64,
        policy: RetryPolicy,
    ) -> Result<Self, TwitchError> {
        Self::with_base_urls(
            credentials,
            timeout_secs,
            policy,
            DEFAULT_AUTH_URL,
            DEFAULT_API_BASE_URL,
        )
    }

    /// Builds a fully configured client from the loaded application config.
    ///
    /// # Errors
    ///
    /// Returns [`TwitchError::Http`] if the HTTP client cannot be built, or
    /// [`TwitchError::InvalidUrl`] if the configured API base URL is invalid.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, TwitchError> {
        let credentials = ClientCredentials {
            client_id: config.twitch_client_id.clone(),
            client_secret: config.twitch_client_secret.clone(),
        };
        let client = Self::with_base_urls(
            credentials,
            config.request_timeout_secs,
            RetryPolicy::from_app_config(config),
            &config.twitch_auth_url,
            &config.twitch_api_base_url,
        )?
        .with_inter_page_delay(Duration::from_millis(config.inter_page_delay_ms))
        .with_token_safety_margin(Duration::from_secs(config.token_safety_margin_secs));
        Ok(client)
    }

    /// Creates a client with custom auth and API base URLs (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`TwitchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`TwitchError::InvalidUrl`] if
    /// `api_base_url` is not a valid URL.
    pub fn with_base_urls(
        credentials: ClientCredentials,
        timeout_secs: u64,
        policy: RetryPolicy,
        auth_url: &str,
        api_base_url: &str,
    ) -> Result<Self, TwitchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        // Exactly one trailing slash so `Url::join` appends the endpoint path
        // instead of replacing the last segment (`/helix`).
        let normalised = format!("{}/", api_base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| TwitchError::InvalidUrl {
            url: api_base_url.to_owned(),
            reason: e.to_string(),
        })?;

        let client_id = credentials.client_id.clone();
        let auth = AuthTokenManager::new(http.clone(), auth_url, credentials);

        Ok(Self {
            http,
            base_url,
            client_id,
            auth: Mutex::new(auth),
            policy,
            inter_page_delay: Duration::ZERO,
        })
    }

    /// Delay inserted between consecutive page requests.
    #[must_use]
    pub fn with_inter_page_delay(mut self, delay: Duration) -> Self {
        self.inter_page_delay = delay;
        self
    }

    #[must_use]
    pub fn with_token_safety_margin(mut self, margin: Duration) -> Self {
        self.auth.get_mut().set_safety_margin(margin);
        self
    }

    /// Pause before re-attempting a failed token exchange.
    #[must_use]
    pub fn with_auth_retry_pause(mut self, pause: Duration) -> Self {
        self.auth.get_mut().set_retry_pause(pause);
        self
    }

    /// Issues one logical API call and returns the parsed JSON body.
    ///
    /// # Errors
    ///
    /// - [`TwitchError::Auth`] if no token can be obtained.
    /// - [`TwitchError::Unauthorized`] on a 401 right after a token refresh.
    /// - [`TwitchError::Client`] on any other 4xx.
    /// - [`TwitchError::Server`] on 5xx when server errors are not retried.
    /// - [`TwitchError::RetriesExhausted`] when 429/401/5xx retries run out.
    /// - [`TwitchError::Transient`] when timeouts persist through every retry.
    /// - [`TwitchError::Http`] on other transport failures.
    /// - [`TwitchError::Deserialize`] if a 2xx body is not valid JSON.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, TwitchError> {
        let url = self.build_url(path, params)?;
        let max_retries = self.policy.max_retries;
        let mut attempt = 0u32;
        let mut refreshed_after_401 = false;

        loop {
            let token = self.auth.lock().await.acquire_valid().await?;

            let sent = self
                .http
                .request(method.clone(), url.clone())
                .header("Client-Id", &self.client_id)
                .bearer_auth(&token)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(err) if err.is_timeout() || err.is_connect() => {
                    if attempt >= max_retries {
                        return Err(TwitchError::Transient {
                            context: path.to_owned(),
                            source: err,
                        });
                    }
                    let delay = self.policy.backoff_delay(attempt);
                    attempt += 1;
                    tracing::warn!(
                        path,
                        attempt,
                        max_retries,
                        delay_ms = millis(delay),
                        error = %err,
                        "Helix transient error; retrying after back-off"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(err) => return Err(TwitchError::Http(err)),
            };

            let status = response.status();
            if let Some(remaining) = header_str(&response, RATELIMIT_REMAINING_HEADER) {
                tracing::debug!(path, remaining, "rate limit remaining");
            }

            if status.is_success() {
                let body = response.text().await?;
                return serde_json::from_str(&body).map_err(|e| TwitchError::Deserialize {
                    context: path.to_owned(),
                    source: e,
                });
            }

            let reset = header_str(&response, RATELIMIT_RESET_HEADER).map(str::to_owned);
            let body = response.text().await.unwrap_or_default();

            if status == StatusCode::UNAUTHORIZED {
                if refreshed_after_401 {
                    return Err(TwitchError::Unauthorized {
                        path: path.to_owned(),
                        body,
                    });
                }
                if attempt >= max_retries {
                    return Err(exhausted(status, path, body));
                }
                attempt += 1;
                refreshed_after_401 = true;
                tracing::warn!(path, attempt, "Helix 401; invalidating token and retrying");
                self.auth.lock().await.invalidate_token(&token);
                continue;
            }
            refreshed_after_401 = false;

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= max_retries {
                    return Err(exhausted(status, path, body));
                }
                let wait = self
                    .policy
                    .rate_limit_wait(reset.as_deref(), Utc::now().timestamp_millis());
                attempt += 1;
                tracing::warn!(
                    path,
                    attempt,
                    max_retries,
                    wait_ms = millis(wait),
                    reset = reset.as_deref().unwrap_or("absent"),
                    "Helix rate limited; sleeping until reset"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            if status.is_server_error() {
                if !self.policy.retry_server_errors {
                    return Err(TwitchError::Server {
                        status: status.as_u16(),
                        path: path.to_owned(),
                        body,
                    });
                }
                if attempt >= max_retries {
                    return Err(exhausted(status, path, body));
                }
                let delay = self.policy.backoff_delay(attempt);
                attempt += 1;
                tracing::warn!(
                    path,
                    status = status.as_u16(),
                    attempt,
                    max_retries,
                    delay_ms = millis(delay),
                    "Helix server error; retrying after back-off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(TwitchError::Client {
                status: status.as_u16(),
                path: path.to_owned(),
                body,
            });
        }
    }

    /// Joins `path` onto the API base and appends percent-encoded query pairs.
    /// Repeated keys (e.g. `id=1&id=2`) are preserved in order.
    fn build_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, TwitchError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TwitchError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

fn header_str<'r>(response: &'r reqwest::Response, name: &str) -> Option<&'r str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn exhausted(status: StatusCode, path: &str, body: String) -> TwitchError {
    TwitchError::RetriesExhausted {
        status: status.as_u16(),
        path: path.to_owned(),
        body,
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
