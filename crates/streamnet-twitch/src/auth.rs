//! App access token lifecycle (client-credentials grant).

use std::time::{Duration, Instant};

use reqwest::Client;

use crate::error::TwitchError;
use crate::types::TokenResponse;

/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3_600;
const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(300);
const DEFAULT_RETRY_PAUSE: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Owns the bearer token and its expiry.
///
/// States: no token, a token valid until `expires_at`, or an expired token
/// (either naturally or via [`AuthTokenManager::invalidate`]). Only
/// [`AuthTokenManager::acquire_valid`] talks to the network.
pub struct AuthTokenManager {
    http: Client,
    auth_url: String,
    credentials: ClientCredentials,
    safety_margin: Duration,
    retry_pause: Duration,
    cached: Option<CachedToken>,
}

impl AuthTokenManager {
    #[must_use]
    pub fn new(http: Client, auth_url: &str, credentials: ClientCredentials) -> Self {
        Self {
            http,
            auth_url: auth_url.to_owned(),
            credentials,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            retry_pause: DEFAULT_RETRY_PAUSE,
            cached: None,
        }
    }

    /// Seconds shaved off the reported lifetime so a token is never used at
    /// the edge of expiry.
    #[must_use]
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Pause before the single re-attempt of a failed exchange.
    #[must_use]
    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    pub(crate) fn set_safety_margin(&mut self, margin: Duration) {
        self.safety_margin = margin;
    }

    pub(crate) fn set_retry_pause(&mut self, pause: Duration) {
        self.retry_pause = pause;
    }

    /// `true` when a token is held and has not reached `expires_at`.
    #[must_use]
    pub fn has_valid_token(&self) -> bool {
        self.cached
            .as_ref()
            .is_some_and(|t| Instant::now() < t.expires_at)
    }

    /// Returns a usable bearer token, exchanging credentials if needed.
    ///
    /// A failed exchange clears any held token, waits `retry_pause`, and is
    /// tried once more before giving up.
    ///
    /// # Errors
    ///
    /// Returns [`TwitchError::Auth`] if both exchange attempts fail.
    pub async fn acquire_valid(&mut self) -> Result<String, TwitchError> {
        if let Some(token) = self.cached.as_ref().filter(|t| Instant::now() < t.expires_at) {
            return Ok(token.access_token.clone());
        }

        match self.exchange().await {
            Ok(token) => Ok(token),
            Err(first) => {
                self.cached = None;
                tracing::warn!(
                    error = %first,
                    pause_ms = u64::try_from(self.retry_pause.as_millis()).unwrap_or(u64::MAX),
                    "token exchange failed; retrying once"
                );
                tokio::time::sleep(self.retry_pause).await;
                self.exchange().await.map_err(|second| {
                    self.cached = None;
                    second
                })
            }
        }
    }

    /// Forces the held token into the expired state.
    pub fn invalidate(&mut self) {
        if let Some(token) = self.cached.as_mut() {
            token.expires_at = Instant::now();
        }
    }

    /// Expires the held token only if it is `rejected`. A token obtained
    /// after `rejected` was handed out is left alone.
    pub fn invalidate_token(&mut self, rejected: &str) {
        if self
            .cached
            .as_ref()
            .is_some_and(|token| token.access_token == rejected)
        {
            self.invalidate();
        }
    }

    async fn exchange(&mut self) -> Result<String, TwitchError> {
        let form = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];
        let response = self
            .http
            .post(&self.auth_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| TwitchError::Auth(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TwitchError::Auth(format!("reading response failed: {e}")))?;
        if !status.is_success() {
            return Err(TwitchError::Auth(format!("status {}: {body}", status.as_u16())));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| TwitchError::Auth(format!("malformed token response: {e}")))?;
        if parsed.access_token.is_empty() {
            return Err(TwitchError::Auth("empty access_token".to_owned()));
        }

        let ttl = Duration::from_secs(parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS));
        let lifetime = ttl.saturating_sub(self.safety_margin);
        tracing::debug!(
            expires_in_secs = ttl.as_secs(),
            usable_secs = lifetime.as_secs(),
            "obtained app access token"
        );

        self.cached = Some(CachedToken {
            access_token: parsed.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(parsed.access_token)
    }
}
