use thiserror::Error;

/// Errors returned by the Twitch Helix client.
///
/// Rate limits (429) are absorbed inside the client and only surface as
/// [`TwitchError::RetriesExhausted`] once the retry budget is spent.
#[derive(Debug, Error)]
pub enum TwitchError {
    /// The client-credentials exchange failed, including its one re-attempt.
    #[error("token exchange failed: {0}")]
    Auth(String),

    /// Timeouts or connection failures that persisted through every retry.
    #[error("request to {context} failed after retries: {source}")]
    Transient {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-retryable transport failure (TLS, malformed response, builder error).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 4xx other than 401/429.
    #[error("client error {status} from {path}: {body}")]
    Client {
        status: u16,
        path: String,
        body: String,
    },

    /// 5xx when server errors are not retried.
    #[error("server error {status} from {path}: {body}")]
    Server {
        status: u16,
        path: String,
        body: String,
    },

    /// A 401 returned again right after the token was refreshed.
    #[error("unauthorized on {path} after token refresh: {body}")]
    Unauthorized { path: String, body: String },

    #[error("retries exhausted for {path} (last status {status}): {body}")]
    RetriesExhausted {
        status: u16,
        path: String,
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("pagination limit reached for {path}: exceeded {max_pages} pages")]
    PaginationLimit { path: String, max_pages: usize },
}
