//! Twitch Helix client: token lifecycle, rate-limited requests, cursor
//! pagination, and normalization into `streamnet-core` records.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod normalize;
pub mod pagination;
pub mod retry;
pub mod types;

pub use auth::{AuthTokenManager, ClientCredentials};
pub use client::TwitchClient;
pub use endpoints::UserQuery;
pub use error::TwitchError;
pub use normalize::{parse_duration_secs, parse_timestamp};
pub use pagination::{MAX_PAGES, MAX_PAGE_SIZE};
pub use retry::RetryPolicy;
