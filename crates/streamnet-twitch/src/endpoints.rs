//! Typed Helix endpoints used by the crawler.

use chrono::{DateTime, Utc};
use reqwest::Method;
use streamnet_core::{CategoryRecord, ChannelDetails, ChannelStub, VideoRecord};

use crate::client::TwitchClient;
use crate::error::TwitchError;
use crate::normalize::{
    normalize_category, normalize_stream, normalize_user, normalize_video, parse_timestamp,
};
use crate::pagination::MAX_PAGE_SIZE;
use crate::types::{ApiGame, ApiStream, ApiUser, ApiVideo, FollowersResponse, Page};

/// Identifiers for a `users` lookup. Helix accepts ids or logins, never both,
/// and at most 100 per request.
#[derive(Debug, Clone, Copy)]
pub enum UserQuery<'a> {
    Ids(&'a [String]),
    Logins(&'a [String]),
}

impl<'a> UserQuery<'a> {
    fn key_and_values(self) -> (&'static str, &'a [String]) {
        match self {
            UserQuery::Ids(ids) => ("id", ids),
            UserQuery::Logins(logins) => ("login", logins),
        }
    }
}

impl TwitchClient {
    /// Top categories by current viewership.
    ///
    /// # Errors
    ///
    /// Propagates [`TwitchClient::fetch_pages`] errors.
    pub async fn get_top_categories(
        &self,
        limit: usize,
    ) -> Result<Vec<CategoryRecord>, TwitchError> {
        let games: Vec<ApiGame> = self
            .fetch_pages("games/top", &[], MAX_PAGE_SIZE, limit, |_| false)
            .await?;
        Ok(games.into_iter().map(normalize_category).collect())
    }

    /// Live streams in a category, reduced to the broadcasting channel.
    /// A channel appears once even if the API repeats it across pages.
    ///
    /// # Errors
    ///
    /// Propagates [`TwitchClient::fetch_pages`] errors.
    pub async fn get_streams_for_category(
        &self,
        category_id: &str,
        limit: usize,
    ) -> Result<Vec<ChannelStub>, TwitchError> {
        let params = [("game_id", category_id.to_owned())];
        let streams: Vec<ApiStream> = self
            .fetch_pages("streams", &params, MAX_PAGE_SIZE, limit, |_| false)
            .await?;

        let mut seen = std::collections::HashSet::new();
        Ok(streams
            .into_iter()
            .map(normalize_stream)
            .filter(|stub| seen.insert(stub.id.clone()))
            .collect())
    }

    /// Full profiles for up to 100 channels. `follower_count` is left `None`.
    ///
    /// # Errors
    ///
    /// - [`TwitchError::InvalidRequest`] for an empty query or more than 100 values.
    /// - Propagates [`TwitchClient::execute`] errors.
    /// - [`TwitchError::Deserialize`] if the envelope is malformed.
    pub async fn get_users(
        &self,
        query: UserQuery<'_>,
    ) -> Result<Vec<ChannelDetails>, TwitchError> {
        let (key, values) = query.key_and_values();
        if values.is_empty() || values.len() > MAX_PAGE_SIZE {
            return Err(TwitchError::InvalidRequest(format!(
                "users lookup takes 1-{MAX_PAGE_SIZE} {key} values, got {}",
                values.len()
            )));
        }

        let params: Vec<(&str, String)> = values.iter().map(|v| (key, v.clone())).collect();
        let body = self.execute(Method::GET, "users", &params).await?;
        let page: Page = serde_json::from_value(body).map_err(|e| TwitchError::Deserialize {
            context: "users".to_owned(),
            source: e,
        })?;

        Ok(page
            .data
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<ApiUser>(raw) {
                Ok(user) => Some(normalize_user(user)),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed user record");
                    None
                }
            })
            .collect())
    }

    /// Archived broadcasts for a channel, newest first.
    ///
    /// When `cutoff` is set, fetching stops at the first video published at or
    /// before it. Videos whose publish time cannot be parsed never trigger the
    /// stop.
    ///
    /// # Errors
    ///
    /// Propagates [`TwitchClient::fetch_pages`] errors.
    pub async fn get_channel_videos(
        &self,
        channel_id: &str,
        limit: usize,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<Vec<VideoRecord>, TwitchError> {
        let params = [
            ("user_id", channel_id.to_owned()),
            ("type", "archive".to_owned()),
            ("sort", "time".to_owned()),
        ];
        let videos: Vec<ApiVideo> = self
            .fetch_pages("videos", &params, MAX_PAGE_SIZE, limit, |video: &ApiVideo| {
                is_at_or_before(video, cutoff)
            })
            .await?;
        Ok(videos.into_iter().map(normalize_video).collect())
    }

    /// Total follower count for a channel.
    ///
    /// # Errors
    ///
    /// Propagates [`TwitchClient::execute`] errors, or
    /// [`TwitchError::Deserialize`] if `total` is missing.
    pub async fn get_follower_count(&self, channel_id: &str) -> Result<i64, TwitchError> {
        let params = [
            ("broadcaster_id", channel_id.to_owned()),
            ("first", "1".to_owned()),
        ];
        let body = self
            .execute(Method::GET, "channels/followers", &params)
            .await?;
        let parsed: FollowersResponse =
            serde_json::from_value(body).map_err(|e| TwitchError::Deserialize {
                context: format!("channels/followers(broadcaster_id={channel_id})"),
                source: e,
            })?;
        Ok(parsed.total)
    }
}

fn is_at_or_before(video: &ApiVideo, cutoff: Option<DateTime<Utc>>) -> bool {
    let Some(cutoff) = cutoff else {
        return false;
    };
    parse_timestamp(video.published_at.as_deref(), "published_at")
        .is_some_and(|published| published <= cutoff)
}
