//! Twitch Helix response types.
//!
//! Paged endpoints wrap records as `{"data": [...], "pagination": {"cursor": "..."}}`.
//! Records are deserialized one at a time by the paginator so a single
//! malformed entry does not sink the page.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Page envelope shared by every Helix list endpoint.
#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub pagination: Option<PageCursor>,
}

#[derive(Debug, Deserialize)]
pub struct PageCursor {
    #[serde(default)]
    pub cursor: Option<String>,
}

impl Page {
    /// The next-page cursor, treating an empty string as absent.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.pagination
            .as_ref()
            .and_then(|p| p.cursor.as_deref())
            .filter(|c| !c.is_empty())
    }
}

// ---------------------------------------------------------------------------
// games/top
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ApiGame {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub box_art_url: Option<String>,
}

// ---------------------------------------------------------------------------
// streams
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ApiStream {
    pub user_id: String,
    pub user_login: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub game_id: Option<String>,
    #[serde(default)]
    pub viewer_count: Option<i64>,
}

// ---------------------------------------------------------------------------
// users
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ApiUser {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub broadcaster_type: Option<String>,
    #[serde(default)]
    pub view_count: Option<i64>,
    /// RFC 3339 account creation time.
    #[serde(default)]
    pub created_at: Option<String>,
}

// ---------------------------------------------------------------------------
// videos
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ApiVideo {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub view_count: Option<i64>,
    #[serde(rename = "type", default)]
    pub video_type: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    /// Compact duration such as `3h8m33s`.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub muted_segments: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// channels/followers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct FollowersResponse {
    pub total: i64,
}
