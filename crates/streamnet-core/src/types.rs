use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A game/category as listed by the top-categories endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
}

/// Minimal channel identity seen by reference (e.g. a live stream) before
/// the full profile has been fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStub {
    pub id: String,
    pub login: String,
    pub display_name: Option<String>,
}

/// Full channel profile. `created_at` is the platform-reported account
/// creation time and is only ever written once by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDetails {
    pub id: String,
    pub login: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub profile_image_url: Option<String>,
    pub broadcaster_type: Option<String>,
    pub view_count: Option<i64>,
    pub follower_count: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

/// An archived broadcast. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub channel_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub view_count: Option<i64>,
    pub video_type: Option<String>,
    pub language: Option<String>,
    pub created_at_api: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    /// Raw duration string as reported, e.g. `1h2m3s`.
    pub duration: Option<String>,
    pub duration_seconds: Option<i64>,
    pub muted_segments: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionRecord {
    pub source_channel_id: String,
    pub target_channel_id: String,
    pub video_id: String,
    pub mentioned_at: DateTime<Utc>,
}

/// Order an unordered channel pair as `(low, high)`.
///
/// Returns `None` for a self-pair, which is never stored.
#[must_use]
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> Option<(&'a str, &'a str)> {
    match a.cmp(b) {
        std::cmp::Ordering::Less => Some((a, b)),
        std::cmp::Ordering::Greater => Some((b, a)),
        std::cmp::Ordering::Equal => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_orders_low_first() {
        assert_eq!(canonical_pair("200", "100"), Some(("100", "200")));
        assert_eq!(canonical_pair("100", "200"), Some(("100", "200")));
    }

    #[test]
    fn canonical_pair_rejects_self_pair() {
        assert_eq!(canonical_pair("42", "42"), None);
    }

    #[test]
    fn canonical_pair_is_lexical() {
        // ids are opaque strings; "9" sorts after "10"
        assert_eq!(canonical_pair("9", "10"), Some(("10", "9")));
    }
}
