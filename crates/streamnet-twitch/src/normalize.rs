//! Normalization of Helix API types into the shared domain records.
//!
//! Timestamp and duration parse failures are logged and stored as `None`;
//! they never reject the surrounding record.

use chrono::{DateTime, Utc};
use streamnet_core::{CategoryRecord, ChannelDetails, ChannelStub, VideoRecord};

use crate::types::{ApiGame, ApiStream, ApiUser, ApiVideo};

/// Parses an RFC 3339 timestamp, warning when a present value is malformed.
#[must_use]
pub fn parse_timestamp(raw: Option<&str>, field: &str) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(field, value = raw, error = %e, "unparseable timestamp; storing null");
            None
        }
    }
}

/// Parses a compact duration like `1h2m3s`, `45m`, or `12s` into seconds.
///
/// Returns `None` for empty input, unknown units, or a unit with no digits.
#[must_use]
pub fn parse_duration_secs(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let mut total: i64 = 0;
    let mut digits = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c {
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        let value: i64 = digits.parse().ok()?;
        total = total.checked_add(value.checked_mul(unit)?)?;
        digits.clear();
    }

    // Trailing digits without a unit are malformed.
    if !digits.is_empty() {
        return None;
    }
    Some(total)
}

#[must_use]
pub fn normalize_category(game: ApiGame) -> CategoryRecord {
    CategoryRecord {
        id: game.id,
        name: game.name,
    }
}

#[must_use]
pub fn normalize_stream(stream: ApiStream) -> ChannelStub {
    ChannelStub {
        id: stream.user_id,
        login: stream.user_login.to_ascii_lowercase(),
        display_name: stream.user_name,
    }
}

/// Converts a Helix user into [`ChannelDetails`]; the follower total comes
/// from a separate endpoint and is merged by the caller.
#[must_use]
pub fn normalize_user(user: ApiUser) -> ChannelDetails {
    let created_at = parse_timestamp(user.created_at.as_deref(), "users.created_at");
    ChannelDetails {
        id: user.id,
        login: user.login.to_ascii_lowercase(),
        display_name: user.display_name,
        description: user.description,
        profile_image_url: user.profile_image_url,
        broadcaster_type: user.broadcaster_type.filter(|b| !b.is_empty()),
        view_count: user.view_count,
        follower_count: None,
        created_at,
    }
}

#[must_use]
pub fn normalize_video(video: ApiVideo) -> VideoRecord {
    let created_at_api = parse_timestamp(video.created_at.as_deref(), "videos.created_at");
    let published_at = parse_timestamp(video.published_at.as_deref(), "videos.published_at");
    let duration_seconds = video.duration.as_deref().and_then(|d| {
        let parsed = parse_duration_secs(d);
        if parsed.is_none() {
            tracing::warn!(video_id = %video.id, duration = d, "unparseable video duration");
        }
        parsed
    });

    VideoRecord {
        id: video.id,
        channel_id: video.user_id,
        title: video.title,
        description: video.description,
        url: video.url,
        thumbnail_url: video.thumbnail_url,
        view_count: video.view_count,
        video_type: video.video_type,
        language: video.language,
        created_at_api,
        published_at,
        duration: video.duration,
        duration_seconds,
        muted_segments: video.muted_segments.filter(|v| !v.is_null()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_video() -> ApiVideo {
        ApiVideo {
            id: "v1".to_owned(),
            user_id: "100".to_owned(),
            title: Some("late night collab".to_owned()),
            description: None,
            url: Some("https://www.twitch.tv/videos/v1".to_owned()),
            thumbnail_url: None,
            view_count: Some(12),
            video_type: Some("archive".to_owned()),
            language: Some("en".to_owned()),
            created_at: Some("2024-05-01T10:00:00Z".to_owned()),
            published_at: Some("2024-05-01T10:00:00Z".to_owned()),
            duration: Some("1h2m3s".to_owned()),
            muted_segments: Some(serde_json::Value::Null),
        }
    }

    #[test]
    fn duration_full_form() {
        assert_eq!(parse_duration_secs("1h2m3s"), Some(3_723));
    }

    #[test]
    fn duration_partial_forms() {
        assert_eq!(parse_duration_secs("45m"), Some(2_700));
        assert_eq!(parse_duration_secs("12s"), Some(12));
        assert_eq!(parse_duration_secs("3h"), Some(10_800));
    }

    #[test]
    fn duration_rejects_garbage() {
        assert_eq!(parse_duration_secs(""), None);
        assert_eq!(parse_duration_secs("12"), None);
        assert_eq!(parse_duration_secs("1d"), None);
        assert_eq!(parse_duration_secs("h"), None);
    }

    #[test]
    fn timestamp_parses_rfc3339() {
        let ts = parse_timestamp(Some("2024-05-01T10:00:00Z"), "t").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn timestamp_bad_or_missing_is_none() {
        assert!(parse_timestamp(Some("yesterday"), "t").is_none());
        assert!(parse_timestamp(Some(""), "t").is_none());
        assert!(parse_timestamp(None, "t").is_none());
    }

    #[test]
    fn video_normalization_parses_duration_and_drops_null_segments() {
        let record = normalize_video(sample_video());
        assert_eq!(record.channel_id, "100");
        assert_eq!(record.duration_seconds, Some(3_723));
        assert_eq!(record.duration.as_deref(), Some("1h2m3s"));
        assert!(record.published_at.is_some());
        assert!(record.muted_segments.is_none());
    }

    #[test]
    fn video_with_bad_timestamp_keeps_other_fields() {
        let mut video = sample_video();
        video.published_at = Some("not-a-date".to_owned());
        let record = normalize_video(video);
        assert!(record.published_at.is_none());
        assert_eq!(record.title.as_deref(), Some("late night collab"));
    }

    #[test]
    fn user_login_is_lowercased_and_empty_type_dropped() {
        let user = ApiUser {
            id: "7".to_owned(),
            login: "SomeStreamer".to_owned(),
            display_name: Some("SomeStreamer".to_owned()),
            description: Some(String::new()),
            profile_image_url: None,
            broadcaster_type: Some(String::new()),
            view_count: Some(0),
            created_at: Some("2016-12-14T20:32:28Z".to_owned()),
        };
        let details = normalize_user(user);
        assert_eq!(details.login, "somestreamer");
        assert!(details.broadcaster_type.is_none());
        assert!(details.created_at.is_some());
        assert!(details.follower_count.is_none());
    }

    #[test]
    fn stream_becomes_stub() {
        let stub = normalize_stream(ApiStream {
            user_id: "55".to_owned(),
            user_login: "Caster".to_owned(),
            user_name: Some("Caster".to_owned()),
            game_id: Some("509658".to_owned()),
            viewer_count: Some(1_000),
        });
        assert_eq!(stub.id, "55");
        assert_eq!(stub.login, "caster");
    }
}
