use super::mentions::{process_video, VideoOutcome};
use super::*;

use chrono::{DateTime, TimeZone, Utc};
use streamnet_core::{ChannelStub, Environment, VideoRecord};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: Option<&MockServer>) -> AppConfig {
    let base = server.map_or_else(|| "http://127.0.0.1:9".to_string(), MockServer::uri);
    AppConfig {
        database_url: "postgres://unused".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        twitch_client_id: "test-client".to_string(),
        twitch_client_secret: "test-secret".to_string(),
        twitch_auth_url: format!("{base}/oauth2/token"),
        twitch_api_base_url: format!("{base}/helix"),
        db_max_connections: 5,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
        request_timeout_secs: 5,
        max_retries: 1,
        retry_backoff_base_ms: 0,
        rate_limit_buffer_ms: 0,
        rate_limit_fallback_wait_ms: 0,
        retry_server_errors: false,
        token_safety_margin_secs: 0,
        inter_page_delay_ms: 0,
        details_max_age_days: 7,
        videos_max_age_days: 2,
        top_categories: 50,
        streams_per_category: 50,
        refresh_cycle_channels: 500,
        videos_per_channel: 100,
        mention_batch_size: 500,
        mention_max_batches: 100,
        max_concurrent_channels: 2,
        fetch_videos_after: None,
    }
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

async fn seed_channels(pool: &sqlx::PgPool, channels: &[(&str, &str)]) {
    let stubs: Vec<ChannelStub> = channels
        .iter()
        .map(|(id, login)| ChannelStub {
            id: (*id).to_string(),
            login: (*login).to_string(),
            display_name: None,
        })
        .collect();
    streamnet_db::observe_channel_stubs(pool, &stubs)
        .await
        .expect("seed channels failed");
}

fn video(id: &str, channel_id: &str, title: &str, published_at: Option<DateTime<Utc>>) -> VideoRecord {
    VideoRecord {
        id: id.to_string(),
        channel_id: channel_id.to_string(),
        title: Some(title.to_string()),
        description: None,
        url: None,
        thumbnail_url: None,
        view_count: None,
        video_type: Some("archive".to_string()),
        language: None,
        created_at_api: None,
        published_at,
        duration: Some("30m0s".to_string()),
        duration_seconds: Some(1800),
        muted_segments: None,
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

#[test]
fn tally_with_partial_failure_is_ok() {
    let mut tally = Tally::default();
    tally.success();
    tally.failures(3);
    let tally = tally.finish("channels").expect("partial failure is not an error");
    assert_eq!(tally.total(), 4);
}

#[test]
fn tally_with_only_failures_is_an_error() {
    let mut tally = Tally::default();
    tally.failures(2);
    let err = tally.finish("channels").expect_err("all failed should error");
    assert!(err.to_string().contains("all 2 channels failed"), "got: {err}");
}

#[test]
fn empty_tally_is_ok() {
    assert!(Tally::default().finish("videos").is_ok());
}

// ---------------------------------------------------------------------------
// Mentions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn mention_pass_builds_edges_and_marks_videos(pool: sqlx::PgPool) {
    seed_channels(&pool, &[("100", "alpha"), ("200", "beta"), ("300", "gamma")]).await;
    streamnet_db::observe_videos(
        &pool,
        &[
            video("v1", "100", "with @Beta, @gamma, @alpha and @nobody_here", Some(ts(2))),
            video("v2", "200", "thanks @ALPHA", Some(ts(4))),
            video("v3", "300", "solo stream", None),
        ],
    )
    .await
    .expect("seed videos failed");

    run_crawl_mentions(&pool, &test_config(None), Some(2), None)
        .await
        .expect("mention pass failed");

    let counts = streamnet_db::table_counts(&pool).await.expect("counts");
    assert_eq!(counts.unprocessed_videos, 0);
    assert_eq!(counts.mentions, 3);
    assert_eq!(counts.collaborations, 2);

    let edge = streamnet_db::get_collaboration(&pool, "100", "200")
        .await
        .expect("get")
        .expect("edge missing");
    assert_eq!(edge.collaboration_count, 2);
    assert_eq!(edge.total_duration_seconds, 3600);
    assert_eq!(edge.first_collaboration_at, Some(ts(2)));
    assert_eq!(edge.last_collaboration_at, Some(ts(4)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn process_video_falls_back_to_fetched_at(pool: sqlx::PgPool) {
    seed_channels(&pool, &[("100", "alpha"), ("200", "beta")]).await;
    streamnet_db::observe_videos(&pool, &[video("v1", "100", "hi @beta", None)])
        .await
        .expect("seed video failed");
    let row = streamnet_db::get_video(&pool, "v1")
        .await
        .expect("get")
        .expect("missing");

    let outcome = process_video(&pool, &row).await.expect("process failed");
    assert_eq!(outcome, VideoOutcome::Recorded(1));

    let mentions = streamnet_db::list_mentions_for_video(&pool, "v1")
        .await
        .expect("list");
    assert_eq!(mentions.len(), 1);
    assert_eq!(mentions[0].mentioned_at, row.fetched_at);

    let again = process_video(&pool, &row).await.expect("process failed");
    assert_eq!(again, VideoOutcome::AlreadyProcessed);
}

#[sqlx::test(migrations = "../../migrations")]
async fn self_mention_only_marks_video_without_edges(pool: sqlx::PgPool) {
    seed_channels(&pool, &[("100", "alpha")]).await;
    streamnet_db::observe_videos(&pool, &[video("v1", "100", "I am @Alpha", Some(ts(2)))])
        .await
        .expect("seed video failed");
    let row = streamnet_db::get_video(&pool, "v1")
        .await
        .expect("get")
        .expect("missing");

    let outcome = process_video(&pool, &row).await.expect("process failed");
    assert_eq!(outcome, VideoOutcome::Recorded(0));

    let counts = streamnet_db::table_counts(&pool).await.expect("counts");
    assert_eq!(counts.mentions, 0);
    assert_eq!(counts.collaborations, 0);
    assert_eq!(counts.unprocessed_videos, 0);
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn category_pass_records_stubs_and_skips_failed_scan(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/helix/games/top"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                { "id": "1", "name": "Game One" },
                { "id": "2", "name": "Game Two" }
            ],
            "pagination": {}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .and(query_param("game_id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                { "user_id": "100", "user_login": "Alpha", "user_name": "Alpha" },
                { "user_id": "200", "user_login": "beta" }
            ],
            "pagination": {}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .and(query_param("game_id", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let config = test_config(Some(&server));
    let client = TwitchClient::from_app_config(&config).expect("client");

    run_crawl_categories(&pool, &client, &config, Some(2), false)
        .await
        .expect("category pass failed");

    let scanned = streamnet_db::get_category(&pool, "1")
        .await
        .expect("get")
        .expect("missing");
    assert!(scanned.last_scanned.is_some());
    let failed = streamnet_db::get_category(&pool, "2")
        .await
        .expect("get")
        .expect("missing");
    assert!(failed.last_scanned.is_none(), "failed scan must not be stamped");

    let alpha = streamnet_db::get_channel(&pool, "100")
        .await
        .expect("get")
        .expect("missing");
    assert_eq!(alpha.login, "alpha");
    assert_eq!(streamnet_db::table_counts(&pool).await.expect("counts").channels, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn category_dry_run_writes_nothing(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/helix/games/top"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "id": "1", "name": "Game One" }],
            "pagination": {}
        })))
        .mount(&server)
        .await;

    let config = test_config(Some(&server));
    let client = TwitchClient::from_app_config(&config).expect("client");

    run_crawl_categories(&pool, &client, &config, Some(1), true)
        .await
        .expect("dry run failed");

    assert_eq!(streamnet_db::table_counts(&pool).await.expect("counts").categories, 0);
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn channel_pass_refreshes_details_and_videos_once(pool: sqlx::PgPool) {
    seed_channels(&pool, &[("100", "alpha")]).await;

    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .and(query_param("id", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "id": "100",
                "login": "alpha",
                "display_name": "Alpha",
                "description": "variety",
                "broadcaster_type": "affiliate",
                "view_count": 5,
                "created_at": "2020-01-01T00:00:00Z"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/channels/followers"))
        .and(query_param("broadcaster_id", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total": 42,
            "data": [],
            "pagination": {}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/videos"))
        .and(query_param("user_id", "100"))
        .and(query_param("type", "archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {
                    "id": "v2",
                    "user_id": "100",
                    "title": "with @beta",
                    "published_at": "2024-03-04T00:00:00Z",
                    "duration": "1h0m0s",
                    "type": "archive"
                },
                {
                    "id": "v1",
                    "user_id": "100",
                    "title": "first",
                    "published_at": "2024-03-02T00:00:00Z",
                    "duration": "2m3s",
                    "type": "archive"
                }
            ],
            "pagination": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(Some(&server));
    let client = TwitchClient::from_app_config(&config).expect("client");

    run_crawl_channels(&pool, &client, &config, None)
        .await
        .expect("channel pass failed");

    let channel = streamnet_db::get_channel(&pool, "100")
        .await
        .expect("get")
        .expect("missing");
    assert_eq!(channel.follower_count, Some(42));
    assert_eq!(channel.broadcaster_type.as_deref(), Some("affiliate"));
    assert!(channel.last_fetched_details.is_some());
    assert!(channel.last_fetched_videos.is_some());

    let v1 = streamnet_db::get_video(&pool, "v1")
        .await
        .expect("get")
        .expect("missing");
    assert_eq!(v1.duration_seconds, Some(123));

    // Everything was just refreshed, so a second pass makes no requests.
    run_crawl_channels(&pool, &client, &config, None)
        .await
        .expect("second pass failed");
}
