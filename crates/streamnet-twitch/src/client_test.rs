use super::*;

fn test_client(base_url: &str) -> TwitchClient {
    let credentials = ClientCredentials {
        client_id: "cid".to_owned(),
        client_secret: "secret".to_owned(),
    };
    TwitchClient::with_base_urls(
        credentials,
        30,
        RetryPolicy::default(),
        "https://id.twitch.tv/oauth2/token",
        base_url,
    )
    .expect("client construction should not fail")
}

#[test]
fn build_url_keeps_base_path_segment() {
    let client = test_client("https://api.twitch.tv/helix");
    let url = client
        .build_url("games/top", &[("first", "20".to_owned())])
        .unwrap();
    assert_eq!(url.as_str(), "https://api.twitch.tv/helix/games/top?first=20");
}

#[test]
fn build_url_strips_trailing_slash() {
    let client = test_client("https://api.twitch.tv/helix/");
    let url = client.build_url("/streams", &[]).unwrap();
    assert_eq!(url.as_str(), "https://api.twitch.tv/helix/streams");
}

#[test]
fn build_url_repeats_keys_in_order() {
    let client = test_client("https://api.twitch.tv/helix");
    let url = client
        .build_url(
            "users",
            &[("login", "alpha".to_owned()), ("login", "beta".to_owned())],
        )
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://api.twitch.tv/helix/users?login=alpha&login=beta"
    );
}

#[test]
fn build_url_encodes_cursor() {
    let client = test_client("https://api.twitch.tv/helix");
    let url = client
        .build_url("videos", &[("after", "eyJi Ijo=".to_owned())])
        .unwrap();
    assert!(
        url.as_str().contains("after=eyJi+Ijo%3D"),
        "cursor should be percent-encoded: {url}"
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    let credentials = ClientCredentials {
        client_id: "cid".to_owned(),
        client_secret: "secret".to_owned(),
    };
    let result = TwitchClient::with_base_urls(
        credentials,
        30,
        RetryPolicy::default(),
        "https://id.twitch.tv/oauth2/token",
        "not a url",
    );
    assert!(matches!(result, Err(TwitchError::InvalidUrl { .. })));
}

#[test]
fn credentials_debug_redacts_secret() {
    let credentials = ClientCredentials {
        client_id: "cid".to_owned(),
        client_secret: "hunter2".to_owned(),
    };
    let rendered = format!("{credentials:?}");
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("cid"));
}
