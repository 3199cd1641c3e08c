#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Endpoint services against a mock lichess server.

use futures_util::StreamExt;
use httpmock::prelude::*;
use lichess_http::ExecutorBuilder;
use lichess_sdk::{Client, ClientConfig, ClientError, ListOptions, PageCursor, PagerConfig};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn client(server: &MockServer) -> Client {
    Client::with_config(ClientConfig::for_testing(server.url("/"))).unwrap()
}

fn authed_client(server: &MockServer) -> Client {
    let executor = ExecutorBuilder::with_config(ClientConfig::for_testing(server.url("/")))
        .api_token("lip_test")
        .build()
        .unwrap();
    Client::from_executor(executor)
}

fn game_line(id: &str, created_at: i64) -> String {
    format!("{}\n", json!({"id": id, "createdAt": created_at, "status": "mate"}))
}

#[tokio::test]
async fn users_get_decodes_profile() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/user/thibault")
            .header("accept", "application/json");
        then.status(200).json_body(json!({
            "id": "thibault",
            "username": "thibault",
            "online": true,
            "count": {"all": 12, "win": 7}
        }));
    });

    let cancel = CancellationToken::new();
    let user = client(&server).users().get(&cancel, "thibault").await.unwrap();

    assert_eq!(user.username, "thibault");
    assert!(user.online);
    assert_eq!(user.stats.all, 12);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn users_get_unknown_user_is_status_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/user/nobody");
        then.status(404)
            .header("content-type", "application/json")
            .body(r#"{"error":"Not found"}"#);
    });

    let cancel = CancellationToken::new();
    let err = client(&server)
        .users()
        .get(&cancel, "nobody")
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert!(!err.is_rate_limited());
    assert!(err.to_string().ends_with("/api/user/nobody: 404 Not found"));
}

#[tokio::test]
async fn account_endpoints_send_bearer_token() {
    let server = MockServer::start();
    let profile = server.mock(|when, then| {
        when.method(GET)
            .path("/api/account")
            .header("authorization", "Bearer lip_test");
        then.status(200).json_body(json!({"id": "me", "username": "Me"}));
    });
    let email = server.mock(|when, then| {
        when.method(GET)
            .path("/api/account/email")
            .header("authorization", "Bearer lip_test");
        then.status(200).json_body(json!({"email": "me@example.org"}));
    });
    let prefs = server.mock(|when, then| {
        when.method(GET)
            .path("/api/account/preferences")
            .header("authorization", "Bearer lip_test");
        then.status(200)
            .json_body(json!({"prefs": {"dark": true, "pieceSet": "cburnett"}, "language": "en-US"}));
    });

    let client = authed_client(&server);
    let account = client.account();
    let cancel = CancellationToken::new();

    assert_eq!(account.profile(&cancel).await.unwrap().username, "Me");
    assert_eq!(account.email(&cancel).await.unwrap(), "me@example.org");
    let preferences = account.preferences(&cancel).await.unwrap();
    assert!(preferences.dark);
    assert_eq!(preferences.piece_set, "cburnett");

    assert_eq!(profile.calls(), 1);
    assert_eq!(email.calls(), 1);
    assert_eq!(prefs.calls(), 1);
}

#[tokio::test]
async fn account_without_token_is_unauthorized() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/account/email");
        then.status(401).json_body(json!({"error": "No such token"}));
    });

    let cancel = CancellationToken::new();
    let err = client(&server).account().email(&cancel).await.unwrap_err();

    assert_eq!(err.status_error().unwrap().message, "No such token");
}

#[tokio::test]
async fn games_get_exports_single_game() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/game/export/q7ZvsdUF")
            .query_param("pgnInJson", "true")
            .header("accept", "application/json");
        then.status(200).json_body(json!({
            "id": "q7ZvsdUF",
            "createdAt": 1_514_505_150_384_i64,
            "pgn": "[Event \"Rated Blitz game\"]\n\n1. d4 d5 *"
        }));
    });

    let cancel = CancellationToken::new();
    let game = client(&server).games().get(&cancel, "q7ZvsdUF").await.unwrap();

    assert_eq!(game.id, "q7ZvsdUF");
    assert!(game.pgn.unwrap().starts_with("[Event"));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn games_list_reads_ndjson() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/games/user/thibault")
            .query_param("max", "3")
            .query_param("rated", "true")
            .query_param("pgnInJson", "true")
            .header("accept", "application/x-ndjson");
        then.status(200)
            .header("content-type", "application/x-ndjson")
            .body(game_line("a", 3) + &game_line("b", 2) + &game_line("c", 1));
    });

    let cancel = CancellationToken::new();
    let options = ListOptions {
        max: Some(3),
        rated: Some(true),
        ..ListOptions::default()
    };
    let games = client(&server)
        .games()
        .list(&cancel, "thibault", &options)
        .await
        .unwrap();

    assert_eq!(
        games.iter().map(|g| g.id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn games_all_walks_every_page_once() {
    let server = MockServer::start();
    let page1 = server.mock(|when, then| {
        when.method(GET)
            .path("/api/games/user/thibault")
            .query_param("since", "0")
            .query_param("max", "2")
            .query_param("sort", "dateAsc");
        then.status(200)
            .body(game_line("g1", 100) + &game_line("g2", 200));
    });
    let page2 = server.mock(|when, then| {
        when.method(GET)
            .path("/api/games/user/thibault")
            .query_param("since", "201")
            .query_param("max", "2");
        then.status(200)
            .body(game_line("g3", 300) + &game_line("g4", 400));
    });
    let page3 = server.mock(|when, then| {
        when.method(GET)
            .path("/api/games/user/thibault")
            .query_param("since", "401")
            .query_param("max", "2");
        then.status(200).body(game_line("g5", 500));
    });

    let cancel = CancellationToken::new();
    let client = client(&server);
    let games: Vec<_> = client
        .games()
        .all_with(&cancel, "thibault", PagerConfig::default().page_size(2))
        .collect()
        .await;

    let ids: Vec<_> = games
        .into_iter()
        .map(|g| g.unwrap().id)
        .collect();
    assert_eq!(ids, vec!["g1", "g2", "g3", "g4", "g5"]);
    assert_eq!(page1.calls(), 1);
    assert_eq!(page2.calls(), 1);
    assert_eq!(page3.calls(), 1);
}

#[tokio::test]
async fn games_all_advances_past_start_timestamp() {
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method(GET)
            .path("/api/games/user/thibault")
            .query_param("since", "1000")
            .query_param("max", "1");
        then.status(200).body(game_line("a", 1000));
    });
    let second = server.mock(|when, then| {
        when.method(GET)
            .path("/api/games/user/thibault")
            .query_param("since", "1001")
            .query_param("max", "1");
        then.status(200).body("");
    });

    let cancel = CancellationToken::new();
    let client = client(&server);
    let config = PagerConfig::default()
        .page_size(1)
        .starting_at(PageCursor::new(1000));
    let games: Vec<_> = tokio::time::timeout(
        Duration::from_secs(5),
        client
            .games()
            .all_with(&cancel, "thibault", config)
            .take(5)
            .collect::<Vec<_>>(),
    )
    .await
    .unwrap();

    let ids: Vec<_> = games.into_iter().map(|g| g.unwrap().id).collect();
    assert_eq!(ids, vec!["a"]);
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
}

#[tokio::test]
async fn games_all_stops_after_rate_limit() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/games/user/thibault")
            .query_param("since", "0");
        then.status(200)
            .body(game_line("g1", 100) + &game_line("g2", 200));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/games/user/thibault")
            .query_param("since", "201");
        then.status(429).header("retry-after", "60").body("");
    });
    let third = server.mock(|when, then| {
        when.method(GET)
            .path("/api/games/user/thibault")
            .query_param("since", "401");
        then.status(200).body(game_line("g5", 500));
    });

    let cancel = CancellationToken::new();
    let client = client(&server);
    let items: Vec<Result<_, ClientError>> = client
        .games()
        .all_with(&cancel, "thibault", PagerConfig::default().page_size(2))
        .collect()
        .await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap().id, "g1");
    assert_eq!(items[1].as_ref().unwrap().id, "g2");
    let err = items[2].as_ref().unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));
    assert_eq!(third.calls(), 0);
}

#[tokio::test]
async fn set_limits_rejects_zero_burst() {
    let server = MockServer::start();
    let client = client(&server);

    assert!(matches!(
        client.set_limits(Duration::from_secs(1), 0),
        Err(ClientError::InvalidRateLimit(_))
    ));
    client.set_limits(Duration::from_millis(10), 5).unwrap();
    assert_eq!(client.executor().governor().limits().burst, 5);
}
