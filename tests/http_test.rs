use std::sync::Arc;
use std::time::Duration;

use aocp::aoc::Fetcher;
use aocp::cache::{Cache, InMemoryCache, NoCache};
use aocp::config::Config;
use aocp::error::AocError;
use aocp::http::{Client, Request};
use aocp::io::HttpRunner;
use aocp::time::Seconds;
use httpmock::prelude::*;

const LEADERBOARD_PATH: &str = "/2025/leaderboard/private/view/1234.json";

fn leaderboard_body() -> &'static str {
    r#"{"owner_id": 1234, "event": "2025", "members": {"1234": {"name": "nulzo", "stars": 12}}}"#
}

fn config_for(server: &MockServer) -> Arc<Config> {
    Arc::new(
        Config::default()
            .with_session_id("53616c746564")
            .with_base_url(&server.base_url()),
    )
}

fn client() -> Client {
    Client::new(Seconds::new(5))
}

#[test]
fn test_http_runner() {
    let server = MockServer::start();
    let server_mock = server.mock(|when, then| {
        when.method(GET).path(LEADERBOARD_PATH);
        then.status(200)
            .header("content-type", "application/json")
            .body(leaderboard_body());
    });
    let request = Request::get(&server.url(LEADERBOARD_PATH));
    let response = client().run(&request).unwrap();
    assert_eq!(200, response.status);
    assert_eq!("OK", response.status_text);
    assert!(response.body.contains("owner_id"));
    server_mock.assert();
}

#[test]
fn test_http_runner_non_2xx_is_a_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/2025/day/1");
        then.status(404).body("Not Found");
    });
    let request = Request::get(&server.url("/2025/day/1"));
    let response = client().run(&request).unwrap();
    assert_eq!(404, response.status);
    assert_eq!("Not Found", response.status_text);
    assert!(!response.is_success());
}

#[test]
fn test_http_runner_server_down() {
    let request = Request::get("http://localhost:8091/2025/day/1");
    let err = client().run(&request).unwrap_err();
    match err.downcast_ref::<AocError>() {
        Some(AocError::TransportError(_)) => (),
        _ => panic!("Expected TransportError"),
    }
}

#[test]
fn test_fetch_sends_user_agent_and_session_cookie() {
    let server = MockServer::start();
    let server_mock = server.mock(|when, then| {
        when.method(GET)
            .path(LEADERBOARD_PATH)
            .header("Cookie", "session=53616c746564")
            .header_exists("User-Agent");
        then.status(200).body(leaderboard_body());
    });
    let fetcher = Fetcher::new(InMemoryCache::default(), client(), config_for(&server));
    let result = fetcher.fetch(LEADERBOARD_PATH).unwrap();
    assert!(!result.meta.cached);
    assert_eq!(1234, result.data["owner_id"]);
    server_mock.assert();
}

#[test]
fn test_fetch_second_call_is_served_from_cache() {
    let server = MockServer::start();
    let server_mock = server.mock(|when, then| {
        when.method(GET).path(LEADERBOARD_PATH);
        then.status(200).body(leaderboard_body());
    });
    let fetcher = Fetcher::new(InMemoryCache::default(), client(), config_for(&server));
    let first = fetcher.fetch(LEADERBOARD_PATH).unwrap();
    let second = fetcher.fetch(LEADERBOARD_PATH).unwrap();
    assert!(!first.meta.cached);
    assert!(second.meta.cached);
    assert_eq!(first.data, second.data);
    server_mock.assert_hits(1);
    let stats = fetcher.cache().stats();
    assert_eq!(1, stats.hits);
    assert_eq!(1, stats.misses);
    assert_eq!(1, stats.keys);
}

#[test]
fn test_fetch_upstream_forbidden_is_not_cached() {
    let server = MockServer::start();
    let server_mock = server.mock(|when, then| {
        when.method(GET).path(LEADERBOARD_PATH);
        then.status(403).body("Forbidden");
    });
    let fetcher = Fetcher::new(InMemoryCache::default(), client(), config_for(&server));
    for _ in 0..2 {
        let err = fetcher.fetch(LEADERBOARD_PATH).unwrap_err();
        match err.downcast_ref::<AocError>() {
            Some(AocError::UpstreamError { status, .. }) => assert_eq!(403, *status),
            _ => panic!("Expected UpstreamError"),
        }
    }
    server_mock.assert_hits(2);
    assert_eq!(0, fetcher.cache().stats().keys);
}

#[test]
fn test_fetch_without_session_never_calls_upstream() {
    let server = MockServer::start();
    let server_mock = server.mock(|when, then| {
        when.method(GET).path(LEADERBOARD_PATH);
        then.status(200).body(leaderboard_body());
    });
    let config = Arc::new(Config::default().with_base_url(&server.base_url()));
    let fetcher = Fetcher::new(InMemoryCache::default(), client(), config);
    let err = fetcher.fetch(LEADERBOARD_PATH).unwrap_err();
    match err.downcast_ref::<AocError>() {
        Some(AocError::ConfigurationError(msg)) => assert!(msg.contains("AOC_SESSION_ID")),
        _ => panic!("Expected ConfigurationError"),
    }
    server_mock.assert_hits(0);
}

#[test]
fn test_fetch_puzzle_page_is_cached_as_string() {
    let server = MockServer::start();
    let server_mock = server.mock(|when, then| {
        when.method(GET).path("/2025/day/3/input");
        then.status(200).body("1721\n979\n366\n");
    });
    let fetcher = Fetcher::new(InMemoryCache::default(), client(), config_for(&server));
    let first = fetcher.fetch("/2025/day/3/input").unwrap();
    assert_eq!("1721\n979\n366\n", first.data.as_str().unwrap());
    let second = fetcher.fetch("/2025/day/3/input").unwrap();
    assert!(second.meta.cached);
    let json = second.to_json();
    assert_eq!("1721\n979\n366\n", json["data"]);
    assert_eq!(true, json["_meta"]["cached"]);
    server_mock.assert_hits(1);
}

#[test]
fn test_fetch_no_cache_always_goes_upstream() {
    let server = MockServer::start();
    let server_mock = server.mock(|when, then| {
        when.method(GET).path(LEADERBOARD_PATH);
        then.status(200).body(leaderboard_body());
    });
    let fetcher = Fetcher::new(NoCache, client(), config_for(&server));
    assert!(!fetcher.fetch(LEADERBOARD_PATH).unwrap().meta.cached);
    assert!(!fetcher.fetch(LEADERBOARD_PATH).unwrap().meta.cached);
    server_mock.assert_hits(2);
}

#[test]
fn test_fetch_timeout_is_transport_error_and_not_cached() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(LEADERBOARD_PATH);
        then.status(200)
            .body(leaderboard_body())
            .delay(Duration::from_millis(2500));
    });
    let fetcher = Fetcher::new(
        InMemoryCache::default(),
        Client::new(Seconds::new(1)),
        config_for(&server),
    );
    let err = fetcher.fetch(LEADERBOARD_PATH).unwrap_err();
    match err.downcast_ref::<AocError>() {
        Some(AocError::TransportError(_)) => (),
        _ => panic!("Expected TransportError, got {}", err),
    }
    assert_eq!(0, fetcher.cache().stats().keys);
}

#[test]
fn test_zero_timeout_disables_the_request_deadline() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/2025/day/1");
        then.status(200)
            .body("ok")
            .delay(Duration::from_millis(200));
    });
    let request = Request::get(&server.url("/2025/day/1"));
    let response = Client::new(Seconds::new(0)).run(&request).unwrap();
    assert_eq!(200, response.status);
    assert_eq!("ok", response.body);
}

#[test]
fn test_fetch_all_repeated_paths_join_one_upstream_call() {
    let server = MockServer::start();
    let server_mock = server.mock(|when, then| {
        when.method(GET).path(LEADERBOARD_PATH);
        then.status(200)
            .body(leaderboard_body())
            .delay(Duration::from_millis(300));
    });
    let config = Config::default()
        .with_session_id("53616c746564")
        .with_base_url(&server.base_url())
        .with_single_flight(true);
    let fetcher = Fetcher::new(InMemoryCache::default(), client(), Arc::new(config));
    let results = fetcher.fetch_all(&[LEADERBOARD_PATH; 3]);
    for result in results {
        assert_eq!(1234, result.unwrap().data["owner_id"]);
    }
    server_mock.assert_hits(1);
}
