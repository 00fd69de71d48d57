// End-to-end: coordinator over a mocked Trunk Recorder server.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scanfeed_core::{CallQuery, Coordinator, CoreError, FeedConfig, SourceConfig, SourceStatus};

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn config(server: &MockServer) -> FeedConfig {
    let mut config = FeedConfig::new(SourceConfig::TrunkRecorder {
        url: server.uri().parse().unwrap(),
        api_key: None,
        push: false,
    });
    config.poll_interval = Duration::ZERO;
    config.timeout = Duration::from_secs(2);
    config
}

async fn populated_server() -> MockServer {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/api/systems",
        json!([{"id": "metro", "short_name": "Metro", "type": "p25"}]),
    )
    .await;
    mount_json(
        &server,
        "/api/systems/metro/talkgroups",
        json!([{"id": 101, "alpha_tag": "Dispatch"}]),
    )
    .await;
    mount_json(
        &server,
        "/api/calls/active",
        json!([{"id": "live", "system": "metro", "talkgroup": 101, "start_time": 1_760_000_100}]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/calls"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "h1", "system": "metro", "talkgroup": 101, "start_time": 1_760_000_000, "call_length": 4.0},
            {"id": "h2", "system": "metro", "talkgroup": 101, "start_time": 1_760_000_050, "stop_time": 1_760_000_052},
        ])))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn refresh_populates_feed_state() {
    let server = populated_server().await;
    let coordinator = Coordinator::new(config(&server)).unwrap();
    coordinator.refresh().await.unwrap();

    let snap = coordinator.snapshot();
    assert_eq!(snap.systems["metro"].name, "Metro");
    assert_eq!(snap.talkgroup("metro", "101").unwrap().label(), "Dispatch");
    assert_eq!(snap.active_call_count(), 1);

    let ids: Vec<&str> = snap.call_history.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["h2", "h1"]);
    assert!(snap.call_history.iter().all(|c| c.end_time.is_some()));

    let active = coordinator.query_calls(&CallQuery {
        active_only: true,
        ..CallQuery::default()
    });
    assert_eq!(active[0].id, "live");

    let url = coordinator.audio_url("h1").unwrap();
    assert!(url.as_str().ends_with("/api/calls/h1/audio"));
}

#[tokio::test]
async fn server_error_marks_source_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/systems"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server)).unwrap();
    let err = coordinator.refresh().await.unwrap_err();

    assert!(matches!(err, CoreError::SourceUnavailable { .. }));
    assert!(matches!(coordinator.snapshot().status, SourceStatus::Unavailable(_)));
}

#[tokio::test]
async fn missing_audio_is_none_and_present_audio_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/calls/gone/audio"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/calls/h1/audio"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/wav")
                .set_body_bytes(vec![9_u8; 32]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config(&server)).unwrap();
    assert!(coordinator.audio("gone").await.unwrap().is_none());

    let clip = coordinator.audio("h1").await.unwrap().unwrap();
    assert_eq!(clip.content_type, "audio/wav");
    assert_eq!(clip.filename.as_deref(), Some("h1.wav"));

    // Cached: the mock expects exactly one request.
    let again = coordinator.audio("h1").await.unwrap().unwrap();
    assert_eq!(again.len(), 32);
}
