// End-to-end: coordinator over a real Rdio Scanner database file.
#![allow(clippy::unwrap_used)]

use chrono::{TimeDelta, Utc};
use pretty_assertions::assert_eq;
use rusqlite::{Connection, params};
use tempfile::TempDir;

use scanfeed_core::{
    CallQuery, Coordinator, FeedConfig, HistoryQuery, SourceConfig, StatsPeriod,
};

const SCHEMA: &str = r#"
CREATE TABLE rdio_scanner_systems (_id INTEGER PRIMARY KEY, id INTEGER, label TEXT, "order" INTEGER);
CREATE TABLE rdio_scanner_tags (_id INTEGER PRIMARY KEY, label TEXT);
CREATE TABLE rdio_scanner_groups (_id INTEGER PRIMARY KEY, label TEXT);
CREATE TABLE rdio_scanner_talkgroups (
    _id INTEGER PRIMARY KEY, systemId INTEGER, id INTEGER, label TEXT, name TEXT,
    tagId INTEGER, groupId INTEGER, "order" INTEGER
);
CREATE TABLE rdio_scanner_calls (
    id INTEGER PRIMARY KEY, audio BLOB, audioName TEXT, audioType TEXT, dateTime INTEGER,
    frequencies TEXT, frequency INTEGER, patches TEXT, source INTEGER, sources TEXT,
    system INTEGER, talkgroup INTEGER
);
INSERT INTO rdio_scanner_systems VALUES (1, 1, 'Metro', 1), (2, 2, 'County', 2), (3, 3, 'State', 3);
INSERT INTO rdio_scanner_talkgroups VALUES (1, 1, 101, 'DISP', 'Dispatch', NULL, NULL, 1);
INSERT INTO rdio_scanner_talkgroups VALUES (2, 2, 201, 'FIRE', 'Fire Ops', NULL, NULL, 1);
"#;

/// Three systems, ten calls, two of them inside the recency window.
fn fixture() -> (TempDir, FeedConfig) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rdio-scanner.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();

    let now = Utc::now();
    for i in 0..10_i64 {
        let age = if i < 2 { TimeDelta::seconds(3 + i) } else { TimeDelta::minutes(5 * i) };
        let system = (i % 3) + 1;
        let talkgroup = system * 100 + 1;
        let sources = if i == 4 {
            r#"[{"src": 4001, "emergency": true}]"#.to_owned()
        } else {
            format!(r#"[{{"src": {}}}]"#, 1000 + i)
        };
        conn.execute(
            "INSERT INTO rdio_scanner_calls
             (id, audio, audioName, audioType, dateTime, frequencies, frequency, patches, sources, system, talkgroup)
             VALUES (?1, ?2, ?3, 'audio/mpeg', ?4, ?5, 851012500, '[]', ?6, ?7, ?8)",
            params![
                i + 1,
                vec![i as u8; 16],
                format!("call-{}.mp3", i + 1),
                (now - age).timestamp_millis(),
                r#"[{"freq": 851012500, "pos": 0, "len": 2.0}]"#,
                sources,
                system,
                talkgroup
            ],
        )
        .unwrap();
    }
    drop(conn);

    let mut config = FeedConfig::new(SourceConfig::RdioScanner { database: path });
    config.poll_interval = std::time::Duration::ZERO;
    (dir, config)
}

#[tokio::test]
async fn active_and_total_counts_from_recency_window() {
    let (_dir, config) = fixture();
    let coordinator = Coordinator::new(config).unwrap();
    coordinator.connect().await.unwrap();

    assert_eq!(coordinator.active_call_count(), 2);
    assert_eq!(coordinator.total_call_count(), 10);

    let snap = coordinator.snapshot();
    assert_eq!(snap.systems.len(), 3);
    assert_eq!(snap.talkgroup_count(), 2);
    assert!(snap.call_history.iter().all(|c| c.end_time.is_some()));

    coordinator.disconnect().await;
}

#[tokio::test]
async fn queries_and_statistics_over_database_calls() {
    let (_dir, config) = fixture();
    let coordinator = Coordinator::new(config).unwrap();
    coordinator.refresh().await.unwrap();

    let metro = coordinator.query_calls(&CallQuery {
        system_id: Some("1".into()),
        ..CallQuery::default()
    });
    assert!(metro.iter().all(|c| c.system_id == "1"));
    assert_eq!(metro[0].talkgroup_name.as_deref(), Some("Dispatch"));

    let page = coordinator.query_history(&HistoryQuery {
        search: Some("4001".into()),
        ..HistoryQuery::default()
    });
    assert_eq!(page.total, 1);
    assert!(page.calls[0].emergency);

    let stats = coordinator.compute_statistics(StatsPeriod::Total, None);
    assert_eq!(stats.total_calls, 10);
    assert!((stats.total_airtime - 20.0).abs() < 1e-9);
    assert_eq!(stats.emergency_calls, 1);
    assert_eq!(stats.active_systems, 3);
}

#[tokio::test]
async fn audio_is_read_from_blob_and_cached() {
    let (_dir, config) = fixture();
    let coordinator = Coordinator::new(config).unwrap();

    let clip = coordinator.audio("3").await.unwrap().unwrap();
    assert_eq!(clip.len(), 16);
    assert_eq!(clip.content_type, "audio/mpeg");
    assert_eq!(clip.filename.as_deref(), Some("call-3.mp3"));

    // Second fetch is served from the cache.
    assert_eq!(coordinator.audio("3").await.unwrap().unwrap(), clip);

    assert!(coordinator.audio("999").await.unwrap().is_none());
    assert!(coordinator.audio("not-a-number").await.unwrap().is_none());
    assert!(coordinator.audio_url("3").is_none());
}

#[tokio::test]
async fn missing_database_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let mut config = FeedConfig::new(SourceConfig::RdioScanner {
        database: dir.path().join("nope.db"),
    });
    config.poll_interval = std::time::Duration::ZERO;

    let coordinator = Coordinator::new(config).unwrap();
    let err = coordinator.refresh().await.unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn unreadable_and_oversized_rows_do_not_sink_the_refresh() {
    let (dir, config) = fixture();
    let conn = Connection::open(dir.path().join("rdio-scanner.db")).unwrap();
    let recent = (Utc::now() - TimeDelta::hours(2)).timestamp_millis();
    conn.execute(
        "INSERT INTO rdio_scanner_calls (id, dateTime, frequencies, system, talkgroup)
         VALUES (11, ?1, '[]', NULL, 101)",
        params![recent],
    )
    .unwrap();
    conn.execute(
        r#"INSERT INTO rdio_scanner_calls (id, dateTime, frequencies, system, talkgroup)
           VALUES (12, ?1, '[{"pos": 0, "len": 1e300}]', 1, 101)"#,
        params![recent],
    )
    .unwrap();
    drop(conn);

    let coordinator = Coordinator::new(config).unwrap();
    coordinator.refresh().await.unwrap();

    assert_eq!(coordinator.total_call_count(), 11);
    assert!(coordinator.find_call("11").is_none());
    let long = coordinator.find_call("12").unwrap();
    assert_eq!(long.end_time, Some(long.start_time + TimeDelta::days(1)));
}
