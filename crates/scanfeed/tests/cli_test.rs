//! Integration tests for the `scanfeed` CLI binary.
//!
//! Argument parsing, help output and completions need no call source.
//! Data commands run against a throwaway Rdio Scanner database.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use rusqlite::{Connection, params};
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `scanfeed` binary with env isolation.
///
/// Clears all `SCANFEED_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn scanfeed_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("scanfeed");
    cmd.env("HOME", "/tmp/scanfeed-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/scanfeed-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("SCANFEED_PROFILE")
        .env_remove("SCANFEED_HOST")
        .env_remove("SCANFEED_PORT")
        .env_remove("SCANFEED_DATABASE")
        .env_remove("SCANFEED_API_KEY")
        .env_remove("SCANFEED_OUTPUT")
        .env_remove("SCANFEED_TIMEOUT")
        .env_remove("SCANFEED_DEFAULT_PROFILE");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

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

/// Three systems and ten 2-second calls; the two newest count as active.
fn rdio_fixture() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rdio-scanner.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();

    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis();
    let now_ms = i64::try_from(now_ms).unwrap();

    for i in 0..10_i64 {
        let age_ms = if i < 2 { (2 + i) * 1000 } else { i * 300_000 };
        let system = (i % 3) + 1;
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
                vec![7_u8; 16],
                format!("call-{}.mp3", i + 1),
                now_ms - age_ms,
                r#"[{"freq": 851012500, "pos": 0, "len": 2.0}]"#,
                sources,
                system,
                system * 100 + 1
            ],
        )
        .unwrap();
    }
    (dir, path)
}

fn with_db(db: &Path) -> assert_cmd::Command {
    let mut cmd = scanfeed_cmd();
    cmd.arg("--database").arg(db);
    cmd
}

fn stdout_json(cmd: &mut assert_cmd::Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = scanfeed_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    scanfeed_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Trunk Recorder")
            .and(predicate::str::contains("calls"))
            .and(predicate::str::contains("history"))
            .and(predicate::str::contains("stats"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    scanfeed_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("scanfeed"));
}

#[test]
fn test_completions_zsh() {
    scanfeed_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    scanfeed_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = scanfeed_cmd().arg("foobar").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected error naming the subcommand:\n{text}");
}

#[test]
fn test_calls_without_source_explains_setup() {
    scanfeed_cmd()
        .arg("calls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config init").and(predicate::str::contains("--database")));
}

#[test]
fn test_invalid_output_format() {
    let output = scanfeed_cmd()
        .args(["--output", "invalid", "calls"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("possible values"));
}

#[test]
fn test_host_and_database_conflict() {
    let output = scanfeed_cmd()
        .args(["--host", "tr.local", "--database", "x.db", "systems"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_database_is_connection_error() {
    let dir = TempDir::new().unwrap();
    let output = with_db(&dir.path().join("absent.db")).arg("calls").output().unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

#[test]
fn test_unreachable_host_is_connection_error() {
    let output = scanfeed_cmd()
        .args(["--host", "http://127.0.0.1:9", "--timeout", "2", "systems"])
        .output()
        .unwrap();
    let code = output.status.code();
    assert!(
        code == Some(7) || code == Some(8),
        "Expected connection or timeout exit code, got {code:?}:\n{}",
        combined_output(&output)
    );
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    scanfeed_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_path() {
    scanfeed_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_subcommands_exist() {
    scanfeed_cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("profiles"))
                .and(predicate::str::contains("set-key")),
        );
}

// ── Data commands against an Rdio Scanner database ──────────────────

#[test]
fn test_systems_plain() {
    let (_dir, db) = rdio_fixture();
    with_db(&db)
        .args(["systems", "-o", "plain"])
        .assert()
        .success()
        .stdout("1\n2\n3\n");
}

#[test]
fn test_calls_history_and_active() {
    let (_dir, db) = rdio_fixture();

    let history = stdout_json(with_db(&db).args(["calls", "-o", "json"]));
    let calls = history.as_array().unwrap();
    assert_eq!(calls.len(), 10);
    assert!(calls.iter().all(|c| !c["end_time"].is_null()));

    let active = stdout_json(with_db(&db).args(["calls", "--active", "-o", "json"]));
    assert_eq!(active.as_array().unwrap().len(), 2);
}

#[test]
fn test_history_search_by_unit() {
    let (_dir, db) = rdio_fixture();
    let page = stdout_json(with_db(&db).args(["history", "--search", "4001", "-o", "json"]));
    assert_eq!(page["total"], 1);
    assert_eq!(page["calls"][0]["emergency"], true);
}

#[test]
fn test_stats_total() {
    let (_dir, db) = rdio_fixture();
    let stats = stdout_json(with_db(&db).args(["stats", "--period", "all", "-o", "json"]));
    assert_eq!(stats["period"], "total");
    assert_eq!(stats["emergency_calls"], 1);
    assert_eq!(stats["active_calls"], 2);
}

#[test]
fn test_sensors_plain() {
    let (_dir, db) = rdio_fixture();
    with_db(&db)
        .args(["sensors", "--instance", "scanner", "-o", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("scanner_active_calls=2")
                .and(predicate::str::contains("scanner_systems=3"))
                .and(predicate::str::contains("scanner_status=Connected")),
        );
}

#[test]
fn test_call_detail_and_not_found() {
    let (_dir, db) = rdio_fixture();
    with_db(&db)
        .args(["call", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4001").and(predicate::str::contains("Emergency:  true")));

    let output = with_db(&db).args(["call", "999"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_audio_download() {
    let (dir, db) = rdio_fixture();
    let out = dir.path().join("clip.mp3");
    with_db(&db)
        .args(["audio", "3", "--file"])
        .arg(&out)
        .assert()
        .success();
    assert_eq!(std::fs::read(&out).unwrap(), vec![7_u8; 16]);

    let output = with_db(&db).args(["audio", "3", "--url"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}
