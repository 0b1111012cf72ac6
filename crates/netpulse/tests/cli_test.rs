//! Integration tests for the `netpulse` binary.
//!
//! Argument parsing, completions and error exits run without an appliance;
//! data commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `netpulse` binary with env isolation.
///
/// Clears all `NETPULSE_*` env vars and points config and data directories
/// at `home` so tests never touch the user's real configuration.
fn netpulse_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("netpulse");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("NETPULSE_PROFILE")
        .env_remove("NETPULSE_APPLIANCE")
        .env_remove("NETPULSE_DEVICE")
        .env_remove("NETPULSE_TOKEN")
        .env_remove("NETPULSE_OUTPUT")
        .env_remove("NETPULSE_INSECURE")
        .env_remove("NETPULSE_TIMEOUT");
    cmd
}

/// Run a command off the async runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn row(timestamp: &str, inbound: f64, outbound: f64) -> serde_json::Value {
    json!({ "timestamp": timestamp, "inbound": inbound, "outbound": outbound })
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = netpulse_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    netpulse_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("throughput")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("snapshot"))
            .and(predicate::str::contains("history")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    netpulse_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("netpulse"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    netpulse_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    netpulse_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_snapshot_without_appliance() {
    let home = tempfile::tempdir().unwrap();
    let output = netpulse_cmd(home.path()).arg("snapshot").output().unwrap();
    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("No appliance configured"));
}

#[test]
fn test_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    let output = netpulse_cmd(home.path())
        .args(["--profile", "lab", "snapshot"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    let text = combined_output(&output);
    assert!(text.contains("'lab'"));
    assert!(text.contains("(none)"), "{text}");
}

#[test]
fn test_invalid_range_is_rejected_by_clap() {
    let home = tempfile::tempdir().unwrap();
    netpulse_cmd(home.path())
        .args(["history", "--range", "2h"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2h"));
}

#[test]
fn test_history_rejects_live() {
    let home = tempfile::tempdir().unwrap();
    let output = netpulse_cmd(home.path())
        .args(["-a", "http://127.0.0.1:9", "history", "--range", "live"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_range_round_trips() {
    let home = tempfile::tempdir().unwrap();
    netpulse_cmd(home.path())
        .args(["config", "range"])
        .assert()
        .success()
        .stdout(predicate::str::contains("live"));

    netpulse_cmd(home.path())
        .args(["config", "range", "6h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6h"));

    netpulse_cmd(home.path())
        .args(["config", "range"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6h"));
}

#[test]
fn test_config_show_redacts_tokens() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("config").join("netpulse");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "default_profile = \"lab\"\n\n[profiles.lab]\nappliance = \"https://10.0.0.1\"\ntoken = \"s3cret\"\n",
    )
    .unwrap();

    netpulse_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10.0.0.1").and(predicate::str::contains("s3cret").not()));
}

// ── Against a mock appliance ────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_snapshot_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stats/latest"))
        .and(query_param("device", "wan1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": row("2024-06-15T10:30:00Z", 1200.0, 300.0)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let uri = server.uri();
    let mut cmd = netpulse_cmd(home.path());
    cmd.args(["-a", uri.as_str(), "-d", "wan1", "-o", "json", "snapshot"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["total"], json!(1500.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_snapshot_waiting_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stats/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "waiting", "message": "collector warming up"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let uri = server.uri();
    let mut cmd = netpulse_cmd(home.path());
    cmd.args(["-a", uri.as_str(), "snapshot"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("collector warming up"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_history_is_sorted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stats/history"))
        .and(query_param("range", "15m"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            row("2024-06-15T10:02:00Z", 3.0, 1.0),
            row("2024-06-15T10:00:00Z", 1.0, 1.0),
            row("2024-06-15T10:01:00Z", 2.0, 1.0)
        ])))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let uri = server.uri();
    let mut cmd = netpulse_cmd(home.path());
    cmd.args(["-a", uri.as_str(), "-o", "json", "history", "--range", "15m"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let points: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let inbound: Vec<f64> = points.iter().map(|p| p["inbound"].as_f64().unwrap()).collect();
    assert_eq!(inbound, vec![1.0, 2.0, 3.0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_live_stops_after_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stats/latest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(row("2024-06-15T10:30:00Z", 10.0, 5.0)),
        )
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let uri = server.uri();
    let mut cmd = netpulse_cmd(home.path());
    cmd.args([
        "-a",
        uri.as_str(),
        "-o",
        "json-compact",
        "watch",
        "--range",
        "live",
        "--no-backfill",
        "--interval",
        "50ms",
        "--count",
        "1",
    ]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first: serde_json::Value = serde_json::from_str(stdout.lines().next().unwrap()).unwrap();
    assert_eq!(first["total"], json!(15.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_historical_remembers_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stats/history"))
        .and(query_param("range", "1h"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [row("2024-06-15T10:00:00Z", 1.0, 1.0), row("2024-06-15T10:01:00Z", 2.0, 1.0)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let uri = server.uri();
    let mut cmd = netpulse_cmd(home.path());
    cmd.args(["-a", uri.as_str(), "-o", "plain", "watch", "--range", "1h"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 2);

    netpulse_cmd(home.path())
        .args(["config", "range"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1h"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_historical_failure_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stats/history"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let uri = server.uri();
    let mut cmd = netpulse_cmd(home.path());
    cmd.args(["-a", uri.as_str(), "watch", "--range", "6h"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(5), "{}", combined_output(&output));
}
