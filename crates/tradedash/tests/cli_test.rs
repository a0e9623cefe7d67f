//! Integration tests for the `tradedash` CLI binary.
//!
//! Argument parsing, help output, completions and config handling run
//! without a backend; command tests run against a wiremock backend.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `tradedash` binary with env isolation.
///
/// Clears all `TRADEDASH_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn tradedash_cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("tradedash");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("TRADEDASH_PROFILE")
        .env_remove("TRADEDASH_SERVER")
        .env_remove("TRADEDASH_OUTPUT")
        .env_remove("TRADEDASH_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/coins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "coins": [
                { "coin": "ETH", "mark_price": 3000.0, "trade_count": 4, "win_rate": 0.5,
                  "total_pnl": 12.0, "confidence_adjustment": 0.1, "blacklisted": false },
                { "coin": "DOGE", "mark_price": 0.1, "trade_count": 0, "win_rate": null,
                  "total_pnl": null, "confidence_adjustment": 0.0, "blacklisted": true },
                { "coin": "BTC", "mark_price": 64000.0, "trade_count": 2, "win_rate": 1.0,
                  "total_pnl": 40.0, "confidence_adjustment": 0.2, "blacklisted": false }
            ],
            "total": 3
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "running",
            "mode": "paper",
            "equity": 10250.5,
            "open_positions": [
                { "coin": "ETH", "side": "long", "entry_price": 3000.0, "current_price": 3100.0,
                  "size": 0.5, "unrealized_pnl": 50.0, "leverage": 3 },
                { "coin": "SOL", "side": "short", "entry_price": 150.0, "current_price": 140.0,
                  "size": 2.0, "unrealized_pnl": 20.0, "leverage": 2 }
            ]
        })))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = tradedash_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("dashboard")
            .and(predicate::str::contains("coins"))
            .and(predicate::str::contains("blacklist"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tradedash"));
}

#[test]
fn test_completions_zsh() {
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_coins_without_backend_config() {
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .arg("coins")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No backend configured"));
}

#[test]
fn test_unknown_profile_is_reported() {
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--profile", "live", "dashboard"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Profile 'live' not found"));
}

#[test]
fn test_unreachable_backend_exits_with_connection_code() {
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--server", "http://127.0.0.1:1", "--timeout", "5", "health"])
        .assert()
        .code(7);
}

#[test]
fn test_desc_requires_sort() {
    let home = TempDir::new().unwrap();
    let output = tradedash_cmd(&home)
        .args(["--server", "http://127.0.0.1:1", "coins", "--desc"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_init_then_profiles() {
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["config", "init", "http://127.0.0.1:8080", "--name", "paper"])
        .assert()
        .success();
    tradedash_cmd(&home)
        .args(["config", "init", "https://dash.example.com", "--name", "live"])
        .assert()
        .success();

    tradedash_cmd(&home)
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::diff("live\npaper *\n"));

    tradedash_cmd(&home).args(["config", "use", "live"]).assert().success();
    tradedash_cmd(&home)
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::diff("live *\npaper\n"));
}

#[test]
fn test_config_init_rejects_bad_url() {
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["config", "init", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("server"));
}

#[test]
fn test_config_set_validates_values() {
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["config", "init", "http://127.0.0.1:8080"])
        .assert()
        .success();
    tradedash_cmd(&home)
        .args(["config", "set", "poll_interval_secs", "soon"])
        .assert()
        .code(2);
    tradedash_cmd(&home)
        .args(["config", "set", "poll_interval_secs", "3"])
        .assert()
        .success();
    tradedash_cmd(&home)
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"poll_interval_secs\": 3"));
}

#[test]
fn test_config_use_unknown_profile() {
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["config", "use", "nope"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope"));
}

// ── Commands against a backend ──────────────────────────────────────

#[tokio::test]
async fn test_coins_sorted_descending_nulls_last() {
    let server = backend().await;
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--server", &server.uri(), "-o", "plain", "coins", "--sort", "win_rate", "--desc"])
        .assert()
        .success()
        .stdout(predicate::str::diff("BTC\nETH\nDOGE\n"));
}

#[tokio::test]
async fn test_coins_filter_is_case_insensitive() {
    let server = backend().await;
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--server", &server.uri(), "-o", "plain", "coins", "--filter", "et"])
        .assert()
        .success()
        .stdout(predicate::str::diff("ETH\n"));
}

#[tokio::test]
async fn test_coins_table_shows_selected_detail() {
    let server = backend().await;
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--server", &server.uri(), "coins", "--select", "ETH"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Win Rate")
                .and(predicate::str::contains("Confidence adj."))
                .and(predicate::str::contains("50.0%")),
        );
}

#[tokio::test]
async fn test_unknown_sort_column() {
    let server = backend().await;
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--server", &server.uri(), "coins", "--sort", "volume"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("mark_price"));
}

#[tokio::test]
async fn test_positions_sorted_by_side() {
    let server = backend().await;
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--server", &server.uri(), "-o", "plain", "positions", "--sort", "side", "--desc"])
        .assert()
        .success()
        .stdout(predicate::str::diff("SOL:short\nETH:long\n"));
}

#[tokio::test]
async fn test_dashboard_json() {
    let server = backend().await;
    let home = TempDir::new().unwrap();
    let output = tradedash_cmd(&home)
        .args(["--server", &server.uri(), "-o", "json", "dashboard"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["equity"], json!(10250.5));
    assert_eq!(body["open_positions"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_blacklist_list_derived_from_coins() {
    let server = backend().await;
    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--server", &server.uri(), "-o", "plain", "blacklist", "list"])
        .assert()
        .success()
        .stdout(predicate::str::diff("DOGE\n"));
}

#[tokio::test]
async fn test_blacklist_add_posts_and_refreshes() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/api/coins/blacklist"))
        .and(body_json(json!({ "coin": "ETH" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok", "coin": "ETH" })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--server", &server.uri(), "blacklist", "add", "eth"])
        .assert()
        .success()
        .stderr(predicate::str::contains("ETH blacklisted"));
}

#[tokio::test]
async fn test_blacklist_toggle_removes_flagged_coin() {
    let server = backend().await;
    Mock::given(method("DELETE"))
        .and(path("/api/coins/blacklist/DOGE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok", "coin": "DOGE" })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--server", &server.uri(), "blacklist", "toggle", "DOGE"])
        .assert()
        .success()
        .stderr(predicate::str::contains("DOGE removed from blacklist"));
}

#[tokio::test]
async fn test_health_plain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy", "mode": "paper", "uptime_seconds": 3725, "signals_received": 17
        })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--server", &server.uri(), "-o", "plain", "health"])
        .assert()
        .success()
        .stdout(predicate::str::diff("healthy\n"));
}

#[tokio::test]
async fn test_backend_error_exits_with_general_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    tradedash_cmd(&home)
        .args(["--server", &server.uri(), "dashboard"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("503"));
}
