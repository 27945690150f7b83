//! Integration tests for the `boatmon` CLI binary.
//!
//! Argument parsing, help output, completions and config handling run
//! without a backend; the remaining tests point the binary at a wiremock
//! server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `boatmon` binary with env isolation.
///
/// Clears all `BOATMON_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn boatmon_cmd_in(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("boatmon");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"))
        .env_remove("BOATMON_PROFILE")
        .env_remove("BOATMON_URL")
        .env_remove("BOATMON_SETTINGS_PASSWORD")
        .env_remove("BOATMON_OUTPUT")
        .env_remove("BOATMON_INSECURE")
        .env_remove("BOATMON_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn boatmon_cmd() -> assert_cmd::Command {
    boatmon_cmd_in(Path::new("/tmp/boatmon-cli-test-nonexistent"))
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || boatmon_cmd().args(args).output().unwrap())
        .await
        .unwrap()
}

fn relay_json(id: &str, state: bool, enabled: bool) -> serde_json::Value {
    json!({
        "id": id,
        "board_id": 0,
        "relay_number": 1,
        "name": format!("Relay {id}"),
        "enabled": enabled,
        "mode": "normal",
        "state": state
    })
}

async fn backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/thresholds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "engine_rpm_max": 3000.0,
            "oil_pressure_min": 20.0,
            "oil_pressure_max": 80.0,
            "coolant_temp_max": 95.0
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/relays"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "relays": [relay_json("r1", true, true), relay_json("r2", false, false)]
        })))
        .mount(&server)
        .await;
    server
}

fn with_url(server: &MockServer, args: &[&str]) -> Vec<String> {
    let mut argv = vec!["--url".to_owned(), server.uri()];
    argv.extend(args.iter().map(|s| (*s).to_owned()));
    argv
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = boatmon_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    boatmon_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("telemetry")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("relays"))
            .and(predicate::str::contains("thresholds")),
    );
}

#[test]
fn test_version_flag() {
    boatmon_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("boatmon"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    boatmon_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    boatmon_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = boatmon_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_relays_list_no_backend_configured() {
    boatmon_cmd()
        .args(["relays", "list"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("config init").or(predicate::str::contains("--url")));
}

#[test]
fn test_invalid_output_format() {
    let output = boatmon_cmd()
        .args(["--output", "invalid", "relays", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_non_http_url_rejected() {
    boatmon_cmd()
        .args(["--url", "ws://boat.local", "relays", "list"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_configure_enable_conflicts_with_disable() {
    boatmon_cmd()
        .args(["relays", "configure", "r1", "--enable", "--disable"])
        .assert()
        .failure()
        .code(2);
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_relays_subcommands_exist() {
    boatmon_cmd()
        .args(["relays", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("on"))
                .and(predicate::str::contains("off"))
                .and(predicate::str::contains("toggle"))
                .and(predicate::str::contains("configure")),
        );
}

#[test]
fn test_config_subcommands_exist() {
    boatmon_cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("profiles"))
                .and(predicate::str::contains("set-password")),
        );
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    boatmon_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_set_then_profiles() {
    let home = tempfile::tempdir().unwrap();

    boatmon_cmd_in(home.path())
        .args(["config", "set", "url", "http://boat.local:8000"])
        .assert()
        .success();
    boatmon_cmd_in(home.path())
        .args(["config", "set", "reconnect_delay", "5s"])
        .assert()
        .success();

    boatmon_cmd_in(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default *"));

    boatmon_cmd_in(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("url = \"http://boat.local:8000\"")
                .and(predicate::str::contains("reconnect_delay = \"5s\"")),
        );
}

#[test]
fn test_config_rejects_bad_values() {
    let home = tempfile::tempdir().unwrap();

    boatmon_cmd_in(home.path())
        .args(["config", "set", "threshold_poll", "sometimes"])
        .assert()
        .failure()
        .code(2);

    boatmon_cmd_in(home.path())
        .args(["config", "use", "nope"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("nope"));
}

// ── Against a backend ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_relays_list_json() {
    let server = backend().await;

    let output = run(with_url(&server, &["-o", "json", "relays", "list"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let relays: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = relays
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["r1", "r2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disabled_relay_exit_code() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/api/relays/r2/on"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&server)
        .await;

    let output = run(with_url(&server, &["relays", "on", "r2"])).await;
    assert_eq!(output.status.code(), Some(5), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("disabled"));

    server.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_relay_exit_code() {
    let server = backend().await;

    let output = run(with_url(&server, &["relays", "toggle", "r9"])).await;
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_thresholds_show_plain() {
    let server = backend().await;

    let output = run(with_url(&server, &["-o", "plain", "thresholds", "show"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("engine_rpm_max\t3000 rpm"), "{stdout}");
    assert!(stdout.contains("oil_pressure_min\t20 psi"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_thresholds_reset_needs_yes_when_non_interactive() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/api/thresholds/reset"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = run(with_url(&server, &["thresholds", "reset"])).await;
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));

    server.verify().await;
}
