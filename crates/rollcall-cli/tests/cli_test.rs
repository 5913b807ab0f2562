//! Integration tests for the `rollcall` CLI binary.
//!
//! These validate argument parsing, help output, config handling, and
//! error exit codes — all without a live attendance server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `rollcall` binary with env isolation.
///
/// Clears all `ROLLCALL_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn rollcall_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("rollcall");
    cmd.env("HOME", "/tmp/rollcall-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/rollcall-cli-test-nonexistent")
        .env_remove("ROLLCALL_PROFILE")
        .env_remove("ROLLCALL_SERVER")
        .env_remove("ROLLCALL_TOKEN");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = rollcall_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    rollcall_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("attendance")
            .and(predicate::str::contains("session"))
            .and(predicate::str::contains("scan"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    rollcall_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rollcall"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = rollcall_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_session_status_no_config() {
    let output = rollcall_cmd()
        .args(["session", "status", "--course", "COS301"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("config") || text.contains("Configuration"),
        "Expected a configuration error:\n{text}"
    );
}

#[test]
fn test_session_start_requires_coordinates() {
    let output = rollcall_cmd()
        .args(["session", "start", "--course", "COS301"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected usage error");
    let text = combined_output(&output);
    assert!(
        text.contains("--lat") || text.contains("--lng"),
        "Expected the missing coordinate flags to be named:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    let output = rollcall_cmd()
        .args(["--output", "table", "session", "status"])
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
fn test_scan_unreachable_server_exits_connection_code() {
    // Port 9 (discard) has no listener: connect-class failure.
    let output = rollcall_cmd()
        .args(["--server", "http://127.0.0.1:9", "scan", "tok-1"])
        .output()
        .unwrap();
    assert_eq!(
        output.status.code(),
        Some(7),
        "Expected connection exit code:\n{}",
        combined_output(&output)
    );
}

#[test]
fn test_lecturer_command_without_token_exits_auth_code() {
    let output = rollcall_cmd()
        .args([
            "--server",
            "http://127.0.0.1:9",
            "session",
            "status",
            "--course",
            "COS301",
        ])
        .output()
        .unwrap();
    assert_eq!(
        output.status.code(),
        Some(3),
        "Expected auth exit code:\n{}",
        combined_output(&output)
    );
}

#[test]
fn test_session_watch_without_token_exits_auth_code() {
    // watch is a lecturer-facing query: it needs credentials just like
    // status and end.
    let output = rollcall_cmd()
        .args([
            "--server",
            "http://127.0.0.1:9",
            "session",
            "watch",
            "--course",
            "COS301",
        ])
        .output()
        .unwrap();
    assert_eq!(
        output.status.code(),
        Some(3),
        "Expected auth exit code:\n{}",
        combined_output(&output)
    );
}

// ── Config commands ─────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    // Renders the default config when no file exists.
    rollcall_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_profile"));
}

#[test]
fn test_config_path_prints_a_path() {
    rollcall_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_show_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let config_home = dir.path().to_str().unwrap().to_owned();

    let mut init = cargo_bin_cmd!("rollcall");
    init.env("HOME", &config_home)
        .env("XDG_CONFIG_HOME", &config_home)
        .env_remove("ROLLCALL_PROFILE")
        .env_remove("ROLLCALL_SERVER")
        .env_remove("ROLLCALL_TOKEN")
        .args([
            "config",
            "init",
            "--server",
            "https://attendance.example.edu",
            "--course",
            "COS301",
            "--name",
            "campus",
        ])
        .assert()
        .success();

    let mut show = cargo_bin_cmd!("rollcall");
    show.env("HOME", &config_home)
        .env("XDG_CONFIG_HOME", &config_home)
        .env_remove("ROLLCALL_PROFILE")
        .env_remove("ROLLCALL_SERVER")
        .env_remove("ROLLCALL_TOKEN")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("attendance.example.edu")
                .and(predicate::str::contains("COS301")),
        );
}

#[test]
fn test_config_init_rejects_bad_url() {
    let output = rollcall_cmd()
        .args(["config", "init", "--server", "not a url"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected usage exit code");
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_session_subcommands_exist() {
    rollcall_cmd()
        .args(["session", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("start")
                .and(predicate::str::contains("status"))
                .and(predicate::str::contains("end"))
                .and(predicate::str::contains("watch")),
        );
}

#[test]
fn test_config_subcommands_exist() {
    rollcall_cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("path")),
        );
}
