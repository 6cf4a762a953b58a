//! Integration tests for the `gatewatch` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! and error handling — all without requiring a live stream or orchestrator.
#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a `Command` for the `gatewatch` binary with env isolation.
///
/// Clears all `GATEWATCH_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn gatewatch_cmd() -> Command {
    let mut cmd = Command::cargo_bin("gatewatch").unwrap();
    cmd.env("HOME", "/tmp/gatewatch-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/gatewatch-test-nonexistent")
        .env_remove("GATEWATCH_STREAM_URL")
        .env_remove("GATEWATCH_ORCHESTRATOR_URL")
        .env_remove("GATEWATCH_LOG_CAPACITY");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let output = gatewatch_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "expected 'Usage' in output:\n{text}");
}

#[test]
fn help_lists_subcommands() {
    gatewatch_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("badge"))
        .stdout(predicate::str::contains("door"))
        .stdout(predicate::str::contains("devices"));
}

#[test]
fn version_flag_works() {
    gatewatch_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gatewatch"));
}

#[test]
fn completions_generate_for_bash() {
    gatewatch_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gatewatch"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn badge_requires_device_and_badge_ids() {
    let output = gatewatch_cmd().arg("badge").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn door_rejects_unknown_action() {
    let output = gatewatch_cmd()
        .args(["door", "porte-001", "detonate"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Error paths (no live services) ──────────────────────────────────

#[test]
fn badge_times_out_without_a_stream() {
    // Nothing listens on this port; the CLI should give up after the
    // timeout and exit with the timeout code.
    let output = gatewatch_cmd()
        .args([
            "--timeout",
            "1",
            "-u",
            "ws://127.0.0.1:9/stream",
            "badge",
            "badgeuse-001",
            "BADGE-1234",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(8), "expected timeout exit code");
    let text = combined_output(&output);
    assert!(text.contains("Timed out"), "output was:\n{text}");
}

#[test]
fn devices_fails_cleanly_without_orchestrator() {
    let output = gatewatch_cmd()
        .args([
            "--timeout",
            "1",
            "--orchestrator",
            "http://127.0.0.1:9/",
            "devices",
        ])
        .output()
        .unwrap();

    assert_ne!(output.status.code(), Some(0));
    let text = combined_output(&output);
    assert!(
        text.contains("Orchestrator request failed"),
        "output was:\n{text}"
    );
}

#[test]
fn devices_wait_reports_not_ready() {
    let output = gatewatch_cmd()
        .args([
            "--timeout",
            "1",
            "--orchestrator",
            "http://127.0.0.1:9/",
            "devices",
            "--wait",
            "porte-001",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4), "expected not-ready exit code");
}
