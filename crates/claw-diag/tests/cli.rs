//! End-to-end tests for the `claw-diag` binary against a temporary store.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Store {
    dir: TempDir,
}

impl Store {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn path(&self) -> PathBuf {
        self.dir.path().join("diagnostics.json")
    }

    fn write_config(&self, content: &str) -> PathBuf {
        let path = self.dir.path().join("claw-diag.toml");
        std::fs::write(&path, content).expect("failed to write config");
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("claw-diag").expect("binary built");
        cmd.env_remove("CLAW_DIAG_CONFIG")
            .env_remove("RUST_LOG")
            .env("CLAW_DIAG_STORE", self.path());
        cmd
    }

    fn list_json(&self, extra: &[&str]) -> Vec<serde_json::Value> {
        let output = self
            .cmd()
            .args(["--format", "json", "list"])
            .args(extra)
            .output()
            .expect("run list");
        assert!(output.status.success(), "list failed: {output:?}");
        serde_json::from_slice(&output.stdout).expect("list output is a JSON array")
    }
}

#[test]
fn log_then_list_persists_entries() {
    let store = Store::new();

    store
        .cmd()
        .args(["log", "payment refresh failed", "--level", "error", "--status", "503"])
        .assert()
        .success();
    store
        .cmd()
        .args(["log", "cache warmed", "--context", "keys=42"])
        .assert()
        .success();

    let entries = store.list_json(&[]);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["level"], "ERROR");
    assert_eq!(entries[0]["errorType"], "HTTP 503");
    assert_eq!(entries[1]["message"], "cache warmed");
    assert_eq!(entries[1]["context"]["keys"], 42);
}

#[test]
fn list_table_shows_header_and_count() {
    let store = Store::new();
    store.cmd().args(["log", "hello"]).assert().success();

    store
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("TIMESTAMP"))
        .stdout(predicate::str::contains("hello"))
        .stdout(predicate::str::contains("1 entries"));
}

#[test]
fn empty_store_lists_nothing() {
    let store = Store::new();
    store
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No entries."));
}

#[test]
fn configured_capacity_evicts_oldest() {
    let store = Store::new();
    let config = store.write_config("[diagnostics]\nmax_logs = 2\n");

    for message in ["first", "second", "third"] {
        store
            .cmd()
            .arg("--config")
            .arg(&config)
            .args(["log", message])
            .assert()
            .success();
    }

    let messages: Vec<_> = store
        .list_json(&[])
        .iter()
        .map(|e| e["message"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(messages, vec!["second", "third"]);
}

#[test]
fn list_filters_by_level_and_limit() {
    let store = Store::new();
    for (message, level) in [("a", "warning"), ("b", "info"), ("c", "warning"), ("d", "warning")] {
        store
            .cmd()
            .args(["log", message, "-l", level])
            .assert()
            .success();
    }

    let entries = store.list_json(&["--level", "WARNING", "-n", "2"]);
    let messages: Vec<_> = entries.iter().map(|e| e["message"].clone()).collect();
    assert_eq!(messages, vec!["c", "d"]);
}

#[test]
fn search_is_case_insensitive() {
    let store = Store::new();
    store
        .cmd()
        .args(["log", "Upstream TIMEOUT while syncing"])
        .assert()
        .success();
    store.cmd().args(["log", "all good"]).assert().success();

    store
        .cmd()
        .args(["search", "timeout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Upstream TIMEOUT"))
        .stdout(predicate::str::contains("all good").not());
}

#[test]
fn clear_empties_store() {
    let store = Store::new();
    store.cmd().args(["log", "one"]).assert().success();
    store.cmd().args(["log", "two"]).assert().success();

    store
        .cmd()
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 2 entries."));

    assert!(store.list_json(&[]).is_empty());
}

#[test]
fn unknown_level_is_rejected() {
    let store = Store::new();
    store
        .cmd()
        .args(["log", "x", "--level", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loud"));
}

#[test]
fn invalid_config_fails_before_running() {
    let store = Store::new();
    let config = store.write_config("[diagnostics]\nmax_logs = 0\n");

    store
        .cmd()
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn corrupt_store_warns_and_starts_empty() {
    let store = Store::new();
    std::fs::write(store.path(), "{corrupt").expect("failed to write store");

    store
        .cmd()
        .env("RUST_LOG", "warn")
        .args(["log", "after-corruption"])
        .assert()
        .success()
        .stderr(predicate::str::contains("failed to load persisted diagnostics"));

    let entries = store.list_json(&[]);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["message"], "after-corruption");
}

#[test]
fn failed_probe_records_retries() {
    let store = Store::new();
    let config = store.write_config(
        "[retry.query]\nmax_attempts = 2\ninitial_delay_ms = 1\nmax_delay_ms = 1\n",
    );

    store
        .cmd()
        .arg("--config")
        .arg(&config)
        .args(["probe", "http://127.0.0.1:9/", "--timeout-ms", "500"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Attempts:    2"))
        .stderr(predicate::str::contains("after 2 attempts"));

    assert_eq!(store.list_json(&["--level", "warning"]).len(), 1);
    let errors = store.list_json(&["--level", "error"]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["context"]["attempts"], 2);
}
