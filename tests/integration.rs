//! Integration tests for the peerbook CLI surface

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Test environment with an initialized peerbook config
struct TestEnv {
    _temp_dir: TempDir,
    config_path: PathBuf,
}

impl TestEnv {
    /// Create a new test environment pointing at the given server URL
    fn new(server_url: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        peerbook_cmd()
            .args([
                "init",
                "--config",
                config_path.to_str().unwrap(),
                "--server",
                server_url,
            ])
            .assert()
            .success();

        Self {
            _temp_dir: temp_dir,
            config_path,
        }
    }

    /// Run peerbook with this test env's config
    fn peerbook(&self) -> AssertCommand {
        let mut cmd = peerbook_cmd();
        cmd.args(["--config", self.config_path.to_str().unwrap()]);
        cmd
    }
}

/// Get the peerbook binary command
fn peerbook_cmd() -> AssertCommand {
    AssertCommand::cargo_bin("peerbook").unwrap()
}

/// A local address nothing listens on, so requests fail fast
const DEAD_SERVER: &str = "http://127.0.0.1:1";

// =============================================================================
// Init Tests
// =============================================================================

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    peerbook_cmd()
        .args([
            "init",
            "--config",
            config_path.to_str().unwrap(),
            "--server",
            "https://directory.example.com/api",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized peerbook configuration"));

    assert!(config_path.exists());
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("https://directory.example.com/api"));
    assert!(content.contains("[keys.form]"));
    assert!(content.contains("name_order"));
}

#[test]
fn test_init_fails_if_config_exists_without_force() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    fs::write(&config_path, "existing config").unwrap();

    peerbook_cmd()
        .args([
            "init",
            "--config",
            config_path.to_str().unwrap(),
            "--server",
            "http://localhost:8080",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration already exists"));

    // Untouched
    assert_eq!(fs::read_to_string(&config_path).unwrap(), "existing config");
}

#[test]
fn test_init_force_overwrites_existing_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    fs::write(&config_path, "old config").unwrap();

    peerbook_cmd()
        .args([
            "init",
            "--config",
            config_path.to_str().unwrap(),
            "--server",
            "http://localhost:8080",
            "--force",
        ])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("http://localhost:8080"));
}

#[test]
fn test_init_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nested").join("dir").join("config.toml");

    peerbook_cmd()
        .args([
            "init",
            "--config",
            config_path.to_str().unwrap(),
            "--server",
            "http://localhost:8080",
        ])
        .assert()
        .success();

    assert!(config_path.exists());
}

// =============================================================================
// Add Tests
// =============================================================================

#[test]
fn test_add_rejects_empty_names() {
    let env = TestEnv::new(DEAD_SERVER);

    // Whitespace-only names are empty after normalization; no request is
    // attempted, so the dead server is never contacted.
    env.peerbook()
        .args(["add", "   ", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not both be empty"));
}

#[test]
fn test_add_reports_transport_failure() {
    let env = TestEnv::new(DEAD_SERVER);

    env.peerbook()
        .args(["add", "Ada", "Lovelace"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to add contact"));
}

#[test]
fn test_add_accepts_single_name() {
    let env = TestEnv::new(DEAD_SERVER);

    // One non-empty name passes validation; the failure comes from the
    // transport, not the validator.
    env.peerbook()
        .args(["add", "Ada"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to add contact"));
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_missing_config_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("does-not-exist.toml");

    peerbook_cmd()
        .args(["--config", config_path.to_str().unwrap(), "add", "Ada"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_invalid_config_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "server = \"not a table\"").unwrap();

    peerbook_cmd()
        .args(["--config", config_path.to_str().unwrap(), "add", "Ada"])
        .assert()
        .failure();
}
