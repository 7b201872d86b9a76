#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const VALID_CONFIG: &str = "\
board:
  id: wE7cxYDT
  key: k
  token: t
board_url: https://trello.com/b/wE7cxYDT
";

fn deployq(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("deployq").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("DEPLOYQ_CONFIG")
        .env_remove("TRELLO_KEY")
        .env_remove("TRELLO_TOKEN")
        .env_remove("TRELLO_BOARD_ID");
    cmd
}

fn write_config(dir: &TempDir, body: &str) {
    std::fs::write(dir.path().join("deployq.yaml"), body).unwrap();
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    deployq(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("enqueue"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("serve"));
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_complete_config() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, VALID_CONFIG);
    deployq(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn validate_reports_missing_credentials() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "board:\n  id: b1\n");
    deployq(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] board key missing"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn credentials_can_come_from_environment() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "board:\n  id: b1\n");
    deployq(&dir)
        .env("TRELLO_KEY", "k")
        .env("TRELLO_TOKEN", "t")
        .args(["config", "validate"])
        .assert()
        .success();
}

#[test]
fn validate_json_lists_warnings() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, &format!("{VALID_CONFIG}tick_interval_ms: 200\n"));
    let out = deployq(&dir)
        .args(["--json", "config", "validate"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["warnings"][0]["level"], "warning");
}

#[test]
fn show_redacts_secrets() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, VALID_CONFIG);
    deployq(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wE7cxYDT"))
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("In Line"));
}

#[test]
fn config_found_from_subdirectory() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, VALID_CONFIG);
    let sub = dir.path().join("services/api");
    std::fs::create_dir_all(&sub).unwrap();
    deployq(&dir)
        .current_dir(&sub)
        .args(["config", "validate"])
        .assert()
        .success();
}

#[test]
fn explicit_config_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("other.yaml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    deployq(&dir)
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success();
}

#[test]
fn missing_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    deployq(&dir)
        .arg("state")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config not found"));
}

// ---------------------------------------------------------------------------
// commands
// ---------------------------------------------------------------------------

#[test]
fn commands_fail_cleanly_when_board_unreachable() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "board:\n  id: b1\n  key: k\n  token: t\n  api_base: http://127.0.0.1:1\n",
    );
    deployq(&dir)
        .args(["enqueue", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"))
        .stderr(predicate::str::contains("failed to resolve board lists"));
}
