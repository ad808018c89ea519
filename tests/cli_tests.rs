//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use common::{invalid_agents_fixture, invalid_config_fixture, valid_agents_fixture, valid_config_fixture};

/// Get a command for the replaxy binary, isolated from the caller's environment
fn replaxy_cmd() -> Command {
    let mut cmd = Command::cargo_bin("replaxy").unwrap();
    for var in [
        "REPLAXY_CONFIG",
        "REPLAXY_AGENTS_CONFIG",
        "AGENTS_CONFIG_PATH",
        "REPLAXY_MEM0_API_KEY",
        "MEM0_API_KEY",
        "REPLAXY_LOG_LEVEL",
        "REPLAXY_LOG_FILE",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn path_arg(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    replaxy_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Replaxy"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("agents"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("version"));
}

#[test]
fn test_version_command() {
    replaxy_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("replaxy"))
        .stdout(predicate::str::contains("Build Information"))
        .stdout(predicate::str::contains("Git Hash"))
        .stdout(predicate::str::contains("Target"));
}

#[test]
fn test_short_version_flag() {
    replaxy_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("replaxy"));
}

#[test]
fn test_unknown_command() {
    replaxy_cmd()
        .arg("dial")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_fixture() {
    replaxy_cmd()
        .args(["config", "show", "--config"])
        .arg(path_arg(&valid_config_fixture()))
        .assert()
        .success()
        .stdout(predicate::str::contains("[agents]"))
        .stdout(predicate::str::contains("[memory]"))
        .stdout(predicate::str::contains("[call]"))
        .stdout(predicate::str::contains("[logging]"))
        .stdout(predicate::str::contains("console_room"));
}

#[test]
fn test_config_show_masks_api_key() {
    replaxy_cmd()
        .args(["config", "show", "--config"])
        .arg(path_arg(&valid_config_fixture()))
        .env("MEM0_API_KEY", "m0-very-secret")
        .assert()
        .success()
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("m0-very-secret").not());
}

#[test]
fn test_config_validate_valid() {
    replaxy_cmd()
        .args(["config", "validate", "--config"])
        .arg(path_arg(&valid_config_fixture()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_validate_invalid() {
    replaxy_cmd()
        .args(["config", "validate", "--config"])
        .arg(path_arg(&invalid_config_fixture()))
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E102"));
}

#[test]
fn test_config_validate_missing_file() {
    replaxy_cmd()
        .args(["config", "validate", "--config", "/nonexistent/replaxy.toml"])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E100"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("replaxy.toml");

    replaxy_cmd()
        .args(["config", "init", "--path"])
        .arg(path_arg(&path))
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"));

    assert!(path.exists());

    // The generated file is itself valid
    replaxy_cmd()
        .args(["config", "validate", "--config"])
        .arg(path_arg(&path))
        .assert()
        .success();
}

#[test]
fn test_config_init_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("replaxy.toml");
    std::fs::write(&path, "# keep me\n").unwrap();

    replaxy_cmd()
        .args(["config", "init", "--path"])
        .arg(path_arg(&path))
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# keep me\n");

    replaxy_cmd()
        .args(["config", "init", "--force", "--path"])
        .arg(path_arg(&path))
        .assert()
        .success();
    assert_ne!(std::fs::read_to_string(&path).unwrap(), "# keep me\n");
}

// ─────────────────────────────────────────────────────────────────
// Agents Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_agents_list_builtin() {
    let dir = TempDir::new().unwrap();
    replaxy_cmd()
        .current_dir(dir.path())
        .args(["agents", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("built-in defaults"))
        .stdout(predicate::str::contains("starter"))
        .stdout(predicate::str::contains("Sarah"))
        .stdout(predicate::str::contains("James"));
}

#[test]
fn test_agents_list_from_file() {
    replaxy_cmd()
        .args(["agents", "list", "--agents"])
        .arg(path_arg(&valid_agents_fixture()))
        .assert()
        .success()
        .stdout(predicate::str::contains("valid_agents.toml"))
        .stdout(predicate::str::contains("front"))
        .stdout(predicate::str::contains("billing, tech"));
}

#[test]
fn test_agents_list_invalid_file_falls_back() {
    replaxy_cmd()
        .args(["agents", "list", "--agents"])
        .arg(path_arg(&invalid_agents_fixture()))
        .assert()
        .success()
        .stdout(predicate::str::contains("built-in defaults"));
}

#[test]
fn test_agents_show() {
    replaxy_cmd()
        .args(["agents", "show", "tech", "--agents"])
        .arg(path_arg(&valid_agents_fixture()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Kai"))
        .stdout(predicate::str::contains("support"))
        .stdout(predicate::str::contains("kai-voice"))
        .stdout(predicate::str::contains("{topic}"));
}

#[test]
fn test_agents_show_unknown() {
    replaxy_cmd()
        .args(["agents", "show", "nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Persona not found: nobody"));
}

#[test]
fn test_agents_validate_valid() {
    replaxy_cmd()
        .args(["agents", "validate", "--agents"])
        .arg(path_arg(&valid_agents_fixture()))
        .assert()
        .success()
        .stdout(predicate::str::contains("3 personas, entry 'front'"));
}

#[test]
fn test_agents_validate_invalid() {
    replaxy_cmd()
        .args(["agents", "validate", "--agents"])
        .arg(path_arg(&invalid_agents_fixture()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("E300"));
}

#[test]
fn test_agents_validate_through_config() {
    replaxy_cmd()
        .args(["agents", "validate", "--config"])
        .arg(path_arg(&valid_config_fixture()))
        .assert()
        .success()
        .stdout(predicate::str::contains("entry 'front'"));
}

// ─────────────────────────────────────────────────────────────────
// Console Call Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_run_console_call_with_transfer() {
    replaxy_cmd()
        .args(["run", "--config"])
        .arg(path_arg(&valid_config_fixture()))
        .write_stdin("hello\n/call call_tech_agent {\"topic\": \"no dial tone\"}\n/end\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[Mia (front) is now on the call"))
        .stdout(predicate::str::contains(
            "Mia: Transferring you to Kai, our technical support specialist, who will help you with: no dial tone.",
        ))
        .stdout(predicate::str::contains("[Kai (tech) is now on the call, voice cartesia/sonic-3:kai-voice]"))
        .stdout(predicate::str::contains("thank the caller and say goodbye"))
        .stdout(predicate::str::contains("\"total_handoffs\": 1"))
        .stdout(predicate::str::contains("\"status\": \"skipped\""));
}

#[test]
fn test_run_builtin_personas_end_of_input() {
    let dir = TempDir::new().unwrap();
    replaxy_cmd()
        .current_dir(dir.path())
        .env("REPLAXY_MEMORY_ENABLED", "false")
        .args(["run", "--user-name", "Dana"])
        .write_stdin("/call call_booking_agent {\"appointment_topic\": \"dentist\"}\n/call call_starter_agent\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[Tom (starter) is now on the call"))
        .stdout(predicate::str::contains("who will help you schedule: dentist."))
        .stdout(predicate::str::contains("James: Transferring you back to Tom."))
        .stdout(predicate::str::contains("\"total_handoffs\": 2"));
}

#[test]
fn test_run_failed_transfer_keeps_caller() {
    let dir = TempDir::new().unwrap();
    replaxy_cmd()
        .current_dir(dir.path())
        .args(["run"])
        .write_stdin("/call call_support_agent\n/context\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Tom: I apologize, but I'm having trouble transferring you right now.",
        ))
        .stdout(predicate::str::contains("\"handoff_errors\": 1"));
}

#[test]
fn test_run_unreadable_input_still_ends_call() {
    let dir = TempDir::new().unwrap();
    replaxy_cmd()
        .current_dir(dir.path())
        .args(["run"])
        .write_stdin(b"hello\n\xff\n".to_vec())
        .assert()
        .success()
        .stdout(predicate::str::contains("Tom: <reply: say goodbye, uninterruptible>"))
        .stdout(predicate::str::contains("\"total_handoffs\": 0"));
}

#[test]
fn test_run_missing_config() {
    replaxy_cmd()
        .args(["run", "--config", "/nonexistent/replaxy.toml"])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("Configuration file not found"));
}
