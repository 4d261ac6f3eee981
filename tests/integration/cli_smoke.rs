//! CLI smoke tests: argument surface and exit-status mapping.

use assert_cmd::Command;
use predicates::prelude::*;

fn geoinv() -> Command {
    Command::cargo_bin("geoinv").unwrap()
}

#[test]
fn help_lists_subcommands() {
    geoinv()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn missing_explicit_config_fails_with_message() {
    geoinv()
        .args(["--config", "/nonexistent/geoinv.toml", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn validate_reports_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("geoinv.toml");
    std::fs::write(
        &config,
        "portal_url = \"https://portal.example.com\"\ntable = \"T\"\n",
    )
    .unwrap();

    geoinv()
        .args(["--config", config.to_str().unwrap(), "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration is valid"))
        .stdout(predicate::str::contains("https://portal.example.com"));
}

#[test]
fn validate_rejects_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("geoinv.toml");
    std::fs::write(&config, "portal_url = \"not-a-url\"\n").unwrap();

    geoinv()
        .args(["--config", config.to_str().unwrap(), "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}
