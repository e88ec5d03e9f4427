//! Command-line behaviour of the `train` and `predict` binaries.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn train() -> Command {
    Command::cargo_bin("train").expect("train binary")
}

#[test]
fn test_help() {
    train()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("configs/default.toml"));
}

#[test]
fn test_requires_config_argument() {
    train().assert().failure();
}

#[test]
fn test_rejects_non_toml_name() {
    let tmp = TempDir::new().expect("tmp");
    train()
        .arg("distilbert.yaml")
        .arg("--root")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(".toml"));
}

#[test]
fn test_missing_default_config() {
    let tmp = TempDir::new().expect("tmp");
    train()
        .arg("distilbert.toml")
        .arg("--root")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("default.toml"));

    // Entry point creates the project directories before anything else.
    assert!(tmp.path().join("logs").is_dir());
    assert!(tmp.path().join("models").is_dir());
}

#[test]
fn test_unknown_override_key() {
    let tmp = TempDir::new().expect("tmp");
    let configs = tmp.path().join("configs");
    fs::create_dir_all(&configs).expect("mkdir");
    fs::write(configs.join("default.toml"), "epochs = 1\n").expect("default");
    fs::write(configs.join("custom.toml"), "colour = \"blue\"\n").expect("custom");

    let output = train()
        .arg("custom.toml")
        .env("BANPL_ROOT", tmp.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("run train");
    assert!(!output.status.success());

    // Reported once on the console, and kept in the run log.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("custom key 'colour' not found").count(), 1, "{stderr}");

    let log = fs::read_dir(tmp.path().join("logs"))
        .expect("logs")
        .filter_map(|e| e.ok())
        .next()
        .expect("log file");
    let content = fs::read_to_string(log.path()).expect("read log");
    assert!(content.contains("custom key 'colour' not found"));
}

#[test]
fn test_predict_without_model() {
    let tmp = TempDir::new().expect("tmp");
    Command::cargo_bin("predict")
        .expect("predict binary")
        .arg("--root")
        .arg(tmp.path())
        .arg("--cpu")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config.json"));
}
