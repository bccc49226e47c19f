use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_help_describes_watch_surface() {
    let mut cmd = Command::new(cargo_bin!("paywatch"));
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--endpoint"))
        .stdout(predicate::str::contains("--interval-ms"))
        .stdout(predicate::str::contains("--once"));
}

#[test]
fn test_missing_endpoint_is_rejected() {
    let mut cmd = Command::new(cargo_bin!("paywatch"));
    cmd.arg("inv_1");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--endpoint"));
}

#[test]
fn test_invalid_endpoint_is_reported() {
    let mut cmd = Command::new(cargo_bin!("paywatch"));
    cmd.arg("inv_1")
        .arg("--endpoint")
        .arg("not a url")
        .arg("--once");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid gateway endpoint"));
}
