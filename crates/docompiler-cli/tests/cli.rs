//! Command line behaviour of the `docompiler` binary.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn docompiler(scratch: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("docompiler").expect("binary exists");
    let _ = cmd
        .env("DOCOMPILER_TMPDIR", scratch.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn no_arguments_is_a_usage_error() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let _ = docompiler(&scratch)
        .assert()
        .code(2)
        .stderr(predicate::str::starts_with(
            "!!! expect exactly one argument: the document object",
        ))
        .stdout(predicate::str::contains("USAGE: docompiler DOCUMENT_OBJECT"));
}

#[test]
fn two_arguments_is_a_usage_error() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let _ = docompiler(&scratch)
        .args(["one.zip", "two.zip"])
        .assert()
        .code(2)
        .stderr(predicate::str::starts_with("!!!"));
}

#[test]
fn missing_input_fails_with_message() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let missing = scratch.path().join("absent.zip");
    let _ = docompiler(&scratch)
        .arg(&missing)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"))
        .stdout(predicate::str::contains(">>> tmp dir is:"));
}

#[test]
fn help_lists_the_positional_argument() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let _ = docompiler(&scratch)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("DOCUMENT_OBJECT"))
        .stdout(predicate::str::contains("--latexmk"));
}
