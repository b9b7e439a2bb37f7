//! Exit status and JSON output of the `pdf-combiner` binary.
//!
//! Only failure paths are covered here: they are reported before any
//! libpdfium is loaded.

#![cfg(feature = "cli")]

use serde_json::Value;
use std::process::Command;

fn pdf_combiner() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pdf-combiner"));
    cmd.env_remove("RUST_LOG").arg("--no-progress");
    cmd
}

#[test]
fn json_failure_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = pdf_combiner()
        .arg("--json")
        .arg("merge")
        .arg(dir.path().join("missing.pdf"))
        .arg("-o")
        .arg(dir.path().join("out.pdf"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["status"], "failure");
    assert!(!dir.path().join("out.pdf").exists());
}

#[test]
fn plain_failure_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let status = pdf_combiner()
        .arg("--quiet")
        .arg("merge")
        .arg(dir.path().join("missing.pdf"))
        .arg("-o")
        .arg(dir.path().join("out.pdf"))
        .status()
        .unwrap();
    assert!(!status.success());
}
