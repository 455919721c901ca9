//! Integration tests for the `pkgwalk` binary.
//!
//! These tests create small installed trees and verify the printed
//! event stream.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "pkgwalk-cli", "--bin", "pkgwalk", "--quiet", "--"]);
    cmd
}

fn write_manifest(dir: &Path, body: &serde_json::Value) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("package.json"),
        serde_json::to_string_pretty(body).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_walk_prints_packages_and_done() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_manifest(
        root,
        &serde_json::json!({
            "name": "app", "version": "1.0.0",
            "dependencies": {"left-pad": "^1.0.0"}
        }),
    );
    write_manifest(
        &root.join("node_modules/left-pad"),
        &serde_json::json!({"name": "left-pad", "version": "1.3.0"}),
    );

    let output = cargo_bin()
        .arg("--cwd")
        .arg(root)
        .output()
        .expect("failed to run pkgwalk");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("app@1.0.0 ."));
    assert!(stdout.contains("left-pad@1.3.0 node_modules/left-pad (via app)"));
    assert_eq!(stdout.lines().last(), Some("done"));
}

#[test]
fn test_walk_json_output() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_manifest(
        root,
        &serde_json::json!({
            "name": "app", "version": "1.0.0",
            "main": "index.js"
        }),
    );

    let output = cargo_bin()
        .arg("--cwd")
        .arg(root)
        .arg("--json")
        .output()
        .expect("failed to run pkgwalk");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next().unwrap();
    let record: serde_json::Value = serde_json::from_str(first).unwrap();
    assert_eq!(record["name"], "app");
    assert_eq!(record["version"], "1.0.0");
    assert_eq!(record["path"], ".");
    assert_eq!(record["main"], "index.js");
    assert_eq!(stdout.lines().last(), Some("done"));
}

#[test]
fn test_walk_missing_dependency_fails() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_manifest(
        root,
        &serde_json::json!({
            "name": "app", "version": "1.0.0",
            "dependencies": {"missing-dep": "^1.0.0"}
        }),
    );

    let output = cargo_bin()
        .arg("--cwd")
        .arg(root)
        .output()
        .expect("failed to run pkgwalk");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing-dep"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("done"));
}
