//! Integration tests for the `marionette` binary.
//!
//! Tests cover:
//! - `classes` and `inspect` reflection output
//! - `run` with scenario and config files
//! - Error reporting and exit codes

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn marionette(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_marionette"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("MARIONETTE_LOG")
        .output()
        .expect("failed to launch marionette")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

// ===== Reflection =====

#[test]
fn test_classes_prints_tree() {
    let output = marionette(&["classes"]);
    assert!(output.status.success());
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["Object", "  Node", "    Counter", "    Logger"]);
}

#[test]
fn test_inspect_lists_members() {
    let output = marionette(&["inspect", "Counter"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("Counter : Node : Object"));
    assert!(text.contains("  value: int"));
    assert!(text.contains("  limit: int"));
    assert!(text.contains("  name: String"));
    assert!(text.contains("add(amount: int) -> int"));
    assert!(text.contains("value_changed(value: int)"));
    assert!(text.contains("get_class"));
}

#[test]
fn test_inspect_own_members_only() {
    let output = marionette(&["inspect", "Counter", "--own"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("  value: int"));
    assert!(!text.contains("  name: String"));
    assert!(!text.contains("get_class"));
}

#[test]
fn test_inspect_unknown_class() {
    let output = marionette(&["inspect", "Missing"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unknown class 'Missing'"));
}

// ===== Scenarios =====

#[test]
fn test_run_demo_scenario() {
    let demos = demos_dir();
    let scenario = demos.join("counter.toml");
    let config = demos.join("marionette.toml");
    let output = marionette(&[
        "run",
        scenario.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("call counter.add  -> 2"));
    assert!(text.contains("call counter.increment  -> 3"));
    assert!(text.contains("flush  1 executed"));
    assert!(text.contains("dump counter  freed"));
    assert!(text.contains("done (1 live objects)"));
}

#[test]
fn test_run_reports_step_failure() {
    let dir = TempDir::new().unwrap();
    let scenario = write(
        &dir,
        "bad.toml",
        r#"
[[object]]
name = "counter"
class = "Counter"

[[step]]
op = "emit"
object = "counter"
signal = "no_such_signal"
"#,
    );

    let output = marionette(&["run", scenario.to_str().unwrap()]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("step 1 failed"));
    assert!(err.contains("no_such_signal"));
}

#[test]
fn test_run_respects_object_limit() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "marionette.toml", "[objects]\nmax_objects = 1\n");
    let scenario = write(
        &dir,
        "two.toml",
        r#"
[[object]]
name = "a"
class = "Node"

[[object]]
name = "b"
class = "Node"
"#,
    );

    let output = marionette(&[
        "run",
        scenario.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Object limit reached (1)"));
}

#[test]
fn test_run_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "marionette.toml", "[queue]\nmax_pending = 0\n");
    let scenario = write(&dir, "empty.toml", "");

    let output = marionette(&[
        "run",
        scenario.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("max_pending"));
}
