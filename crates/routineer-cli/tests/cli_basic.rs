//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway data
//! directory and verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new("cargo")
        .args(["run", "-p", "routineer-cli", "--"])
        .args(args)
        .env("ROUTINEER_DATA_DIR", data_dir)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn routine_add_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        dir.path(),
        &["routine", "add", "Morning inspection", "--frequency", "daily"],
    );
    assert_eq!(code, 0, "routine add failed");
    assert!(stdout.contains("Routine created:"));

    let (code, stdout, _) = run_cli(dir.path(), &["routine", "list"]);
    assert_eq!(code, 0, "routine list failed");
    let routines: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(routines.as_array().unwrap().len(), 1);
}

#[test]
fn exec_lifecycle_persists_across_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        dir.path(),
        &["routine", "add", "Filter swap", "--frequency", "daily"],
    );
    assert_eq!(code, 0);
    let routine_id = stdout
        .trim()
        .rsplit(' ')
        .next()
        .unwrap()
        .to_string();

    let (code, _, _) = run_cli(dir.path(), &["exec", "start", &routine_id]);
    assert_eq!(code, 0, "exec start failed");

    let (code, stdout, _) = run_cli(dir.path(), &["exec", "status", &routine_id]);
    assert_eq!(code, 0, "exec status failed");
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["status"], "running");

    let (code, _, _) = run_cli(dir.path(), &["exec", "pause", &routine_id]);
    assert_eq!(code, 0, "exec pause failed");

    let (code, stdout, _) = run_cli(dir.path(), &["exec", "status", &routine_id]);
    assert_eq!(code, 0);
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["status"], "paused");

    let (code, _, _) = run_cli(dir.path(), &["exec", "resume", &routine_id]);
    assert_eq!(code, 0, "exec resume failed");
    let (code, _, _) = run_cli(dir.path(), &["exec", "finish", &routine_id]);
    assert_eq!(code, 0, "exec finish failed");

    let (code, stdout, _) = run_cli(dir.path(), &["exec", "status", &routine_id]);
    assert_eq!(code, 0);
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["status"], "finished");
}

#[test]
fn finish_requires_attachment_when_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        dir.path(),
        &[
            "routine",
            "add",
            "Audited check",
            "--frequency",
            "daily",
            "--requires-attachment",
        ],
    );
    assert_eq!(code, 0);
    let routine_id = stdout.trim().rsplit(' ').next().unwrap().to_string();

    let (code, _, _) = run_cli(dir.path(), &["exec", "start", &routine_id]);
    assert_eq!(code, 0);

    let (code, _, stderr) = run_cli(dir.path(), &["exec", "finish", &routine_id]);
    assert_ne!(code, 0, "finish should fail without an attachment");
    assert!(stderr.contains("attachment"));

    let (code, _, _) = run_cli(
        dir.path(),
        &["exec", "attach", &routine_id, "report.pdf"],
    );
    assert_eq!(code, 0, "exec attach failed");
    let (code, _, _) = run_cli(dir.path(), &["exec", "finish", &routine_id]);
    assert_eq!(code, 0, "finish should succeed with an attachment");
}

#[test]
fn board_and_summary_run_clean() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(
        dir.path(),
        &["routine", "add", "Daily check", "--frequency", "daily"],
    );
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(dir.path(), &["board", "--json"]);
    assert_eq!(code, 0, "board failed");
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["status"], "not_started");

    let (code, stdout, _) = run_cli(dir.path(), &["summary"]);
    assert_eq!(code, 0, "summary failed");
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["planned"], 1);
    assert_eq!(summary["pending"], 1);
}
