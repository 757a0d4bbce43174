//! Integration tests for the taskweave CLI binary.

mod common;

use common::{run_taskweave_in_dir, subtask, task, task_with_status, tenant};
use rstest::{fixture, rstest};
use taskweave::domain::TaskStatus;
use taskweave::storage::in_memory::{InMemoryStore, save_to_jsonl};
use tempfile::TempDir;

// ============================================================================
// Test Fixtures
// ============================================================================

/// Initialized repository with default tenant "acme" and an empty task file
#[fixture]
fn initialized_dir() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let output = run_taskweave_in_dir(temp.path(), &["init", "--default-tenant", "acme", "--quiet"]);
    assert!(
        output.status.success(),
        "Failed to initialize taskweave: {:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    temp
}

/// Write tasks for tenant "acme" into the repository's task file
async fn seed(dir: &TempDir, store: &InMemoryStore) {
    let path = dir.path().join(".taskweave").join("tasks.jsonl");
    save_to_jsonl(store, &path).await.unwrap();
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// ============================================================================
// Repository setup
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let output = run_taskweave_in_dir(std::env::temp_dir().as_path(), &["--help"]);
    assert!(output.status.success());
    let out = stdout(&output);
    for command in ["init", "validate", "fix", "next", "check-cycle"] {
        assert!(out.contains(command), "help is missing {command}");
    }
}

#[rstest]
fn test_init_twice_fails(initialized_dir: TempDir) {
    let output = run_taskweave_in_dir(initialized_dir.path(), &["init", "--quiet"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already initialized"));
}

#[test]
fn test_command_outside_repository_fails() {
    let temp = TempDir::new().unwrap();
    let output = run_taskweave_in_dir(temp.path(), &["validate", "--tenant", "acme"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Not a taskweave repository"));
}

#[test]
fn test_missing_tenant_fails() {
    let temp = TempDir::new().unwrap();
    assert!(run_taskweave_in_dir(temp.path(), &["init", "-q"]).status.success());

    let output = run_taskweave_in_dir(temp.path(), &["next"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Missing tenant"));
}

// ============================================================================
// Commands
// ============================================================================

#[rstest]
fn test_validate_empty_repository(initialized_dir: TempDir) {
    let output = run_taskweave_in_dir(initialized_dir.path(), &["validate"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No dependency issues found"));
}

#[rstest]
#[tokio::test]
async fn test_validate_then_fix_json(initialized_dir: TempDir) {
    let store = InMemoryStore::new("tw");
    store
        .import_tasks(&tenant(), vec![task(1, &[2]), task(2, &[1]), task(3, &[3])])
        .await;
    seed(&initialized_dir, &store).await;

    let output = run_taskweave_in_dir(initialized_dir.path(), &["--json", "validate"]);
    assert!(output.status.success());
    let report = json(&output);
    assert_eq!(report["tasksChecked"], 3);
    assert_eq!(report["issues"].as_array().unwrap().len(), 3);

    let output = run_taskweave_in_dir(initialized_dir.path(), &["fix", "--json"]);
    assert!(output.status.success());
    let report = json(&output);
    assert_eq!(report["fixedCount"], 2);
    assert_eq!(report["perTaskFixes"].as_array().unwrap().len(), 2);

    let output = run_taskweave_in_dir(initialized_dir.path(), &["--json", "fix"]);
    assert_eq!(json(&output)["fixedCount"], 0);
}

#[rstest]
#[tokio::test]
async fn test_next_prefers_subtask(initialized_dir: TempDir) {
    let store = InMemoryStore::new("tw");
    store
        .import_tasks(
            &tenant(),
            vec![task_with_status(1, &[], TaskStatus::Done), task(2, &[1])],
        )
        .await;
    store
        .import_subtasks(&tenant(), vec![subtask(2, 1, TaskStatus::InProgress)])
        .await;
    seed(&initialized_dir, &store).await;

    let output = run_taskweave_in_dir(initialized_dir.path(), &["next"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Subtask 2.1 - Subtask 2.1 [in-progress]"));

    let output = run_taskweave_in_dir(initialized_dir.path(), &["next", "--json"]);
    let next = json(&output);
    assert_eq!(next["isSubtask"], true);
    assert_eq!(next["unit"]["kind"], "subtask");
}

#[rstest]
fn test_next_for_other_tenant_is_empty(initialized_dir: TempDir) {
    let output = run_taskweave_in_dir(initialized_dir.path(), &["--tenant", "globex", "next"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("no eligible task"));
}

#[rstest]
#[case::closes_cycle("tw-1", "tw-2", true)]
#[case::safe("tw-2", "tw-1", false)]
#[tokio::test]
async fn test_check_cycle(
    initialized_dir: TempDir,
    #[case] task_id: &str,
    #[case] depends_on: &str,
    #[case] expected: bool,
) {
    let store = InMemoryStore::new("tw");
    store.import_tasks(&tenant(), vec![task(1, &[]), task(2, &[1])]).await;
    seed(&initialized_dir, &store).await;

    let output = run_taskweave_in_dir(
        initialized_dir.path(),
        &["--json", "check-cycle", task_id, depends_on],
    );
    assert!(output.status.success());
    assert_eq!(json(&output)["wouldCreateCycle"], expected);
}

#[rstest]
fn test_check_cycle_unknown_candidate(initialized_dir: TempDir) {
    let output = run_taskweave_in_dir(initialized_dir.path(), &["check-cycle", "tw-1", "tw-404"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Task not found"));
}
