//! Common test utilities shared across integration tests.
//!
//! Task `n` always has id `tw-{n}` and number `n`, so assertions can talk
//! about task numbers.

#![allow(dead_code)]

use chrono::Utc;
use std::path::Path;
use std::process::{Command, Output};
use taskweave::domain::{Priority, Subtask, Task, TaskId, TaskStatus, TenantId};
use taskweave::storage::GraphStore;
use taskweave::storage::in_memory::InMemoryStore;

pub fn tenant() -> TenantId {
    TenantId::new("acme").unwrap()
}

pub fn other_tenant() -> TenantId {
    TenantId::new("globex").unwrap()
}

pub fn id(n: u32) -> TaskId {
    TaskId::new(format!("tw-{n}"))
}

pub fn task(n: u32, deps: &[u32]) -> Task {
    task_with_status(n, deps, TaskStatus::Pending)
}

pub fn task_with_status(n: u32, deps: &[u32], status: TaskStatus) -> Task {
    let now = Utc::now();
    Task {
        id: id(n),
        number: n,
        title: format!("Task {n}"),
        description: None,
        status,
        priority: Priority::Medium,
        dependencies: deps.iter().copied().map(id).collect(),
        created_at: now,
        updated_at: now,
    }
}

pub fn subtask(parent: u32, n: u32, status: TaskStatus) -> Subtask {
    Subtask {
        task_id: id(parent),
        number: n,
        title: format!("Subtask {parent}.{n}"),
        status,
    }
}

/// A store for `tenant()` holding exactly `tasks`.
pub async fn store_with(tasks: Vec<Task>) -> InMemoryStore {
    let store = InMemoryStore::new("tw");
    store.import_tasks(&tenant(), tasks).await;
    store
}

/// Dependency lists by task number, for whole-graph comparisons.
pub async fn edges(store: &InMemoryStore, tenant: &TenantId) -> Vec<(u32, Vec<TaskId>)> {
    store
        .list_tasks(tenant)
        .await
        .unwrap()
        .into_iter()
        .map(|t| (t.number, t.dependencies))
        .collect()
}

/// Run the taskweave binary in `dir` with colors off.
pub fn run_taskweave_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_taskweave"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute taskweave binary")
}
