//! Storage abstraction layer for taskweave.
//!
//! The graph engine never owns data: every operation reads a fresh tenant
//! snapshot through [`GraphStore`] and writes per-task dependency lists back
//! through it. Backends:
//!
//! - **In-memory**: tenant-partitioned maps behind `Arc<Mutex<..>>`
//! - **JSONL**: the in-memory backend loaded from, and written back to, a
//!   JSON Lines file after every write. A write whose save fails is rolled
//!   back in memory, so the working set never runs ahead of the file.
//!
//! # Test Utilities
//!
//! [`MockStore`] wraps an in-memory store and injects failures. It is
//! available in unit tests and, for downstream crates, behind the
//! `test-util` feature.

use crate::domain::{HistoryEntry, Subtask, Task, TaskId, TenantId};
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod in_memory;

/// Snapshot source and per-task dependency sink.
///
/// Every method is scoped to exactly one tenant; implementations must never
/// return or touch another tenant's data.
///
/// # Atomicity
///
/// `update_dependencies` is atomic for a single task only. Callers that
/// update several tasks get no cross-task transaction.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// All live tasks of the tenant, with their dependency lists and statuses.
    ///
    /// An unknown tenant has no tasks.
    async fn list_tasks(&self, tenant: &TenantId) -> Result<Vec<Task>>;

    /// Subtasks of one task, ordered by number.
    async fn list_subtasks(&self, tenant: &TenantId, task_id: &TaskId) -> Result<Vec<Subtask>>;

    /// Replace one task's dependency list, returning the updated task.
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskNotFound` if the task doesn't exist.
    async fn update_dependencies(
        &mut self,
        tenant: &TenantId,
        task_id: &TaskId,
        dependencies: Vec<TaskId>,
    ) -> Result<Task>;

    /// Append an audit entry.
    ///
    /// Callers treat this as fire-and-forget: a failure is logged, never
    /// propagated.
    async fn append_history(&mut self, tenant: &TenantId, entry: HistoryEntry) -> Result<()>;
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// JSONL file storage (persistent)
    Jsonl(PathBuf),
}

impl StorageBackend {
    /// Returns the data file path for file-based backends.
    pub fn data_path(&self) -> Option<&Path> {
        match self {
            StorageBackend::Jsonl(path) => Some(path),
            StorageBackend::InMemory => None,
        }
    }
}

/// In-memory store that rewrites its JSONL file after every change.
struct JsonlBackedStore {
    inner: in_memory::InMemoryStore,
    path: PathBuf,
}

#[async_trait]
impl GraphStore for JsonlBackedStore {
    async fn list_tasks(&self, tenant: &TenantId) -> Result<Vec<Task>> {
        self.inner.list_tasks(tenant).await
    }

    async fn list_subtasks(&self, tenant: &TenantId, task_id: &TaskId) -> Result<Vec<Subtask>> {
        self.inner.list_subtasks(tenant, task_id).await
    }

    async fn update_dependencies(
        &mut self,
        tenant: &TenantId,
        task_id: &TaskId,
        dependencies: Vec<TaskId>,
    ) -> Result<Task> {
        let previous = self.inner.task(tenant, task_id).await?;
        let task = self
            .inner
            .update_dependencies(tenant, task_id, dependencies)
            .await?;

        // Memory must never run ahead of the file
        if let Err(e) = in_memory::save_to_jsonl(&self.inner, &self.path).await {
            self.inner.import_tasks(tenant, vec![previous]).await;
            return Err(e);
        }
        Ok(task)
    }

    async fn append_history(&mut self, tenant: &TenantId, entry: HistoryEntry) -> Result<()> {
        self.inner.append_history(tenant, entry).await?;
        if let Err(e) = in_memory::save_to_jsonl(&self.inner, &self.path).await {
            self.inner.pop_history(tenant).await;
            return Err(e);
        }
        Ok(())
    }
}

/// Create a store for the given backend.
///
/// `id_prefix` is used for ids of tasks authored through the in-memory
/// store (e.g. "tw" for "tw-a3f8k2").
///
/// # Errors
///
/// - `Error::Io` if the JSONL file exists but cannot be read
pub async fn create_store(backend: StorageBackend, id_prefix: &str) -> Result<Box<dyn GraphStore>> {
    match backend {
        StorageBackend::InMemory => Ok(Box::new(in_memory::InMemoryStore::new(id_prefix))),
        StorageBackend::Jsonl(path) => {
            let inner = if path.exists() {
                let (store, warnings) = in_memory::load_from_jsonl(&path, id_prefix).await?;
                for warning in &warnings {
                    tracing::warn!(warning = ?warning, "JSONL load warning");
                }
                store
            } else {
                // First run: nothing written yet
                in_memory::InMemoryStore::new(id_prefix)
            };
            Ok(Box::new(JsonlBackedStore { inner, path }))
        }
    }
}

// ========== Test Utilities ==========

/// Failure-injecting wrapper around [`in_memory::InMemoryStore`].
///
/// Reads and writes go to the wrapped store unless a failure was requested:
///
/// - [`fail_reads`](Self::fail_reads): every `list_*` call errors
/// - [`fail_update_for`](Self::fail_update_for): writes to that task error
/// - [`fail_history`](Self::fail_history): every history append errors
///
/// Clone the inner store before wrapping it to inspect state afterwards.
#[cfg(any(test, feature = "test-util"))]
#[derive(Clone)]
pub struct MockStore {
    inner: in_memory::InMemoryStore,
    failing_updates: std::collections::HashSet<TaskId>,
    fail_reads: bool,
    fail_history: bool,
}

#[cfg(any(test, feature = "test-util"))]
impl MockStore {
    /// Wrap a store with no failures configured.
    pub fn new(inner: in_memory::InMemoryStore) -> Self {
        Self {
            inner,
            failing_updates: std::collections::HashSet::new(),
            fail_reads: false,
            fail_history: false,
        }
    }

    /// Make every write to `task_id` fail.
    #[must_use]
    pub fn fail_update_for(mut self, task_id: TaskId) -> Self {
        self.failing_updates.insert(task_id);
        self
    }

    /// Make every snapshot read fail.
    #[must_use]
    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Make every history append fail.
    #[must_use]
    pub fn fail_history(mut self) -> Self {
        self.fail_history = true;
        self
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl GraphStore for MockStore {
    async fn list_tasks(&self, tenant: &TenantId) -> Result<Vec<Task>> {
        if self.fail_reads {
            return Err(crate::error::Error::Storage("injected read failure".to_string()));
        }
        self.inner.list_tasks(tenant).await
    }

    async fn list_subtasks(&self, tenant: &TenantId, task_id: &TaskId) -> Result<Vec<Subtask>> {
        if self.fail_reads {
            return Err(crate::error::Error::Storage("injected read failure".to_string()));
        }
        self.inner.list_subtasks(tenant, task_id).await
    }

    async fn update_dependencies(
        &mut self,
        tenant: &TenantId,
        task_id: &TaskId,
        dependencies: Vec<TaskId>,
    ) -> Result<Task> {
        if self.failing_updates.contains(task_id) {
            return Err(crate::error::Error::Storage(format!(
                "injected write failure for {task_id}"
            )));
        }
        self.inner
            .update_dependencies(tenant, task_id, dependencies)
            .await
    }

    async fn append_history(&mut self, tenant: &TenantId, entry: HistoryEntry) -> Result<()> {
        if self.fail_history {
            return Err(crate::error::Error::Storage(
                "injected history failure".to_string(),
            ));
        }
        self.inner.append_history(tenant, entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewTask;
    use crate::repair::repair;
    use crate::test_support::{id, task, tenant};

    #[tokio::test]
    async fn test_trait_object_usage() {
        let store: Box<dyn GraphStore> = create_store(StorageBackend::InMemory, "tw").await.unwrap();
        assert!(store.list_tasks(&tenant()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_jsonl_backed_store_persists_updates() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.jsonl");

        let seed = in_memory::InMemoryStore::new("tw");
        let a = seed.create_task(&tenant(), NewTask::new("A", vec![])).await.unwrap();
        let b = seed
            .create_task(&tenant(), NewTask::new("B", vec![a.id.clone()]))
            .await
            .unwrap();
        in_memory::save_to_jsonl(&seed, &path).await.unwrap();

        let mut store = create_store(StorageBackend::Jsonl(path.clone()), "tw")
            .await
            .unwrap();
        store
            .update_dependencies(&tenant(), &b.id, vec![])
            .await
            .unwrap();

        // A fresh load sees the write
        let (reloaded, warnings) = in_memory::load_from_jsonl(&path, "tw").await.unwrap();
        assert!(warnings.is_empty());
        let tasks = reloaded.list_tasks(&tenant()).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks[1].dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_jsonl_backend_without_file_starts_empty() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.jsonl");
        let store = create_store(StorageBackend::Jsonl(path), "tw").await.unwrap();

        assert!(store.list_tasks(&tenant()).await.unwrap().is_empty());
    }

    /// Seed a file with a self edge on t1 and a dangling edge on t2, then
    /// block the atomic save by putting a directory where its temp file goes.
    async fn blocked_jsonl_store(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
        let path = dir.path().join("tasks.jsonl");
        let seed = in_memory::InMemoryStore::new("tw");
        seed.import_tasks(&tenant(), vec![task(1, &[1]), task(2, &[9])]).await;
        in_memory::save_to_jsonl(&seed, &path).await.unwrap();

        let blocker = path.with_extension("tmp");
        tokio::fs::create_dir(&blocker).await.unwrap();
        (path, blocker)
    }

    #[tokio::test]
    async fn test_failed_save_leaves_repair_retryable() {
        let dir = tempfile::TempDir::new().unwrap();
        let (path, blocker) = blocked_jsonl_store(&dir).await;
        let mut store = create_store(StorageBackend::Jsonl(path.clone()), "tw")
            .await
            .unwrap();

        let first = repair(store.as_mut(), &tenant()).await.unwrap();
        assert_eq!(first.failures.len(), 2);
        assert!(first.fixes.is_empty());

        // The working set still carries the damage the file carries
        let live: Vec<Vec<TaskId>> = store
            .list_tasks(&tenant())
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.dependencies)
            .collect();
        assert_eq!(live, vec![vec![id(1)], vec![id(9)]]);

        tokio::fs::remove_dir(&blocker).await.unwrap();
        let retry = repair(store.as_mut(), &tenant()).await.unwrap();
        assert!(!retry.is_partial());
        assert_eq!(retry.fixes.len(), 2);

        let (reloaded, _) = in_memory::load_from_jsonl(&path, "tw").await.unwrap();
        let tasks = reloaded.list_tasks(&tenant()).await.unwrap();
        assert!(tasks.iter().all(|t| t.dependencies.is_empty()));
        assert_eq!(reloaded.history(&tenant()).await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_save_drops_history_entry() {
        let dir = tempfile::TempDir::new().unwrap();
        let (path, _blocker) = blocked_jsonl_store(&dir).await;
        let (inner, _) = in_memory::load_from_jsonl(&path, "tw").await.unwrap();
        let mut store = JsonlBackedStore {
            inner: inner.clone(),
            path,
        };

        let entry = HistoryEntry::now("note", Some(id(1)), serde_json::Value::Null);
        assert!(store.append_history(&tenant(), entry).await.is_err());
        assert!(inner.history(&tenant()).await.is_empty());
    }

    #[test]
    fn test_data_path() {
        assert_eq!(StorageBackend::InMemory.data_path(), None);
        let backend = StorageBackend::Jsonl(PathBuf::from("x.jsonl"));
        assert_eq!(backend.data_path(), Some(Path::new("x.jsonl")));
    }
}
