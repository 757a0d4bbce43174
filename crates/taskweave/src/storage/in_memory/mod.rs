//! In-memory storage backend.
//!
//! Data is held in RAM, partitioned by tenant, and **lost when the process
//! exits** unless written out with [`save_to_jsonl`]. Suitable for tests,
//! short-lived CLI runs, and as the working set of the JSONL backend.
//!
//! # Authoring vs. repair
//!
//! The authoring methods ([`InMemoryStore::create_task`],
//! [`InMemoryStore::add_dependency`], ...) keep the graph valid: they reject
//! missing targets, self-edges, duplicates and cycles, and deleting a task
//! removes every edge pointing at it. [`InMemoryStore::import_tasks`] loads
//! data as-is, which is how damaged graphs (from files or older tools) get
//! in front of the validator and repairer.
//!
//! # Thread Safety
//!
//! [`InMemoryStore`] is a cheap handle around `Arc<Mutex<InMemoryStoreInner>>`;
//! clones share the same data. Every operation holds the lock for its whole
//! duration, so each single-task write is atomic.

mod inner;
mod jsonl;
mod trait_impl;

use crate::domain::{HistoryEntry, NewTask, Subtask, Task, TaskId, TaskStatus, TenantId};
use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use chrono::Utc;
use inner::{InMemoryStoreInner, TenantData};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

// Re-export public API
pub use jsonl::{LoadWarning, SnapshotRecord, load_from_jsonl, save_to_jsonl};

/// Thread-safe in-memory store handle.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Mutex<InMemoryStoreInner>>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

impl InMemoryStore {
    /// Create a new empty store.
    ///
    /// # Arguments
    ///
    /// * `id_prefix` - The prefix for generated task IDs (e.g., "tw")
    pub fn new(id_prefix: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(InMemoryStoreInner::new(id_prefix.to_string()))),
        }
    }

    /// Create a task with the next sequence number and status `pending`.
    ///
    /// # Errors
    ///
    /// - `Error::Storage` if the title is invalid
    /// - `Error::TaskNotFound` if a dependency target doesn't exist
    /// - `Error::DuplicateDependency` if a dependency is listed twice
    pub async fn create_task(&self, tenant: &TenantId, new_task: NewTask) -> Result<Task> {
        let mut inner = self.inner.lock().await;

        new_task
            .validate()
            .map_err(|e| Error::Storage(format!("Validation failed: {e}")))?;

        let number = inner.tenant(tenant).map_or(1, TenantData::next_number);
        let id = inner.generate_id(tenant, number, &new_task.title)?;

        let data = inner.tenant_mut(tenant);
        let mut seen = HashSet::new();
        for dep in &new_task.dependencies {
            data.task(dep)?;
            if !seen.insert(dep) {
                return Err(Error::DuplicateDependency {
                    from: id,
                    to: dep.clone(),
                });
            }
        }
        // A brand-new task has no incoming edges, so its edges cannot close a cycle.

        let now = Utc::now();
        let task = Task {
            id: id.clone(),
            number,
            title: new_task.title,
            description: new_task.description,
            status: TaskStatus::Pending,
            priority: new_task.priority,
            dependencies: new_task.dependencies,
            created_at: now,
            updated_at: now,
        };
        data.tasks.insert(id, task.clone());

        Ok(task)
    }

    /// Add the edge `from -> to`.
    ///
    /// # Errors
    ///
    /// - `Error::TaskNotFound` if either task doesn't exist
    /// - `Error::SelfDependency` if `from == to`
    /// - `Error::DuplicateDependency` if the edge already exists
    /// - `Error::CircularDependency` if the edge would close a cycle
    pub async fn add_dependency(&self, tenant: &TenantId, from: &TaskId, to: &TaskId) -> Result<Task> {
        let mut inner = self.inner.lock().await;
        let data = inner.tenant_mut(tenant);

        data.task(to)?;
        if data.task(from)?.dependencies.contains(to) {
            return Err(Error::DuplicateDependency {
                from: from.clone(),
                to: to.clone(),
            });
        }
        if from == to {
            return Err(Error::SelfDependency(from.clone()));
        }

        let snapshot = data.sorted_tasks();
        if DependencyGraph::from_tasks(&snapshot).would_create_cycle(from, to) {
            return Err(Error::CircularDependency {
                from: from.clone(),
                to: to.clone(),
            });
        }

        let task = data.task_mut(from)?;
        task.dependencies.push(to.clone());
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    /// Remove every `from -> to` entry.
    ///
    /// # Errors
    ///
    /// - `Error::TaskNotFound` if `from` doesn't exist
    /// - `Error::DependencyNotFound` if `from` does not list `to`
    pub async fn remove_dependency(&self, tenant: &TenantId, from: &TaskId, to: &TaskId) -> Result<Task> {
        let mut inner = self.inner.lock().await;
        let task = inner.tenant_mut(tenant).task_mut(from)?;

        if !task.dependencies.contains(to) {
            return Err(Error::DependencyNotFound {
                from: from.clone(),
                to: to.clone(),
            });
        }
        task.dependencies.retain(|dep| dep != to);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    /// Change a task's status.
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskNotFound` if the task doesn't exist.
    pub async fn set_status(&self, tenant: &TenantId, id: &TaskId, status: TaskStatus) -> Result<Task> {
        let mut inner = self.inner.lock().await;
        let task = inner.tenant_mut(tenant).task_mut(id)?;
        task.status = status;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    /// Delete a task and its subtasks, cascading away every edge that
    /// points at it.
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskNotFound` if the task doesn't exist.
    pub async fn delete_task(&self, tenant: &TenantId, id: &TaskId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let data = inner.tenant_mut(tenant);

        data.tasks
            .remove(id)
            .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
        data.subtasks.remove(id);

        let now = Utc::now();
        for task in data.tasks.values_mut() {
            if task.dependencies.contains(id) {
                task.dependencies.retain(|dep| dep != id);
                task.updated_at = now;
            }
        }
        Ok(())
    }

    /// Add a `pending` subtask with the next number under `task_id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskNotFound` if the parent doesn't exist.
    pub async fn create_subtask(&self, tenant: &TenantId, task_id: &TaskId, title: &str) -> Result<Subtask> {
        let mut inner = self.inner.lock().await;
        let data = inner.tenant_mut(tenant);
        data.task(task_id)?;

        let siblings = data.subtasks.entry(task_id.clone()).or_default();
        let number = siblings.iter().map(|s| s.number).max().unwrap_or(0) + 1;
        let subtask = Subtask {
            task_id: task_id.clone(),
            number,
            title: title.to_string(),
            status: TaskStatus::Pending,
        };
        siblings.push(subtask.clone());
        Ok(subtask)
    }

    /// Change a subtask's status.
    ///
    /// # Errors
    ///
    /// Returns `Error::SubtaskNotFound` if the subtask doesn't exist.
    pub async fn set_subtask_status(
        &self,
        tenant: &TenantId,
        task_id: &TaskId,
        number: u32,
        status: TaskStatus,
    ) -> Result<Subtask> {
        let mut inner = self.inner.lock().await;
        let subtask = inner
            .tenant_mut(tenant)
            .subtasks
            .get_mut(task_id)
            .and_then(|subs| subs.iter_mut().find(|s| s.number == number))
            .ok_or_else(|| Error::SubtaskNotFound {
                task_id: task_id.clone(),
                number,
            })?;
        subtask.status = status;
        Ok(subtask.clone())
    }

    /// Load tasks as-is, replacing any task with the same ID.
    ///
    /// No validation happens: dangling, duplicate, self and cyclic edges are
    /// all kept so they can be found by validation and repair.
    pub async fn import_tasks(&self, tenant: &TenantId, tasks: Vec<Task>) {
        let mut inner = self.inner.lock().await;
        let data = inner.tenant_mut(tenant);
        for task in tasks {
            data.tasks.insert(task.id.clone(), task);
        }
    }

    /// Load subtasks as-is, replacing any with the same parent and number.
    pub async fn import_subtasks(&self, tenant: &TenantId, subtasks: Vec<Subtask>) {
        let mut inner = self.inner.lock().await;
        let data = inner.tenant_mut(tenant);
        for subtask in subtasks {
            let siblings = data.subtasks.entry(subtask.task_id.clone()).or_default();
            siblings.retain(|s| s.number != subtask.number);
            siblings.push(subtask);
        }
    }

    /// The tenant's audit trail, oldest first.
    pub async fn history(&self, tenant: &TenantId) -> Vec<HistoryEntry> {
        let inner = self.inner.lock().await;
        inner
            .tenant(tenant)
            .map(|data| data.history.clone())
            .unwrap_or_default()
    }

    /// Current record of one task.
    pub(crate) async fn task(&self, tenant: &TenantId, id: &TaskId) -> Result<Task> {
        let inner = self.inner.lock().await;
        inner
            .tenant(tenant)
            .ok_or_else(|| Error::TaskNotFound(id.clone()))?
            .task(id)
            .cloned()
    }

    /// Drop the newest history entry of `tenant`.
    pub(crate) async fn pop_history(&self, tenant: &TenantId) -> Option<HistoryEntry> {
        let mut inner = self.inner.lock().await;
        inner.tenants.get_mut(tenant)?.history.pop()
    }

    /// Every tenant holding data, sorted.
    pub async fn tenants(&self) -> Vec<TenantId> {
        let inner = self.inner.lock().await;
        let mut tenants: Vec<TenantId> = inner.tenants.keys().cloned().collect();
        tenants.sort();
        tenants
    }
}
