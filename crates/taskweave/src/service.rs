//! Caller-facing facade over a [`GraphStore`].
//!
//! Every operation re-reads the tenant's snapshot at the start of the call;
//! nothing is cached between calls.

use crate::domain::{TaskId, TenantId};
use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use crate::repair::{self, RepairReport};
use crate::schedule::{self, NextTask};
use crate::storage::GraphStore;
use crate::validate::{self, ValidationReport};
use tracing::debug;

/// Dependency graph operations for any tenant held by one store.
pub struct TaskGraph {
    store: Box<dyn GraphStore>,
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("store", &"<dyn GraphStore>")
            .finish()
    }
}

impl TaskGraph {
    /// Wrap a store.
    pub fn new(store: Box<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Report every dependency problem of the tenant without changing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read.
    pub async fn validate_dependencies(&self, tenant: &TenantId) -> Result<ValidationReport> {
        let tasks = self.store.list_tasks(tenant).await?;
        let report = validate::validate(&tasks);
        debug!(
            tenant = %tenant,
            tasks = report.tasks_checked,
            issues = report.issues.len(),
            "Validated dependencies"
        );
        Ok(report)
    }

    /// Repair the tenant's dependency graph.
    ///
    /// # Errors
    ///
    /// Returns an error only if the snapshot cannot be read; per-task write
    /// failures end up in [`RepairReport::failures`].
    pub async fn fix_dependencies(&mut self, tenant: &TenantId) -> Result<RepairReport> {
        repair::repair(self.store.as_mut(), tenant).await
    }

    /// Pick the next unit of work for the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if tasks or subtasks cannot be read.
    pub async fn find_next_task(&self, tenant: &TenantId) -> Result<NextTask> {
        schedule::find_next(self.store.as_ref(), tenant).await
    }

    /// Whether adding `task_id -> candidate_id` would close a cycle.
    ///
    /// `task_id` may name a task that is still being authored and not yet
    /// stored; such a task has no incoming edges, so only `task_id ==
    /// candidate_id` can be a cycle.
    ///
    /// # Errors
    ///
    /// - `Error::TaskNotFound` if `candidate_id` is not a task of the tenant
    /// - Any error from reading the snapshot
    pub async fn would_create_cycle(
        &self,
        tenant: &TenantId,
        task_id: &TaskId,
        candidate_id: &TaskId,
    ) -> Result<bool> {
        let tasks = self.store.list_tasks(tenant).await?;
        let graph = DependencyGraph::from_tasks(&tasks);

        if !graph.contains(candidate_id) {
            return Err(Error::TaskNotFound(candidate_id.clone()));
        }

        let cycle = graph.would_create_cycle(task_id, candidate_id);
        debug!(tenant = %tenant, task = %task_id, candidate = %candidate_id, cycle, "Pre-flight cycle check");
        Ok(cycle)
    }
}
