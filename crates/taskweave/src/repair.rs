//! Idempotent normalization of a tenant's dependency edges.
//!
//! The repair is split in two: [`plan_repairs`] is a pure function that
//! decides, for every task, which dependency entries must go; [`repair`]
//! fetches a snapshot, plans, and persists each task's new list through the
//! store one task at a time.
//!
//! # Cycle-breaking tie-break
//!
//! Edges are re-admitted one by one into an initially empty graph, tasks in
//! ascending number order and each task's dependencies in list order. An
//! edge that would close a cycle with the edges admitted so far is dropped.
//! Earlier tasks and earlier-listed dependencies therefore win, and the
//! graph that comes out is acyclic after a single pass, so a second run
//! finds nothing to do.
//!
//! # Partial failure
//!
//! There is no cross-task transaction. A task whose write fails is recorded
//! in [`RepairReport::failures`] and the remaining tasks are still processed.

use crate::domain::{HistoryEntry, Task, TaskId, TenantId};
use crate::error::Result;
use crate::graph::{DependencyGraph, in_number_order};
use crate::storage::GraphStore;
use crate::validate::IssueKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// History action recorded for every persisted fix.
pub const FIX_HISTORY_ACTION: &str = "fix_dependencies";

/// One dependency entry (or group of identical entries) removed from a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedDependency {
    /// Why the entry was removed
    #[serde(rename = "type")]
    pub kind: IssueKind,

    /// The removed dependency id
    pub dependency_id: TaskId,

    /// How many entries with this id were removed
    pub count: usize,

    /// Human-readable description, as in validation issues
    pub message: String,
}

/// Edges removed from one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    /// Repaired task
    pub task_id: TaskId,

    /// Repaired task's sequence number
    pub task_number: u32,

    /// Length of the dependency list before repair
    pub original_count: usize,

    /// Length of the dependency list after repair
    pub fixed_count: usize,

    /// Removed entries with their messages
    pub removed: Vec<RemovedDependency>,

    /// The repaired dependency list
    pub dependencies: Vec<TaskId>,
}

impl Fix {
    /// Number of dependency entries removed from the task
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.original_count - self.fixed_count
    }
}

/// A planned fix that could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairFailure {
    /// Task whose write failed
    pub task_id: TaskId,

    /// Its sequence number
    pub task_number: u32,

    /// The store error
    pub error: String,
}

/// Outcome of a repair run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    /// Dependency entries removed across all persisted fixes
    pub fixed_count: usize,

    /// Number of tasks in the snapshot
    pub tasks_checked: usize,

    /// Persisted fixes, in task order
    #[serde(rename = "perTaskFixes")]
    pub fixes: Vec<Fix>,

    /// Fixes that could not be written
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RepairFailure>,
}

impl RepairReport {
    /// Whether some planned fixes could not be persisted
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Whether the run found nothing to repair
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.fixes.is_empty() && self.failures.is_empty()
    }
}

/// Decide which dependency entries every task should lose.
///
/// Returns one [`Fix`] per task whose list changes, in ascending task number
/// order. Pure and deterministic for a given snapshot.
#[must_use]
pub fn plan_repairs(tasks: &[Task]) -> Vec<Fix> {
    let mut admitted = DependencyGraph::with_nodes(tasks);
    let mut fixes = Vec::new();

    for task in in_number_order(tasks) {
        if !task.has_dependencies() {
            continue;
        }

        let mut removed = Vec::new();

        let (present, missing): (Vec<&TaskId>, Vec<&TaskId>) =
            task.dependencies.iter().partition(|dep| admitted.contains(dep));
        removed.extend(grouped(
            &missing,
            IssueKind::MissingDependency,
            "target no longer exists",
        ));

        let (selves, others): (Vec<&TaskId>, Vec<&TaskId>) =
            present.into_iter().partition(|dep| **dep == task.id);
        removed.extend(grouped(&selves, IssueKind::SelfDependency, "self-dependency"));

        let mut seen = HashSet::new();
        let (unique, repeats): (Vec<&TaskId>, Vec<&TaskId>) =
            others.into_iter().partition(|dep| seen.insert(*dep));
        removed.extend(grouped(
            &repeats,
            IssueKind::DuplicateDependency,
            "duplicate removed",
        ));

        let mut kept = Vec::with_capacity(unique.len());
        for dep in unique {
            if admitted.would_create_cycle(&task.id, dep) {
                removed.push(RemovedDependency {
                    kind: IssueKind::CircularDependency,
                    dependency_id: dep.clone(),
                    count: 1,
                    message: "would create circular dependency".to_string(),
                });
            } else {
                admitted.add_edge(&task.id, dep);
                kept.push(dep.clone());
            }
        }

        if !removed.is_empty() {
            debug!(
                task = %task.id,
                number = task.number,
                removed = removed.len(),
                "Planned dependency fix"
            );
            fixes.push(Fix {
                task_id: task.id.clone(),
                task_number: task.number,
                original_count: task.dependencies.len(),
                fixed_count: kept.len(),
                removed,
                dependencies: kept,
            });
        }
    }

    fixes
}

/// Repair a tenant's dependency graph and persist the result.
///
/// # Errors
///
/// Returns an error only when the snapshot cannot be read. Per-task write
/// failures are reported in [`RepairReport::failures`]; history append
/// failures are logged and otherwise ignored.
pub async fn repair(store: &mut dyn GraphStore, tenant: &TenantId) -> Result<RepairReport> {
    let tasks = store.list_tasks(tenant).await?;
    let planned = plan_repairs(&tasks);
    debug!(tenant = %tenant, tasks = tasks.len(), planned = planned.len(), "Repairing dependencies");

    let mut report = RepairReport {
        tasks_checked: tasks.len(),
        ..RepairReport::default()
    };

    for fix in planned {
        match store
            .update_dependencies(tenant, &fix.task_id, fix.dependencies.clone())
            .await
        {
            Ok(_) => {
                append_fix_history(store, tenant, &fix).await;
                report.fixed_count += fix.removed_count();
                report.fixes.push(fix);
            }
            Err(e) => {
                warn!(
                    tenant = %tenant,
                    task = %fix.task_id,
                    error = %e,
                    "Failed to persist dependency fix"
                );
                report.failures.push(RepairFailure {
                    task_id: fix.task_id,
                    task_number: fix.task_number,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        tenant = %tenant,
        fixed = report.fixed_count,
        tasks_fixed = report.fixes.len(),
        failures = report.failures.len(),
        "Dependency repair finished"
    );
    Ok(report)
}

async fn append_fix_history(store: &mut dyn GraphStore, tenant: &TenantId, fix: &Fix) {
    let entry = HistoryEntry::now(
        FIX_HISTORY_ACTION,
        Some(fix.task_id.clone()),
        serde_json::json!({
            "taskNumber": fix.task_number,
            "removed": fix.removed,
        }),
    );
    if let Err(e) = store.append_history(tenant, entry).await {
        warn!(tenant = %tenant, task = %fix.task_id, error = %e, "Failed to append history entry");
    }
}

/// Collapse removed entries into one record per distinct id, in first-seen order.
fn grouped(ids: &[&TaskId], kind: IssueKind, message: &str) -> Vec<RemovedDependency> {
    let mut groups: Vec<RemovedDependency> = Vec::new();
    for id in ids {
        match groups.iter_mut().find(|g| g.dependency_id == **id) {
            Some(group) => group.count += 1,
            None => groups.push(RemovedDependency {
                kind,
                dependency_id: (*id).clone(),
                count: 1,
                message: message.to_string(),
            }),
        }
    }
    groups
}
