//! Next-task selection.
//!
//! A greedy single pass: the first task, by ascending number, whose
//! dependencies are all `done` and that has something actionable, either
//! one of its subtasks or the task itself.

use crate::domain::{Subtask, Task, TaskId, TaskStatus, TenantId};
use crate::error::Result;
use crate::graph::in_number_order;
use crate::storage::GraphStore;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Message returned when nothing can be worked on.
pub const NO_ELIGIBLE_TASK: &str = "no eligible task";

/// The piece of work picked by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkUnit {
    /// A task without actionable subtasks
    Task {
        /// The task itself
        task: Task,
    },

    /// An actionable subtask of an unblocked task
    Subtask {
        /// The parent task, whose dependencies gate the subtask
        parent: Task,
        /// The subtask to work on
        subtask: Subtask,
    },
}

impl WorkUnit {
    /// The task whose dependencies gate this unit
    #[must_use]
    pub fn task(&self) -> &Task {
        match self {
            Self::Task { task } => task,
            Self::Subtask { parent, .. } => parent,
        }
    }

    /// Dotted display number, e.g. `3` or `3.2`
    #[must_use]
    pub fn display_number(&self) -> String {
        match self {
            Self::Task { task } => task.number.to_string(),
            Self::Subtask { parent, subtask } => format!("{}.{}", parent.number, subtask.number),
        }
    }

    /// Title of the unit
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Task { task } => &task.title,
            Self::Subtask { subtask, .. } => &subtask.title,
        }
    }
}

/// Result of a next-task query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTask {
    /// The selected unit, or `None` when nothing is eligible
    pub unit: Option<WorkUnit>,

    /// Whether the selected unit is a subtask
    pub is_subtask: bool,

    /// Human-readable summary
    pub message: String,
}

impl NextTask {
    fn task(task: Task) -> Self {
        let message = format!("Next task: {} - {}", task.number, task.title);
        Self {
            unit: Some(WorkUnit::Task { task }),
            is_subtask: false,
            message,
        }
    }

    fn subtask(parent: Task, subtask: Subtask) -> Self {
        let message = format!(
            "Next subtask: {}.{} - {}",
            parent.number, subtask.number, subtask.title
        );
        Self {
            unit: Some(WorkUnit::Subtask { parent, subtask }),
            is_subtask: true,
            message,
        }
    }

    fn none() -> Self {
        Self {
            unit: None,
            is_subtask: false,
            message: NO_ELIGIBLE_TASK.to_string(),
        }
    }
}

/// Whether every dependency of `task` is `done`.
///
/// Dependencies on tasks missing from `statuses` are unsatisfied.
#[must_use]
pub fn dependencies_satisfied(task: &Task, statuses: &HashMap<&TaskId, TaskStatus>) -> bool {
    task.dependencies.iter().all(|dep| {
        statuses
            .get(dep)
            .is_some_and(|status| status.satisfies_dependency())
    })
}

/// Find the next unit of work for a tenant.
///
/// # Errors
///
/// Returns an error if the task list or a task's subtasks cannot be read.
pub async fn find_next(store: &dyn GraphStore, tenant: &TenantId) -> Result<NextTask> {
    let tasks = store.list_tasks(tenant).await?;
    let statuses: HashMap<&TaskId, TaskStatus> = tasks.iter().map(|t| (&t.id, t.status)).collect();

    for task in in_number_order(&tasks) {
        if task.status.is_terminal() {
            continue;
        }
        if !dependencies_satisfied(task, &statuses) {
            debug!(task = %task.id, number = task.number, "Skipping task with unmet dependencies");
            continue;
        }

        let mut subtasks = store.list_subtasks(tenant, &task.id).await?;
        if subtasks.is_empty() {
            if task.status.is_actionable() {
                return Ok(NextTask::task(task.clone()));
            }
            continue;
        }

        subtasks.sort_by_key(|s| s.number);
        if let Some(subtask) = subtasks.into_iter().find(|s| s.status.is_actionable()) {
            return Ok(NextTask::subtask(task.clone(), subtask));
        }
        if task.status == TaskStatus::Pending {
            return Ok(NextTask::task(task.clone()));
        }
    }

    debug!(tenant = %tenant, "No eligible task");
    Ok(NextTask::none())
}
