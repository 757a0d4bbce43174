//! Read-only integrity scan of a tenant's dependency graph.
//!
//! [`validate`] is a pure function of a snapshot: it reports problems as
//! [`Issue`] records and never writes anything back.

use crate::domain::{Task, TaskId};
use crate::graph::{DependencyGraph, in_number_order};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Class of integrity violation, shared by validation issues and repair fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Dependency on a task that does not exist
    MissingDependency,

    /// Task depends on itself
    SelfDependency,

    /// The same dependency is listed more than once
    DuplicateDependency,

    /// Task takes part in a dependency cycle
    CircularDependency,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingDependency => "missing_dependency",
            Self::SelfDependency => "self_dependency",
            Self::DuplicateDependency => "duplicate_dependency",
            Self::CircularDependency => "circular_dependency",
        };
        f.write_str(s)
    }
}

/// One integrity violation found by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Violation class
    #[serde(rename = "type")]
    pub kind: IssueKind,

    /// Offending task
    pub task_id: TaskId,

    /// Offending task's sequence number
    pub task_number: u32,

    /// Dependency the issue is about (missing and self dependencies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_id: Option<TaskId>,

    /// Every id listed more than once (duplicate dependencies)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_ids: Vec<TaskId>,

    /// Task numbers around the cycle, starting at this task (circular dependencies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<u32>>,

    /// Human-readable description
    pub message: String,
}

/// Result of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Issues in task order
    pub issues: Vec<Issue>,

    /// Number of tasks in the snapshot
    pub tasks_checked: usize,

    /// Number of tasks listing at least one dependency
    pub tasks_with_dependencies: usize,
}

impl ValidationReport {
    /// Whether the graph is free of issues
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of issues of the given kind
    #[must_use]
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }
}

/// Validate a tenant snapshot.
///
/// Tasks are visited in ascending number order. For each task with
/// dependencies the issues come out in the order missing, self, duplicate,
/// circular.
#[must_use]
pub fn validate(tasks: &[Task]) -> ValidationReport {
    let ordered = in_number_order(tasks);
    let graph = DependencyGraph::from_tasks(tasks);
    let numbers: HashMap<&TaskId, u32> = tasks.iter().map(|t| (&t.id, t.number)).collect();
    let cycles = cycle_memberships(&graph, &ordered);

    let mut report = ValidationReport {
        tasks_checked: tasks.len(),
        ..ValidationReport::default()
    };

    for task in ordered {
        if !task.has_dependencies() {
            continue;
        }
        report.tasks_with_dependencies += 1;

        for dep in &task.dependencies {
            if !graph.contains(dep) {
                report.issues.push(Issue {
                    kind: IssueKind::MissingDependency,
                    task_id: task.id.clone(),
                    task_number: task.number,
                    dependency_id: Some(dep.clone()),
                    duplicate_ids: Vec::new(),
                    path: None,
                    message: format!(
                        "Task {} depends on task {} which does not exist",
                        task.number, dep
                    ),
                });
            }
        }

        if task.dependencies.contains(&task.id) {
            report.issues.push(Issue {
                kind: IssueKind::SelfDependency,
                task_id: task.id.clone(),
                task_number: task.number,
                dependency_id: Some(task.id.clone()),
                duplicate_ids: Vec::new(),
                path: None,
                message: format!("Task {} depends on itself", task.number),
            });
        }

        let duplicates = duplicated_ids(&task.dependencies);
        if !duplicates.is_empty() {
            let listed: Vec<String> = duplicates.iter().map(ToString::to_string).collect();
            report.issues.push(Issue {
                kind: IssueKind::DuplicateDependency,
                task_id: task.id.clone(),
                task_number: task.number,
                dependency_id: None,
                duplicate_ids: duplicates,
                path: None,
                message: format!(
                    "Task {} lists duplicate dependencies: {}",
                    task.number,
                    listed.join(", ")
                ),
            });
        }

        if let Some(cycle) = cycles.get(&task.id) {
            let path: Vec<u32> = cycle
                .iter()
                .filter_map(|id| numbers.get(id).copied())
                .collect();
            let mut rendered: Vec<String> = path.iter().map(ToString::to_string).collect();
            rendered.push(task.number.to_string());
            report.issues.push(Issue {
                kind: IssueKind::CircularDependency,
                task_id: task.id.clone(),
                task_number: task.number,
                dependency_id: None,
                duplicate_ids: Vec::new(),
                path: Some(path),
                message: format!(
                    "Task {} is part of a circular dependency: {}",
                    task.number,
                    rendered.join(" -> ")
                ),
            });
        }
    }

    report
}

/// Map every task sitting on a cycle to that cycle, rotated to start at it.
///
/// Tasks already placed on a reported cycle are not searched again, so a
/// cycle of length k is discovered once and yields k entries.
fn cycle_memberships(graph: &DependencyGraph, ordered: &[&Task]) -> HashMap<TaskId, Vec<TaskId>> {
    let mut members: HashMap<TaskId, Vec<TaskId>> = HashMap::new();

    for task in ordered {
        if !task.has_dependencies() || members.contains_key(&task.id) {
            continue;
        }

        let reached = graph.find_cycle_containing(&task.id);
        if reached.is_empty() {
            // Nothing cyclic is reachable, so this task can't be on a cycle
            continue;
        }
        record_cycle(&mut members, &reached);

        // The first cycle reached may lie downstream of this task while the
        // task sits on another one.
        if !members.contains_key(&task.id) {
            record_cycle(&mut members, &graph.find_cycle_through(&task.id));
        }
    }

    members
}

fn record_cycle(members: &mut HashMap<TaskId, Vec<TaskId>>, cycle: &[TaskId]) {
    for (i, member) in cycle.iter().enumerate() {
        members.entry(member.clone()).or_insert_with(|| {
            let mut rotated = cycle.to_vec();
            rotated.rotate_left(i);
            rotated
        });
    }
}

/// Ids appearing more than once, each reported once, in first-repeat order.
fn duplicated_ids(dependencies: &[TaskId]) -> Vec<TaskId> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for dep in dependencies {
        if !seen.insert(dep) && !duplicates.contains(dep) {
            duplicates.push(dep.clone());
        }
    }
    duplicates
}
