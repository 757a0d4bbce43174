//! Domain types for the task dependency graph.
//!
//! Tasks are tenant-scoped and carry an ordered list of the task ids they
//! depend on. Subtasks belong to exactly one task and have no edges of their
//! own; they are gated by their parent's dependencies.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a task within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new task ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of the isolation boundary every operation is scoped to.
///
/// A `TenantId` can only be built from a non-blank string, so holding one
/// proves the tenant was resolved before any store access happens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Create a tenant ID, rejecting empty or whitespace-only input.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingTenant` if `id` is blank.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::MissingTenant);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Resolve a tenant from an optional value, as handed over by a caller
    /// that may not have one.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingTenant` if `id` is `None` or blank.
    pub fn resolve(id: Option<&str>) -> Result<Self> {
        id.map_or(Err(Error::MissingTenant), Self::new)
    }

    /// Borrow the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for TenantId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status shared by tasks and subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started
    Pending,

    /// Currently being worked on
    InProgress,

    /// Work finished, awaiting review
    Review,

    /// Completed; the only status that satisfies a dependency
    Done,

    /// Postponed
    Deferred,

    /// Abandoned
    Cancelled,
}

impl TaskStatus {
    /// Whether a dependency on a task with this status counts as satisfied.
    ///
    /// Only `Done` satisfies. A dependency on a cancelled task keeps its
    /// dependents blocked until the edge is edited away.
    #[must_use]
    pub fn satisfies_dependency(self) -> bool {
        self == Self::Done
    }

    /// Whether a unit with this status can be picked up as the next piece of work.
    #[must_use]
    pub fn is_actionable(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    /// Whether a task with this status is finished for scheduling purposes.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Review => "review",
            Self::Done => "done",
            Self::Deferred => "deferred",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "pending" => Ok(Self::Pending),
            "in-progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            "deferred" => Ok(Self::Deferred),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::Storage(format!("unknown task status: {other}"))),
        }
    }
}

/// Task priority.
///
/// Carried for callers; the scheduler does not weight by it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority
    Low,

    /// Medium priority
    #[default]
    Medium,

    /// High priority
    High,

    /// Critical priority
    Critical,
}

/// A top-level unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier
    pub id: TaskId,

    /// Tenant-unique sequence number, used for ordering and diagnostics
    pub number: u32,

    /// Task title
    pub title: String,

    /// Task description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Current status
    pub status: TaskStatus,

    /// Priority level
    #[serde(default)]
    pub priority: Priority,

    /// Tasks this one depends on, in authoring order
    #[serde(default)]
    pub dependencies: Vec<TaskId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the task lists any dependency at all
    #[must_use]
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

/// A child unit of work under exactly one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// ID of the parent task
    pub task_id: TaskId,

    /// Number, unique within the parent
    pub number: u32,

    /// Subtask title
    pub title: String,

    /// Current status
    pub status: TaskStatus,
}

/// Data for creating a new task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    /// Task title
    pub title: String,

    /// Task description
    pub description: Option<String>,

    /// Priority level
    pub priority: Priority,

    /// Dependencies
    pub dependencies: Vec<TaskId>,
}

impl NewTask {
    /// Shorthand for a task with a title and dependencies
    pub fn new(title: impl Into<String>, dependencies: Vec<TaskId>) -> Self {
        Self {
            title: title.into(),
            dependencies,
            ..Self::default()
        }
    }

    /// Validate the new task data.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the title is blank.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }
        Ok(())
    }
}

/// An audit record handed to the store's history sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the recorded action happened
    pub timestamp: DateTime<Utc>,

    /// Machine-readable action name
    pub action: String,

    /// Task the action applied to, if any
    pub task_id: Option<TaskId>,

    /// Action-specific details
    pub details: serde_json::Value,
}

impl HistoryEntry {
    /// Create an entry stamped with the current time
    pub fn now(action: impl Into<String>, task_id: Option<TaskId>, details: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            task_id,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty("")]
    #[case::spaces("   ")]
    #[case::tabs("\t\n")]
    fn test_blank_tenant_rejected(#[case] raw: &str) {
        assert!(matches!(TenantId::new(raw), Err(Error::MissingTenant)));
    }

    #[test]
    fn test_tenant_is_trimmed() {
        let tenant = TenantId::new("  acme ").unwrap();
        assert_eq!(tenant.as_str(), "acme");
    }

    #[test]
    fn test_resolve_none_is_missing_tenant() {
        assert!(matches!(TenantId::resolve(None), Err(Error::MissingTenant)));
        assert_eq!(TenantId::resolve(Some("acme")).unwrap().as_str(), "acme");
    }

    #[test]
    fn test_tenant_deserialize_rejects_blank() {
        let result: std::result::Result<TenantId, _> = serde_json::from_str("\" \"");
        assert!(result.is_err());
    }

    #[rstest]
    #[case::pending(TaskStatus::Pending, "\"pending\"")]
    #[case::in_progress(TaskStatus::InProgress, "\"in-progress\"")]
    #[case::cancelled(TaskStatus::Cancelled, "\"cancelled\"")]
    fn test_status_wire_format(#[case] status: TaskStatus, #[case] expected: &str) {
        assert_eq!(serde_json::to_string(&status).unwrap(), expected);
        assert_eq!(status.to_string(), expected.trim_matches('"'));
    }

    #[rstest]
    #[case::underscore("in_progress", TaskStatus::InProgress)]
    #[case::upper("DONE", TaskStatus::Done)]
    #[case::kebab("in-progress", TaskStatus::InProgress)]
    fn test_status_from_str(#[case] raw: &str, #[case] expected: TaskStatus) {
        assert_eq!(raw.parse::<TaskStatus>().unwrap(), expected);
    }

    #[test]
    fn test_only_done_satisfies() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Review,
            TaskStatus::Deferred,
            TaskStatus::Cancelled,
        ] {
            assert!(!status.satisfies_dependency(), "{status} must not satisfy");
        }
        assert!(TaskStatus::Done.satisfies_dependency());
    }

    #[test]
    fn test_new_task_validate() {
        assert!(NewTask::new("Write docs", vec![]).validate().is_ok());
        assert!(NewTask::new("  ", vec![]).validate().is_err());
    }
}
