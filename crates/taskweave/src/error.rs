//! Error types for taskweave operations.

use crate::domain::TaskId;
use std::io;
use thiserror::Error;

/// The error type for taskweave operations.
///
/// Validation findings are not errors; they are returned as data by the
/// validator. A repair run that could not persist some tasks still succeeds
/// and lists the failures in its report.
#[derive(Debug, Error)]
pub enum Error {
    /// No tenant identifier was supplied.
    #[error("Missing tenant identifier")]
    MissingTenant,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Task not found.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Subtask not found.
    #[error("Subtask not found: {task_id}.{number}")]
    SubtaskNotFound {
        /// Parent task
        task_id: TaskId,
        /// Subtask number within the parent
        number: u32,
    },

    /// Adding the edge would close a cycle.
    #[error("Circular dependency: {from} -> {to}")]
    CircularDependency {
        /// Dependent task
        from: TaskId,
        /// Task it would depend on
        to: TaskId,
    },

    /// A task cannot depend on itself.
    #[error("Task cannot depend on itself: {0}")]
    SelfDependency(TaskId),

    /// The edge is already present.
    #[error("Dependency already exists: {from} -> {to}")]
    DuplicateDependency {
        /// Dependent task
        from: TaskId,
        /// Task it depends on
        to: TaskId,
    },

    /// The edge to remove does not exist.
    #[error("Dependency not found: {from} -> {to}")]
    DependencyNotFound {
        /// Dependent task
        from: TaskId,
        /// Task it was expected to depend on
        to: TaskId,
    },
}

/// A specialized Result type for taskweave operations.
pub type Result<T> = std::result::Result<T, Error>;
