//! Taskweave - dependency graph engine for multi-tenant task lists.
//!
//! Tasks depend on other tasks. This crate checks a tenant's dependency
//! graph for damage, repairs it idempotently, answers "would this edge close
//! a cycle?" before an edge is written, and picks the next unit of work whose
//! prerequisites are done.
//!
//! The engine owns no data: everything goes through a [`storage::GraphStore`],
//! and every call is scoped to one [`domain::TenantId`].
//!
//! # Example
//!
//! ```no_run
//! use taskweave::domain::{NewTask, TenantId};
//! use taskweave::service::TaskGraph;
//! use taskweave::storage::in_memory::InMemoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> taskweave::error::Result<()> {
//! let tenant = TenantId::new("acme")?;
//! let store = InMemoryStore::new("tw");
//! let design = store.create_task(&tenant, NewTask::new("Design", vec![])).await?;
//! store.create_task(&tenant, NewTask::new("Build", vec![design.id])).await?;
//!
//! let graph = TaskGraph::new(Box::new(store));
//! let report = graph.validate_dependencies(&tenant).await?;
//! assert!(report.is_valid());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod domain;
pub mod error;
pub mod graph;
pub mod id_generation;
pub mod repair;
pub mod schedule;
pub mod service;
pub mod storage;
pub mod validate;

// CLI surface (needed by binary)
pub mod app;
pub mod cli;
pub mod config;
pub mod output;

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by unit tests. Task `n` has id `t{n}` and number `n`.

    use crate::domain::{Priority, Subtask, Task, TaskId, TaskStatus, TenantId};
    use chrono::Utc;

    pub(crate) fn id(n: u32) -> TaskId {
        TaskId::new(format!("t{n}"))
    }

    pub(crate) fn task(n: u32, deps: &[u32]) -> Task {
        task_with_status(n, deps, TaskStatus::Pending)
    }

    pub(crate) fn task_with_status(n: u32, deps: &[u32], status: TaskStatus) -> Task {
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

    pub(crate) fn subtask(parent: u32, n: u32, status: TaskStatus) -> Subtask {
        Subtask {
            task_id: id(parent),
            number: n,
            title: format!("Subtask {parent}.{n}"),
            status,
        }
    }

    pub(crate) fn tenant() -> TenantId {
        TenantId::new("acme").expect("static tenant is valid")
    }
}
