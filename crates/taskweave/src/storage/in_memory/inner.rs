//! Core in-memory storage data structures.
//!
//! This module contains the inner storage structure that holds all data
//! and is wrapped in `Arc<Mutex<>>` for thread safety.

use crate::domain::{HistoryEntry, Subtask, Task, TaskId, TenantId};
use crate::error::{Error, Result};
use crate::id_generation::generate_task_id;
use std::collections::{HashMap, HashSet};

/// Everything stored for one tenant.
#[derive(Debug, Default)]
pub(super) struct TenantData {
    /// Tasks indexed by ID
    pub(super) tasks: HashMap<TaskId, Task>,

    /// Subtasks per parent task
    pub(super) subtasks: HashMap<TaskId, Vec<Subtask>>,

    /// Audit trail, oldest first
    pub(super) history: Vec<HistoryEntry>,
}

impl TenantData {
    /// Tasks ordered by number.
    pub(super) fn sorted_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.id.cmp(&b.id)));
        tasks
    }

    /// The next unused sequence number.
    pub(super) fn next_number(&self) -> u32 {
        self.tasks.values().map(|t| t.number).max().unwrap_or(0) + 1
    }

    pub(super) fn task(&self, id: &TaskId) -> Result<&Task> {
        self.tasks
            .get(id)
            .ok_or_else(|| Error::TaskNotFound(id.clone()))
    }

    pub(super) fn task_mut(&mut self, id: &TaskId) -> Result<&mut Task> {
        self.tasks
            .get_mut(id)
            .ok_or_else(|| Error::TaskNotFound(id.clone()))
    }
}

/// Inner storage structure (not thread-safe).
///
/// Tenants are fully partitioned: no lookup ever crosses from one
/// `TenantData` into another.
#[derive(Debug)]
pub(crate) struct InMemoryStoreInner {
    /// Per-tenant data
    pub(super) tenants: HashMap<TenantId, TenantData>,

    /// Prefix for generated task IDs (e.g., "tw")
    pub(super) id_prefix: String,
}

impl InMemoryStoreInner {
    /// Create a new empty storage instance
    pub(crate) fn new(id_prefix: String) -> Self {
        Self {
            tenants: HashMap::new(),
            id_prefix,
        }
    }

    pub(super) fn tenant(&self, tenant: &TenantId) -> Option<&TenantData> {
        self.tenants.get(tenant)
    }

    pub(super) fn tenant_mut(&mut self, tenant: &TenantId) -> &mut TenantData {
        self.tenants.entry(tenant.clone()).or_default()
    }

    /// Generate a new unique ID for a task of `tenant`
    pub(super) fn generate_id(&self, tenant: &TenantId, number: u32, title: &str) -> Result<TaskId> {
        let existing: HashSet<&TaskId> = self
            .tenant(tenant)
            .map(|data| data.tasks.keys().collect())
            .unwrap_or_default();

        generate_task_id(&self.id_prefix, tenant, number, title, &existing)
            .map_err(|e| Error::Storage(format!("ID generation failed: {e}")))
    }
}
