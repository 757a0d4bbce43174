//! JSONL persistence for in-memory storage.
//!
//! One record per line, tagged by `record` and carrying its tenant:
//!
//! ```text
//! {"record":"task","tenant":"acme","task":{...}}
//! {"record":"subtask","tenant":"acme","subtask":{...}}
//! {"record":"history","tenant":"acme","entry":{...}}
//! ```
//!
//! Dependency lists are loaded and saved verbatim. Dangling, duplicate,
//! self and cyclic edges survive a round-trip so that validation can report
//! them and repair can fix them.

use super::InMemoryStore;
use crate::domain::{HistoryEntry, Subtask, Task, TaskId, TenantId};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// One line of a JSONL data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum SnapshotRecord {
    /// A task with its dependency list
    Task {
        /// Owning tenant
        tenant: TenantId,
        /// The task
        task: Task,
    },

    /// A subtask; its parent must appear somewhere in the file
    Subtask {
        /// Owning tenant
        tenant: TenantId,
        /// The subtask
        subtask: Subtask,
    },

    /// An audit entry
    History {
        /// Owning tenant
        tenant: TenantId,
        /// The entry
        entry: HistoryEntry,
    },
}

/// Non-fatal problems found while loading a JSONL file.
///
/// The offending line is skipped and loading continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Line that couldn't be parsed as a record
    MalformedJson {
        /// 1-based line number
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// Subtask whose parent task is not in the file
    OrphanedSubtask {
        /// 1-based line number
        line_number: usize,
        /// Missing parent
        task_id: TaskId,
    },

    /// Second record for a task ID already loaded for the same tenant
    DuplicateTask {
        /// 1-based line number
        line_number: usize,
        /// Repeated ID
        task_id: TaskId,
    },
}

/// Load a store from a JSONL file.
///
/// Returns the store and every warning encountered. Blank lines are ignored.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be opened or read.
pub async fn load_from_jsonl(path: &Path, id_prefix: &str) -> Result<(InMemoryStore, Vec<LoadWarning>)> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut warnings = Vec::new();
    let mut tasks = Vec::new();
    let mut subtasks = Vec::new();
    let mut history = Vec::new();

    let mut line_number = 0;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SnapshotRecord>(&line) {
            Ok(SnapshotRecord::Task { tenant, task }) => tasks.push((line_number, tenant, task)),
            Ok(SnapshotRecord::Subtask { tenant, subtask }) => {
                subtasks.push((line_number, tenant, subtask));
            }
            Ok(SnapshotRecord::History { tenant, entry }) => history.push((tenant, entry)),
            Err(e) => warnings.push(LoadWarning::MalformedJson {
                line_number,
                error: e.to_string(),
            }),
        }
    }

    let store = InMemoryStore::new(id_prefix);
    let mut inner = store.inner.lock().await;

    // Tasks first so subtasks can be checked against every parent in the file
    let mut seen: HashSet<(TenantId, TaskId)> = HashSet::new();
    for (line_number, tenant, task) in tasks {
        if !seen.insert((tenant.clone(), task.id.clone())) {
            warnings.push(LoadWarning::DuplicateTask {
                line_number,
                task_id: task.id,
            });
            continue;
        }
        inner.tenant_mut(&tenant).tasks.insert(task.id.clone(), task);
    }

    for (line_number, tenant, subtask) in subtasks {
        if !seen.contains(&(tenant.clone(), subtask.task_id.clone())) {
            warnings.push(LoadWarning::OrphanedSubtask {
                line_number,
                task_id: subtask.task_id,
            });
            continue;
        }
        inner
            .tenant_mut(&tenant)
            .subtasks
            .entry(subtask.task_id.clone())
            .or_default()
            .push(subtask);
    }

    for (tenant, entry) in history {
        inner.tenant_mut(&tenant).history.push(entry);
    }

    drop(inner);
    Ok((store, warnings))
}

/// Save a store to a JSONL file with atomic writes.
///
/// Records are written tenant by tenant, tasks in number order followed by
/// their subtasks, then the tenant's history. The file is written to a
/// temporary sibling first and renamed into place, so an interrupted save
/// leaves the previous file intact.
///
/// # Errors
///
/// Returns `Error::Io` on write failure or `Error::Json` if a record cannot
/// be serialized.
pub async fn save_to_jsonl(store: &InMemoryStore, path: &Path) -> Result<()> {
    let records = {
        let inner = store.inner.lock().await;
        let mut tenants: Vec<&TenantId> = inner.tenants.keys().collect();
        tenants.sort();

        let mut records = Vec::new();
        for tenant in tenants {
            let data = &inner.tenants[tenant];
            for task in data.sorted_tasks() {
                let mut children = data.subtasks.get(&task.id).cloned().unwrap_or_default();
                children.sort_by_key(|s| s.number);
                records.push(SnapshotRecord::Task {
                    tenant: tenant.clone(),
                    task,
                });
                records.extend(children.into_iter().map(|subtask| SnapshotRecord::Subtask {
                    tenant: tenant.clone(),
                    subtask,
                }));
            }
            records.extend(data.history.iter().map(|entry| SnapshotRecord::History {
                tenant: tenant.clone(),
                entry: entry.clone(),
            }));
        }
        records
    };

    let temp_path = path.with_extension("tmp");
    let file = File::create(&temp_path).await?;
    let mut writer = BufWriter::new(file);

    for record in &records {
        let json = serde_json::to_string(record)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await?;

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(Error::Io)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use crate::storage::GraphStore;
    use crate::test_support::{id, subtask, task, tenant};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_keeps_damaged_edges() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.jsonl");

        let store = InMemoryStore::new("tw");
        store
            .import_tasks(
                &tenant(),
                vec![task(1, &[2]), task(2, &[1, 1]), task(3, &[3, 99])],
            )
            .await;
        store
            .import_subtasks(&tenant(), vec![subtask(1, 1, TaskStatus::Done)])
            .await;
        save_to_jsonl(&store, &path).await.unwrap();

        let (loaded, warnings) = load_from_jsonl(&path, "tw").await.unwrap();
        assert!(warnings.is_empty());
        assert_eq!(
            loaded.list_tasks(&tenant()).await.unwrap(),
            store.list_tasks(&tenant()).await.unwrap()
        );
        assert_eq!(loaded.list_subtasks(&tenant(), &id(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.jsonl");

        save_to_jsonl(&InMemoryStore::new("tw"), &path).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_load_warnings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.jsonl");

        let good = serde_json::to_string(&SnapshotRecord::Task {
            tenant: tenant(),
            task: task(1, &[]),
        })
        .unwrap();
        let orphan = serde_json::to_string(&SnapshotRecord::Subtask {
            tenant: tenant(),
            subtask: subtask(7, 1, TaskStatus::Pending),
        })
        .unwrap();
        let content = format!("{good}\n{{not json\n\n{good}\n{orphan}\n");
        tokio::fs::write(&path, content).await.unwrap();

        let (store, warnings) = load_from_jsonl(&path, "tw").await.unwrap();

        assert_eq!(store.list_tasks(&tenant()).await.unwrap().len(), 1);
        assert_eq!(warnings.len(), 3);
        assert!(matches!(warnings[0], LoadWarning::MalformedJson { line_number: 2, .. }));
        assert_eq!(
            warnings[1],
            LoadWarning::DuplicateTask {
                line_number: 4,
                task_id: id(1)
            }
        );
        assert_eq!(
            warnings[2],
            LoadWarning::OrphanedSubtask {
                line_number: 5,
                task_id: id(7)
            }
        );
    }

    #[tokio::test]
    async fn test_blank_tenant_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.jsonl");

        let line = serde_json::to_string(&SnapshotRecord::Task {
            tenant: tenant(),
            task: task(1, &[]),
        })
        .unwrap()
        .replace("\"acme\"", "\"  \"");
        tokio::fs::write(&path, format!("{line}\n")).await.unwrap();

        let (_, warnings) = load_from_jsonl(&path, "tw").await.unwrap();
        assert!(matches!(warnings[0], LoadWarning::MalformedJson { line_number: 1, .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_from_jsonl(&temp_dir.path().join("nope.jsonl"), "tw")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
