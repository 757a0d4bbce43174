//! `GraphStore` trait implementation for `InMemoryStore`.

use super::InMemoryStore;
use crate::domain::{HistoryEntry, Subtask, Task, TaskId, TenantId};
use crate::error::Result;
use crate::storage::GraphStore;
use async_trait::async_trait;
use chrono::Utc;

#[async_trait]
impl GraphStore for InMemoryStore {
    async fn list_tasks(&self, tenant: &TenantId) -> Result<Vec<Task>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tenant(tenant)
            .map(super::inner::TenantData::sorted_tasks)
            .unwrap_or_default())
    }

    async fn list_subtasks(&self, tenant: &TenantId, task_id: &TaskId) -> Result<Vec<Subtask>> {
        let inner = self.inner.lock().await;
        let mut subtasks = inner
            .tenant(tenant)
            .and_then(|data| data.subtasks.get(task_id))
            .cloned()
            .unwrap_or_default();
        subtasks.sort_by_key(|s| s.number);
        Ok(subtasks)
    }

    async fn update_dependencies(
        &mut self,
        tenant: &TenantId,
        task_id: &TaskId,
        dependencies: Vec<TaskId>,
    ) -> Result<Task> {
        let mut inner = self.inner.lock().await;
        let task = inner.tenant_mut(tenant).task_mut(task_id)?;
        task.dependencies = dependencies;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn append_history(&mut self, tenant: &TenantId, entry: HistoryEntry) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.tenant_mut(tenant).history.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewTask, TaskStatus};
    use crate::error::Error;
    use crate::test_support::{id, subtask, task, tenant};
    use rstest::rstest;

    fn other_tenant() -> TenantId {
        TenantId::new("globex").unwrap()
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_empty() {
        let store = InMemoryStore::new("tw");
        store.import_tasks(&tenant(), vec![task(1, &[])]).await;

        assert!(store.list_tasks(&other_tenant()).await.unwrap().is_empty());
        assert!(
            store
                .list_subtasks(&other_tenant(), &id(1))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_tasks_listed_in_number_order() {
        let store = InMemoryStore::new("tw");
        store
            .import_tasks(&tenant(), vec![task(3, &[]), task(1, &[]), task(2, &[])])
            .await;

        let numbers: Vec<u32> = store
            .list_tasks(&tenant())
            .await
            .unwrap()
            .iter()
            .map(|t| t.number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_subtasks_sorted() {
        let store = InMemoryStore::new("tw");
        store.import_tasks(&tenant(), vec![task(1, &[])]).await;
        store
            .import_subtasks(
                &tenant(),
                vec![
                    subtask(1, 3, TaskStatus::Pending),
                    subtask(1, 1, TaskStatus::Done),
                    subtask(1, 2, TaskStatus::Pending),
                ],
            )
            .await;

        let numbers: Vec<u32> = store
            .list_subtasks(&tenant(), &id(1))
            .await
            .unwrap()
            .iter()
            .map(|s| s.number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_update_dependencies() {
        let mut store = InMemoryStore::new("tw");
        store
            .import_tasks(&tenant(), vec![task(1, &[]), task(2, &[1, 1])])
            .await;

        let updated = store
            .update_dependencies(&tenant(), &id(2), vec![id(1)])
            .await
            .unwrap();
        assert_eq!(updated.dependencies, vec![id(1)]);

        let err = store
            .update_dependencies(&other_tenant(), &id(2), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_history_is_per_tenant() {
        let mut store = InMemoryStore::new("tw");
        store
            .append_history(
                &tenant(),
                HistoryEntry::now("fix_dependencies", None, serde_json::json!({})),
            )
            .await
            .unwrap();

        assert_eq!(store.history(&tenant()).await.len(), 1);
        assert!(store.history(&other_tenant()).await.is_empty());
    }

    #[tokio::test]
    async fn test_authoring_keeps_graph_valid() {
        let store = InMemoryStore::new("tw");
        let a = store
            .create_task(&tenant(), NewTask::new("A", vec![]))
            .await
            .unwrap();
        let b = store
            .create_task(&tenant(), NewTask::new("B", vec![a.id.clone()]))
            .await
            .unwrap();
        assert_eq!((a.number, b.number), (1, 2));

        let err = store.add_dependency(&tenant(), &a.id, &b.id).await.unwrap_err();
        assert!(matches!(err, Error::CircularDependency { .. }));

        let err = store.add_dependency(&tenant(), &a.id, &a.id).await.unwrap_err();
        assert!(matches!(err, Error::SelfDependency(_)));

        let err = store.add_dependency(&tenant(), &b.id, &a.id).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateDependency { .. }));
    }

    #[rstest]
    #[case::missing_target(vec![TaskId::new("tw-nope")])]
    #[tokio::test]
    async fn test_create_task_rejects_missing_target(#[case] deps: Vec<TaskId>) {
        let store = InMemoryStore::new("tw");
        let err = store
            .create_task(&tenant(), NewTask::new("A", deps))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_edges_and_subtasks() {
        let store = InMemoryStore::new("tw");
        store
            .import_tasks(&tenant(), vec![task(1, &[]), task(2, &[1]), task(3, &[1, 2])])
            .await;
        store
            .import_subtasks(&tenant(), vec![subtask(1, 1, TaskStatus::Pending)])
            .await;

        store.delete_task(&tenant(), &id(1)).await.unwrap();

        let tasks = store.list_tasks(&tenant()).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].dependencies.is_empty());
        assert_eq!(tasks[1].dependencies, vec![id(2)]);
        assert!(store.list_subtasks(&tenant(), &id(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_dependency() {
        let store = InMemoryStore::new("tw");
        store
            .import_tasks(&tenant(), vec![task(1, &[]), task(2, &[1])])
            .await;

        let updated = store.remove_dependency(&tenant(), &id(2), &id(1)).await.unwrap();
        assert!(updated.dependencies.is_empty());

        let err = store
            .remove_dependency(&tenant(), &id(2), &id(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DependencyNotFound { .. }));
    }

    #[tokio::test]
    async fn test_subtask_lifecycle() {
        let store = InMemoryStore::new("tw");
        store.import_tasks(&tenant(), vec![task(1, &[])]).await;

        let first = store.create_subtask(&tenant(), &id(1), "First").await.unwrap();
        let second = store.create_subtask(&tenant(), &id(1), "Second").await.unwrap();
        assert_eq!((first.number, second.number), (1, 2));

        let done = store
            .set_subtask_status(&tenant(), &id(1), 1, TaskStatus::Done)
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Done);

        let err = store
            .set_subtask_status(&tenant(), &id(1), 9, TaskStatus::Done)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SubtaskNotFound { number: 9, .. }));

        let err = store.create_subtask(&tenant(), &id(7), "Orphan").await.unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = InMemoryStore::new("tw");
        let handle = store.clone();
        handle.import_tasks(&tenant(), vec![task(1, &[])]).await;

        store.set_status(&tenant(), &id(1), TaskStatus::Done).await.unwrap();
        let tasks = handle.list_tasks(&tenant()).await.unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Done);
        assert_eq!(store.tenants().await, vec![tenant()]);
    }
}
