//! Application context for CLI command execution.
//!
//! [`App`] locates the repository, loads its configuration, opens the
//! configured store and resolves the tenant every command runs against.
//!
//! # Example
//!
//! ```no_run
//! use taskweave::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new("."), Some("acme")).await?;
//!     let report = app.graph().validate_dependencies(app.tenant()).await?;
//!     println!("{} issues", report.issues.len());
//!     Ok(())
//! }
//! ```

use crate::config::{CONFIG_FILE_NAME, TASKWEAVE_DIR_NAME, TaskweaveConfig, find_root};
use crate::domain::TenantId;
use crate::error::{Error, Result};
use crate::service::TaskGraph;
use crate::storage::create_store;
use std::path::{Path, PathBuf};

/// Application context for CLI operations.
#[derive(Debug)]
pub struct App {
    /// Graph operations over the configured store
    graph: TaskGraph,

    /// Tenant every command is scoped to
    tenant: TenantId,

    /// Path to the taskweave directory (.taskweave)
    taskweave_dir: PathBuf,
}

impl App {
    /// Create an App from the given working directory.
    ///
    /// Searches up the directory tree for `.taskweave/`, loads the
    /// configuration and opens the store. `tenant_override` takes precedence
    /// over the configured tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No repository is found in the directory tree
    /// - No tenant is configured or given (checked before the store is opened)
    /// - Configuration cannot be loaded
    /// - Storage initialization fails
    pub async fn from_directory(working_dir: &Path, tenant_override: Option<&str>) -> Result<Self> {
        let root_dir = find_root(working_dir).ok_or_else(|| {
            Error::Config(format!(
                "Not a taskweave repository (no {TASKWEAVE_DIR_NAME} found). Run 'taskweave init' first."
            ))
        })?;

        let taskweave_dir = root_dir.join(TASKWEAVE_DIR_NAME);
        let config = TaskweaveConfig::load(&taskweave_dir.join(CONFIG_FILE_NAME)).await?;
        let tenant = config.resolve_tenant(tenant_override)?;

        let backend = config.storage.to_backend(&root_dir)?;
        tracing::debug!(backend = ?backend, tenant = %tenant, "Opening store");
        let store = create_store(backend, &config.id_prefix).await?;

        Ok(Self {
            graph: TaskGraph::new(store),
            tenant,
            taskweave_dir,
        })
    }

    /// Graph operations.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Mutable graph operations.
    pub fn graph_mut(&mut self) -> &mut TaskGraph {
        &mut self.graph
    }

    /// The resolved tenant.
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Get the path to the taskweave directory.
    pub fn taskweave_dir(&self) -> &Path {
        &self.taskweave_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::init;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_app_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), None, Some("acme")).await.unwrap();

        let sub_dir = temp_dir.path().join("src").join("lib");
        std::fs::create_dir_all(&sub_dir).unwrap();

        let app = App::from_directory(&sub_dir, None).await.unwrap();
        assert_eq!(app.tenant().as_str(), "acme");
        assert!(app.taskweave_dir().ends_with(TASKWEAVE_DIR_NAME));
    }

    #[tokio::test]
    async fn test_tenant_override() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), None, Some("acme")).await.unwrap();

        let app = App::from_directory(temp_dir.path(), Some("globex")).await.unwrap();
        assert_eq!(app.tenant().as_str(), "globex");
    }

    #[tokio::test]
    async fn test_missing_tenant() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), None, None).await.unwrap();

        let err = App::from_directory(temp_dir.path(), None).await.unwrap_err();
        assert!(matches!(err, Error::MissingTenant));
    }

    #[tokio::test]
    async fn test_uninitialized_directory() {
        let temp_dir = TempDir::new().unwrap();

        let err = App::from_directory(temp_dir.path(), Some("acme"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Not a taskweave repository"));
    }
}
