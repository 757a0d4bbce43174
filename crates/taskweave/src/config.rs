//! Repository configuration and initialization.
//!
//! A taskweave repository is a directory holding `.taskweave/config.yaml`
//! and, for the JSONL backend, `.taskweave/tasks.jsonl`. Commands find it
//! by walking up from the working directory.

use crate::domain::TenantId;
use crate::error::{Error, Result};
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Default task ID prefix if none specified
pub const DEFAULT_PREFIX: &str = "tw";

/// Name of the taskweave directory
pub const TASKWEAVE_DIR_NAME: &str = ".taskweave";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the tasks data file
pub const TASKS_FILE_NAME: &str = "tasks.jsonl";

/// Name of the gitignore file within .taskweave
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Minimum prefix length
pub const MIN_PREFIX_LENGTH: usize = 2;

/// Maximum prefix length
pub const MAX_PREFIX_LENGTH: usize = 20;

/// Maximum directory depth to traverse when searching for the repository root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Backend name for the persistent JSONL store
pub const BACKEND_JSONL: &str = "jsonl";

/// Backend name for the ephemeral in-memory store
pub const BACKEND_MEMORY: &str = "memory";

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskweaveConfig {
    /// Task ID prefix (e.g., "tw" for "tw-a3f8k2")
    #[serde(rename = "id-prefix")]
    pub id_prefix: String,

    /// Tenant used when `--tenant` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    /// Storage configuration
    pub storage: StorageConfig,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Storage backend type ("jsonl" or "memory")
    pub backend: String,

    /// Path to the data file, relative to the repository root
    pub data_file: String,
}

impl StorageConfig {
    /// Resolve the configured backend against the repository root.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown backend name or a data file
    /// path that is absolute or leaves the repository.
    pub fn to_backend(&self, root: &Path) -> Result<StorageBackend> {
        match self.backend.as_str() {
            BACKEND_MEMORY => Ok(StorageBackend::InMemory),
            BACKEND_JSONL => {
                let relative = Path::new(&self.data_file);
                let escapes = relative.is_absolute()
                    || relative
                        .components()
                        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
                if escapes {
                    return Err(Error::Config(format!(
                        "data_file must be a path inside the repository, got '{}'",
                        self.data_file
                    )));
                }
                Ok(StorageBackend::Jsonl(root.join(relative)))
            }
            other => Err(Error::Config(format!(
                "Unknown storage backend '{other}' (expected '{BACKEND_JSONL}' or '{BACKEND_MEMORY}')"
            ))),
        }
    }
}

impl TaskweaveConfig {
    /// Create a new configuration with the given prefix and JSONL storage
    pub fn new(prefix: &str) -> Self {
        Self {
            id_prefix: prefix.to_string(),
            tenant: None,
            storage: StorageConfig {
                backend: BACKEND_JSONL.to_string(),
                data_file: format!("{TASKWEAVE_DIR_NAME}/{TASKS_FILE_NAME}"),
            },
        }
    }

    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file can't be read or `Error::Config` if
    /// it isn't valid configuration YAML.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// The tenant to operate on: `override_tenant` if given, else the
    /// configured one.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingTenant` if neither is set or the chosen value
    /// is blank.
    pub fn resolve_tenant(&self, override_tenant: Option<&str>) -> Result<TenantId> {
        TenantId::resolve(override_tenant.or(self.tenant.as_deref()))
    }
}

impl Default for TaskweaveConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created taskweave directory
    pub taskweave_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created tasks file
    pub tasks_file: PathBuf,
    /// The prefix used for task IDs
    pub prefix: String,
}

/// Validate task ID prefix format.
///
/// 2-20 ASCII alphanumeric characters. Expects pre-trimmed input.
///
/// # Errors
///
/// Returns `Error::Config` describing the first violated rule.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.len() < MIN_PREFIX_LENGTH {
        return Err(Error::Config(format!(
            "Prefix must be at least {MIN_PREFIX_LENGTH} characters"
        )));
    }

    if prefix.len() > MAX_PREFIX_LENGTH {
        return Err(Error::Config(format!(
            "Prefix cannot exceed {MAX_PREFIX_LENGTH} characters"
        )));
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::Config(
            "Prefix must contain only alphanumeric characters".to_string(),
        ));
    }

    Ok(())
}

/// Initialize a new taskweave repository in `base_dir`.
///
/// # Errors
///
/// Returns an error if:
/// - The `.taskweave/` directory already exists
/// - The prefix is invalid
/// - The tenant is given but blank
/// - File system operations fail
pub async fn init(base_dir: &Path, prefix: Option<&str>, tenant: Option<&str>) -> Result<InitResult> {
    let prefix = prefix.unwrap_or(DEFAULT_PREFIX).trim();
    validate_prefix(prefix)?;
    let tenant = tenant.map(TenantId::new).transpose()?;

    let taskweave_dir = base_dir.join(TASKWEAVE_DIR_NAME);
    if taskweave_dir.exists() {
        return Err(Error::Config(format!(
            "Taskweave is already initialized in this directory. Found existing '{TASKWEAVE_DIR_NAME}'"
        )));
    }

    fs::create_dir_all(&taskweave_dir).await?;

    let config_file = taskweave_dir.join(CONFIG_FILE_NAME);
    let mut config = TaskweaveConfig::new(prefix);
    config.tenant = tenant.map(|t| t.as_str().to_string());
    config.save(&config_file).await?;

    let tasks_file = taskweave_dir.join(TASKS_FILE_NAME);
    fs::write(&tasks_file, "").await?;

    let gitignore_content = "\
# Temporary files left by interrupted saves
*.tmp
";
    fs::write(taskweave_dir.join(GITIGNORE_FILE_NAME), gitignore_content).await?;

    Ok(InitResult {
        taskweave_dir,
        config_file,
        tasks_file,
        prefix: prefix.to_string(),
    })
}

/// Find the repository root by searching up the directory tree.
///
/// Returns the directory containing `.taskweave/`, or `None` if none is
/// found within [`MAX_TRAVERSAL_DEPTH`] levels.
pub fn find_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(TASKWEAVE_DIR_NAME).exists() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
