//! CLI argument structs for all commands.

use clap::Parser;

use super::validators::{validate_prefix, validate_task_id, validate_tenant};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Task ID prefix (e.g., "tw" for "tw-a3f8k2")
    ///
    /// Must be 2-20 alphanumeric characters.
    #[arg(short, long, value_parser = validate_prefix)]
    pub prefix: Option<String>,

    /// Default tenant written to the configuration
    ///
    /// Commands use it unless `--tenant` is passed.
    #[arg(long = "default-tenant", value_parser = validate_tenant)]
    pub default_tenant: Option<String>,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `check-cycle` command
#[derive(Parser, Debug, Clone)]
pub struct CheckCycleArgs {
    /// Task that would gain the dependency
    #[arg(value_parser = validate_task_id)]
    pub task_id: String,

    /// Task it would depend on
    #[arg(value_parser = validate_task_id)]
    pub depends_on: String,
}
