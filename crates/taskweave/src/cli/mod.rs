//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: Initialize a new taskweave repository
//! - `validate`: Report dependency problems without changing anything
//! - `fix`: Repair dependency problems
//! - `next`: Show the next task or subtask to work on
//! - `check-cycle`: Check whether a new dependency would close a cycle
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//! - `--tenant`: Tenant to operate on (overrides the configured tenant)
//!
//! # Example
//!
//! ```bash
//! taskweave init --default-tenant acme
//! taskweave validate
//! taskweave --tenant globex fix
//! taskweave --json next
//! taskweave check-cycle tw-a3f8k2 tw-9x2m1p
//! ```

mod args;
mod execute;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

// Re-export argument structs
pub use args::{CheckCycleArgs, InitArgs};

// Re-export validators for external use
pub use validators::{validate_prefix, validate_task_id, validate_tenant};

/// Taskweave - dependency graph checks for task lists
///
/// Validate and repair task dependencies, and find the next task whose
/// prerequisites are done. Data lives in `.taskweave/`.
#[derive(Parser, Debug)]
#[command(name = "taskweave")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Tenant to operate on (defaults to the configured tenant)
    #[arg(long, global = true, value_parser = validate_tenant)]
    pub tenant: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new taskweave repository
    ///
    /// Creates the `.taskweave/` directory with configuration and an empty
    /// task file.
    Init(InitArgs),

    /// Report dependency problems
    ///
    /// Lists missing, self, duplicate and circular dependencies. Never
    /// modifies any task.
    Validate,

    /// Repair dependency problems
    ///
    /// Removes missing, self and duplicate dependencies and breaks cycles.
    /// Running it twice changes nothing the second time.
    Fix,

    /// Show the next task to work on
    ///
    /// Picks the lowest-numbered task whose dependencies are all done,
    /// preferring its first open subtask.
    Next,

    /// Check whether adding a dependency would create a cycle
    CheckCycle(CheckCycleArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    ///
    /// # Errors
    ///
    /// Returns an error if the repository, tenant or store cannot be
    /// resolved, or the command itself fails.
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        let tenant = self.tenant.as_deref();

        match &self.command {
            Some(Commands::Init(args)) => execute::execute_init(args).await,
            Some(Commands::Validate) => {
                let app = App::from_directory(&std::env::current_dir()?, tenant).await?;
                execute::execute_validate(&app, output_mode).await
            }
            Some(Commands::Fix) => {
                let mut app = App::from_directory(&std::env::current_dir()?, tenant).await?;
                execute::execute_fix(&mut app, output_mode).await
            }
            Some(Commands::Next) => {
                let app = App::from_directory(&std::env::current_dir()?, tenant).await?;
                execute::execute_next(&app, output_mode).await
            }
            Some(Commands::CheckCycle(args)) => {
                let app = App::from_directory(&std::env::current_dir()?, tenant).await?;
                execute::execute_check_cycle(&app, args, output_mode).await
            }
            None => {
                println!("Taskweave dependency graph engine");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }
}
