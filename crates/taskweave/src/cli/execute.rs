//! Command execution functions.
//!
//! Each `execute_*` function runs one command against an [`App`] and prints
//! its result in the requested [`OutputMode`].

use anyhow::Result;

use super::args::{CheckCycleArgs, InitArgs};
use crate::app::App;
use crate::domain::TaskId;
use crate::output::{self, OutputMode};

/// Execute the init command
pub async fn execute_init(args: &InitArgs) -> Result<()> {
    let current_dir = std::env::current_dir()?;

    if !args.quiet {
        println!(
            "Initializing taskweave repository{}...",
            args.prefix
                .as_ref()
                .map(|p| format!(" with prefix '{p}'"))
                .unwrap_or_default()
        );
    }

    let result = crate::config::init(
        &current_dir,
        args.prefix.as_deref(),
        args.default_tenant.as_deref(),
    )
    .await?;

    if !args.quiet {
        println!("Initialized taskweave in {}", result.taskweave_dir.display());
        println!("  Config: {}", result.config_file.display());
        println!("  Tasks: {}", result.tasks_file.display());
        println!("  Task prefix: {}", result.prefix);
    }

    Ok(())
}

/// Execute the validate command
pub async fn execute_validate(app: &App, output_mode: OutputMode) -> Result<()> {
    let report = app.graph().validate_dependencies(app.tenant()).await?;
    output::print_validation(&report, output_mode)?;
    Ok(())
}

/// Execute the fix command
pub async fn execute_fix(app: &mut App, output_mode: OutputMode) -> Result<()> {
    let tenant = app.tenant().clone();
    let report = app.graph_mut().fix_dependencies(&tenant).await?;
    output::print_repair(&report, output_mode)?;
    Ok(())
}

/// Execute the next command
pub async fn execute_next(app: &App, output_mode: OutputMode) -> Result<()> {
    let next = app.graph().find_next_task(app.tenant()).await?;
    output::print_next(&next, output_mode)?;
    Ok(())
}

/// Execute the check-cycle command
pub async fn execute_check_cycle(app: &App, args: &CheckCycleArgs, output_mode: OutputMode) -> Result<()> {
    let task_id = TaskId::new(args.task_id.as_str());
    let depends_on = TaskId::new(args.depends_on.as_str());

    let cycle = app
        .graph()
        .would_create_cycle(app.tenant(), &task_id, &depends_on)
        .await?;
    output::print_cycle_check(&task_id, &depends_on, cycle, output_mode)?;
    Ok(())
}
