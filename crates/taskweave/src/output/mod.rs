//! Output formatting for CLI commands.
//!
//! Every command result can be printed as human-readable text or as pretty
//! JSON for programmatic use. Text writers take any `Write` so they can be
//! tested against a buffer.

pub mod color;

use crate::domain::TaskId;
use crate::repair::RepairReport;
use crate::schedule::{NextTask, WorkUnit};
use crate::validate::{IssueKind, ValidationReport};
use serde::Serialize;
use std::env;
use std::io::{self, Write};

pub use color::{error, info, success, warning};

use color::{bold, colorize_status, dimmed};

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new `OutputConfig` with explicit values.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Create an `OutputConfig` by reading from environment variables.
    ///
    /// Reads:
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `TASKWEAVE_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        // Respect NO_COLOR standard (https://no-color.org/)
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("TASKWEAVE_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self { use_colors }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

/// Output format selected by the global `--json` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Print a validation report
pub fn print_validation(report: &ValidationReport, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_validation_text(&mut handle, report, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, report),
    }
}

/// Print a repair report
pub fn print_repair(report: &RepairReport, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_repair_text(&mut handle, report, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, report),
    }
}

/// Print the next unit of work
pub fn print_next(next: &NextTask, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_next_text(&mut handle, next, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, next),
    }
}

/// JSON shape of a pre-flight cycle check
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CycleCheck<'a> {
    task_id: &'a TaskId,
    depends_on_id: &'a TaskId,
    would_create_cycle: bool,
}

/// Print the answer to a pre-flight cycle check
pub fn print_cycle_check(
    task_id: &TaskId,
    depends_on_id: &TaskId,
    would_create_cycle: bool,
    mode: OutputMode,
) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            if would_create_cycle {
                writeln!(
                    handle,
                    "{} {task_id} -> {depends_on_id} would create a circular dependency",
                    error("✗", &config)
                )
            } else {
                writeln!(
                    handle,
                    "{} {task_id} -> {depends_on_id} is safe to add",
                    success("✓", &config)
                )
            }
        }
        OutputMode::Json => write_json(
            &mut handle,
            &CycleCheck {
                task_id,
                depends_on_id,
                would_create_cycle,
            },
        ),
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{json}")
}

// ============================================================================
// Text Formatting
// ============================================================================

fn write_validation_text<W: Write>(
    w: &mut W,
    report: &ValidationReport,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "Checked {} tasks ({} with dependencies)",
        report.tasks_checked, report.tasks_with_dependencies
    )?;

    if report.is_valid() {
        return writeln!(w, "{}", success("✓ No dependency issues found", config));
    }

    for issue in &report.issues {
        writeln!(
            w,
            "  {} {}",
            error(&format!("[{}]", issue.kind), config),
            issue.message
        )?;
    }

    let summary = [
        IssueKind::MissingDependency,
        IssueKind::SelfDependency,
        IssueKind::DuplicateDependency,
        IssueKind::CircularDependency,
    ]
    .into_iter()
    .filter_map(|kind| match report.count(kind) {
        0 => None,
        n => Some(format!("{kind}: {n}")),
    })
    .collect::<Vec<_>>()
    .join(", ");

    writeln!(
        w,
        "{} {}",
        error(&format!("✗ {} issues", report.issues.len()), config),
        dimmed(&format!("({summary})"), config)
    )?;
    writeln!(w, "{}", dimmed("Run 'taskweave fix' to repair them.", config))
}

fn write_repair_text<W: Write>(w: &mut W, report: &RepairReport, config: &OutputConfig) -> io::Result<()> {
    if report.is_clean() {
        return writeln!(
            w,
            "{}",
            success(
                &format!("✓ Checked {} tasks, nothing to fix", report.tasks_checked),
                config
            )
        );
    }

    for fix in &report.fixes {
        writeln!(
            w,
            "{} {}",
            bold(&format!("Task {}", fix.task_number), config),
            dimmed(
                &format!("({} -> {} dependencies)", fix.original_count, fix.fixed_count),
                config
            )
        )?;
        for removed in &fix.removed {
            let count = if removed.count > 1 {
                format!(" x{}", removed.count)
            } else {
                String::new()
            };
            writeln!(
                w,
                "  {} {}{count}: {}",
                warning("-", config),
                info(removed.dependency_id.as_str(), config),
                removed.message
            )?;
        }
    }

    for failure in &report.failures {
        writeln!(
            w,
            "{} Task {}: {}",
            error("✗", config),
            failure.task_number,
            failure.error
        )?;
    }

    writeln!(
        w,
        "{}",
        success(
            &format!(
                "Removed {} dependencies across {} tasks",
                report.fixed_count,
                report.fixes.len()
            ),
            config
        )
    )?;
    if report.is_partial() {
        writeln!(
            w,
            "{}",
            warning(
                &format!(
                    "{} tasks could not be saved; run 'taskweave fix' again",
                    report.failures.len()
                ),
                config
            )
        )?;
    }
    Ok(())
}

fn write_next_text<W: Write>(w: &mut W, next: &NextTask, config: &OutputConfig) -> io::Result<()> {
    let Some(unit) = &next.unit else {
        return writeln!(w, "{}", dimmed(&next.message, config));
    };

    let (label, status) = match unit {
        WorkUnit::Task { task } => ("Task", task.status),
        WorkUnit::Subtask { subtask, .. } => ("Subtask", subtask.status),
    };
    writeln!(
        w,
        "{} {} - {} [{}]",
        bold(label, config),
        info(&unit.display_number(), config),
        unit.title(),
        colorize_status(status, config)
    )?;
    if let WorkUnit::Subtask { parent, .. } = unit {
        writeln!(
            w,
            "  {}",
            dimmed(&format!("of task {} - {}", parent.number, parent.title), config)
        )?;
    }
    Ok(())
}
