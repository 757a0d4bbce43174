//! Taskweave CLI binary.

use anyhow::Result;
use taskweave::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the taskweave CLI.
///
/// Uses tokio's `current_thread` runtime: every command is a short sequence
/// of awaited store calls.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Example: RUST_LOG=taskweave=debug taskweave fix
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskweave=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting taskweave CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Taskweave CLI completed successfully");
    Ok(())
}
