//! Cabletrace CLI binary.

use anyhow::Result;
use cabletrace::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Uses tokio's current_thread runtime; every command is a short run of
/// sequential file I/O.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // RUST_LOG overrides the -v count
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting cabletrace CLI");
    cli.execute().await?;
    tracing::debug!("Cabletrace CLI completed successfully");
    Ok(())
}
