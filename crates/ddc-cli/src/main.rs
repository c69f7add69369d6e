//! Drawing Diff Core standalone batch-mode binary.

mod cli;
mod pipeline;

use anyhow::Context as _;
use clap::Parser;
use cli::Cli;
use pipeline::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to install tracing subscriber")?;

    let (exit_code, outcomes) = pipeline::run(&cli);

    let failed: Vec<_> = outcomes.iter().filter(|o| o.failed).collect();
    if !failed.is_empty() {
        tracing::warn!(failed = failed.len(), total = outcomes.len(), "some pages did not produce a diff");
    }
    match exit_code {
        ExitCode::Success => tracing::info!(pages = outcomes.len(), "batch diff complete"),
        ExitCode::InvalidInput => tracing::error!("invalid input"),
        ExitCode::DecodeFailure => tracing::error!("failed to decode one or both documents"),
        ExitCode::Timeout => tracing::error!("batch diff exceeded its timeout budget"),
        ExitCode::AllPagesFailed => tracing::error!("every page failed to produce a diff"),
    }

    std::process::exit(exit_code as i32);
}
