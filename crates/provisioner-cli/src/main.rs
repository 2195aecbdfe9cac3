mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Prepare => commands::prepare(&cli.request, &cli.dtrs_catalog, &cli.config).await,
        Command::Execute => commands::execute(&cli.request, &cli.dtrs_catalog, &cli.config).await,
        Command::Reconcile { cycles } => {
            commands::reconcile(&cli.request, &cli.dtrs_catalog, &cli.config, cycles).await
        }
        Command::Terminate { mark_only } => {
            commands::terminate(&cli.request, &cli.dtrs_catalog, &cli.config, mark_only).await
        }
    }
}
