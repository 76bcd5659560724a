use anyhow::Result;
use clap::Parser;
use deptree_core::{DeptreeConfig, console};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let mut config = DeptreeConfig::from_env();

    if args.verbose {
        config.verbose = true;
    }

    init_tracing(config.verbose)?;
    console::set_verbose(config.verbose);

    let result = match args.command {
        Command::Tree(args) => commands::tree::run(args, &config).await,
        Command::Loops(args) => commands::loops::run(args, &config).await,
        Command::Index(args) => commands::index::run(args, &config).await,
    };

    if let Err(err) = &result {
        tracing::debug!(error = ?err, "command failed");
    }

    result
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
