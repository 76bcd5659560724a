use anyhow::Result;
use clap::{Args, Subcommand};
use deptree_core::lookup::LookupBuilder;
use deptree_core::{
    ConsoleLogger, DeptreeConfig, FlatFileProvider, PackageProvider, PackageVersion, console,
};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub command: IndexCommand,
}

#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Build the lookup file next to a registry dump
    Build {
        /// Path to the registry dump
        dump: PathBuf,

        /// Number of random entries to read back after building
        #[arg(long)]
        samples: Option<usize>,
    },
    /// Print a manifest read through the lookup file
    Get {
        /// Path to the registry dump
        dump: PathBuf,

        /// Package to read, e.g. `react` or `react@^18`
        package: String,
    },
}

pub async fn run(args: IndexArgs, config: &DeptreeConfig) -> Result<()> {
    match args.command {
        IndexCommand::Build { dump, samples } => {
            build(dump, samples.unwrap_or(config.verify_samples))
        }
        IndexCommand::Get { dump, package } => get(dump, &package).await,
    }
}

fn build(dump: PathBuf, samples: usize) -> Result<()> {
    console::header("index build", env!("CARGO_PKG_VERSION"));

    let started = Instant::now();
    let builder = LookupBuilder::new(dump).with_verify_samples(samples);
    let logger = ConsoleLogger::new();

    tracing::info!(dump = %builder.dump_path().display(), "building lookup file");
    console::step(&format!("Indexing {}", builder.dump_path().display()));
    let entries = builder.run(&logger)?;

    console::info(&format!(
        "Indexed {} packages into {} in {:.2}s",
        entries.len(),
        builder.lookup_path().display(),
        started.elapsed().as_secs_f64()
    ));

    Ok(())
}

async fn get(dump: PathBuf, package: &str) -> Result<()> {
    let request = PackageVersion::parse(package)?;
    let provider = FlatFileProvider::new(dump);

    let manifest = provider
        .get_package_json(&request.name, request.version.as_deref())
        .await?;

    println!("{}", serde_json::to_string_pretty(manifest.raw())?);
    Ok(())
}
