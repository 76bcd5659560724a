use crate::commands;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "deptree",
    about = "resolve and inspect npm dependency trees",
    version,
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the dependency tree of a package
    Tree(commands::tree::TreeArgs),
    /// List dependency loops of a package
    Loops(commands::loops::LoopsArgs),
    /// Build or query the lookup file of a registry dump
    Index(commands::index::IndexArgs),
}
