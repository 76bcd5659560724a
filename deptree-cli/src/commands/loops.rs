use super::open_provider;
use anyhow::Result;
use clap::Args;
use deptree_core::{
    ConsoleLogger, DependencyField, DeptreeConfig, PackageVersion, Visitor, console,
};
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct LoopsArgs {
    /// Package to resolve, e.g. `react` or `react@^18`
    pub package: String,

    /// Follow devDependencies instead of dependencies
    #[arg(long)]
    pub dev: bool,

    /// Maximum depth to expand
    #[arg(long)]
    pub depth: Option<usize>,

    /// Read packages from a registry dump instead of the online registry
    #[arg(long)]
    pub dump: Option<PathBuf>,
}

pub async fn run(args: LoopsArgs, config: &DeptreeConfig) -> Result<()> {
    console::header("loops", env!("CARGO_PKG_VERSION"));

    let entry = PackageVersion::parse(&args.package)?;
    let field = if args.dev {
        DependencyField::DevDependencies
    } else {
        DependencyField::Dependencies
    };

    let provider = open_provider(config, args.dump);
    let logger = ConsoleLogger::new();
    let mut visitor = Visitor::new(entry.clone(), provider.as_ref(), &logger);
    if let Some(depth) = args.depth.or(config.max_depth) {
        visitor = visitor.max_depth(depth);
    }

    console::step(&format!("Looking for loops in {} of {}", field, entry));

    let tree = visitor.visit(field).await?;

    // The same cycle shows up once per path that reaches it.
    let mut cycles = BTreeSet::new();

    for id in tree.loops() {
        let path: Vec<String> = tree
            .path_to(id)
            .into_iter()
            .map(|step| tree.node(step).full_name())
            .collect();

        let target = tree.node(id).full_name();
        let start = path
            .iter()
            .position(|name| *name == target)
            .unwrap_or(0);

        cycles.insert(path[start..].join(" -> "));
    }

    if cycles.is_empty() {
        console::info("No loops found.");
        return Ok(());
    }

    for cycle in &cycles {
        println!("{}", cycle);
    }

    println!();
    console::info(&format!(
        "{} distinct loops across {} loop nodes",
        cycles.len(),
        tree.loops().len()
    ));

    Ok(())
}
