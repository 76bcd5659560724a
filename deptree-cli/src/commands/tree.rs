use super::open_provider;
use anyhow::Result;
use clap::Args;
use deptree_core::attachment::{ReleaseAttachment, ReleaseInfo};
use deptree_core::{
    Attachments, ConsoleLogger, DependencyField, DeptreeConfig, NodeId, PackageTree,
    PackageVersion, Visitor, console,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct TreeArgs {
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

    /// Attach the publish date of every package
    #[arg(long)]
    pub release: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TreeJson {
    name: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_loop: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    published: Option<String>,
    dependencies: Vec<TreeJson>,
}

pub async fn run(args: TreeArgs, config: &DeptreeConfig) -> Result<()> {
    if !args.json {
        console::header("tree", env!("CARGO_PKG_VERSION"));
    }

    let entry = PackageVersion::parse(&args.package)?;
    let field = if args.dev {
        DependencyField::DevDependencies
    } else {
        DependencyField::Dependencies
    };

    let provider = open_provider(config, args.dump);
    let mut attachments = Attachments::new();
    if args.release {
        attachments.insert(
            ReleaseAttachment::KEY,
            Arc::new(ReleaseAttachment::new(provider.clone())),
        );
    }

    let logger = ConsoleLogger::new();
    let mut visitor = Visitor::new(entry.clone(), provider.as_ref(), &logger).attachments(attachments);
    if let Some(depth) = args.depth.or(config.max_depth) {
        visitor = visitor.max_depth(depth);
    }

    tracing::info!(package = %entry, field = %field, "resolving tree");
    if !args.json {
        console::step(&format!("Resolving {} of {}", field, entry));
    }
    let tree = visitor.visit(field).await?;
    tracing::info!(nodes = tree.len(), distinct = tree.distinct().len(), "resolved tree");

    for failure in tree.failures() {
        console::warn(&format!(
            "{} could not be attached to {}: {}",
            failure.key, failure.package, failure.reason
        ));
    }

    if args.json {
        let json = to_json(&tree, tree.root());
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    print_tree(&tree);
    println!();
    console::info(&format!(
        "{} packages ({} distinct, {} loops)",
        tree.len(),
        tree.distinct().len(),
        tree.loops().len()
    ));

    Ok(())
}

fn published(tree: &PackageTree, id: NodeId) -> Option<String> {
    tree.node(id)
        .attachment::<ReleaseInfo>(ReleaseAttachment::KEY)
        .ok()
        .and_then(ReleaseInfo::published_rfc3339)
}

fn print_tree(tree: &PackageTree) {
    tree.visit(tree.root(), true, |id, node| {
        let indent = "  ".repeat(tree.depth(id));
        let mut line = format!("{}{}", indent, node.full_name());

        if let Some(alias) = node.alias() {
            line.push_str(&format!(" (as {})", alias));
        }

        if let Some(date) = published(tree, id) {
            line.push_str(&format!(" [{}]", date));
        }

        if node.is_loop() {
            line.push_str(" (loop)");
        }

        println!("{}", line);
    });
}

fn to_json(tree: &PackageTree, id: NodeId) -> TreeJson {
    let node = tree.node(id);

    TreeJson {
        name: node.name().to_string(),
        version: node.version().to_string(),
        alias: node.alias().map(str::to_string),
        is_loop: node.is_loop(),
        published: published(tree, id),
        dependencies: node
            .direct_dependencies()
            .iter()
            .map(|child| to_json(tree, *child))
            .collect(),
    }
}
