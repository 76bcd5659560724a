use crate::attachment::{AttachmentContext, AttachmentFailure, Attachments};
use crate::logger::Logger;
use crate::manifest::{DependencyField, Manifest};
use crate::package::{NodeId, PackageNode, PackageTree};
use crate::provider::PackageProvider;
use crate::spec::{DependencyRequest, PackageVersion, dependency_request};
use crate::{DeptreeError, Result};
use async_recursion::async_recursion;
use futures::StreamExt;

/// Builds a [`PackageTree`] by walking the dependency field of each manifest,
/// depth first. A child whose `name@version` is already on the path from the
/// root is kept as a loop node and not expanded; the same package elsewhere
/// in the tree is expanded as usual.
pub struct Visitor<'a> {
    entry: PackageVersion,
    provider: &'a dyn PackageProvider,
    logger: &'a dyn Logger,
    max_depth: usize,
    attachments: Attachments,
}

impl<'a> Visitor<'a> {
    pub fn new(
        entry: PackageVersion,
        provider: &'a dyn PackageProvider,
        logger: &'a dyn Logger,
    ) -> Self {
        Visitor {
            entry,
            provider,
            logger,
            max_depth: usize::MAX,
            attachments: Attachments::new(),
        }
    }

    /// Longest root-to-node path that still gets expanded. Nodes one level
    /// below the limit are fetched but kept as leaves.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn attachments(mut self, attachments: Attachments) -> Self {
        self.attachments = attachments;
        self
    }

    pub async fn visit(&self, field: DependencyField) -> Result<PackageTree> {
        self.logger.start();
        let result = self.walk(field).await;
        self.logger.stop();
        result
    }

    async fn walk(&self, field: DependencyField) -> Result<PackageTree> {
        let requested = self.entry.full_name();
        self.logger.log(&format!("Fetching {}", requested));

        let manifest = self
            .provider
            .get_package_json(&self.entry.name, self.entry.version.as_deref())
            .await
            .map_err(|err| err.in_package(requested.clone()))?;

        let (root, failures) = self.build_node(manifest, None).await?;
        let root_name = root.full_name();

        let mut tree = PackageTree::new(root);
        tree.record_failures(failures);

        let mut path = vec![root_name];
        let root_id = tree.root();
        self.expand(&mut tree, root_id, field, &mut path).await?;

        Ok(tree)
    }

    #[async_recursion]
    async fn expand(
        &self,
        tree: &mut PackageTree,
        id: NodeId,
        field: DependencyField,
        path: &mut Vec<String>,
    ) -> Result<()> {
        if path.len() > self.max_depth {
            return Ok(());
        }

        let parent_name = tree.node(id).full_name();
        let requests = tree
            .node(id)
            .manifest()
            .dependencies(field)?
            .iter()
            .map(|(name, range)| dependency_request(name, range))
            .collect::<Result<Vec<DependencyRequest>>>()?;

        if requests.is_empty() {
            return Ok(());
        }

        self.logger.log(&format!(
            "Fetching {} {} of {}",
            requests.len(),
            field,
            parent_name
        ));

        let pairs = requests
            .iter()
            .map(|request| request.target.clone())
            .collect();
        let mut manifests = self.provider.get_package_jsons(pairs);

        for request in requests {
            let manifest = match manifests.next().await {
                Some(fetched) => fetched.map_err(|err| err.in_package(parent_name.clone()))?,
                None => {
                    return Err(DeptreeError::PackageNotFound {
                        name: request.target.full_name(),
                    }
                    .in_package(parent_name));
                }
            };

            let (child, failures) = self.build_node(manifest, request.alias).await?;
            let child_name = child.full_name();
            let is_loop = path.contains(&child_name);

            tree.record_failures(failures);
            let child_id = tree.add_child(id, child, is_loop);

            if is_loop {
                self.logger
                    .log(&format!("Loop: {} -> {}", path.join(" -> "), child_name));
                continue;
            }

            if path.len() < self.max_depth {
                path.push(child_name);
                self.expand(tree, child_id, field, path).await?;
                path.pop();
            }
        }

        Ok(())
    }

    async fn build_node(
        &self,
        manifest: Manifest,
        alias: Option<String>,
    ) -> Result<(PackageNode, Vec<AttachmentFailure>)> {
        let mut node = PackageNode::from_manifest(manifest)?.with_alias(alias);

        if self.attachments.is_empty() {
            return Ok((node, Vec::new()));
        }

        let ctx = AttachmentContext {
            name: node.name(),
            version: node.version(),
            manifest: node.manifest(),
            logger: self.logger,
        };
        let report = self.attachments.run(&ctx).await;

        for (key, value) in report.data {
            node.set_attachment_data(key, value);
        }

        Ok((node, report.failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{Attachment, AttachmentValue};
    use crate::logger::{LogLine, MemoryLogger, NullLogger};
    use crate::provider::MemoryProvider;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manifest(name: &str, version: &str, deps: &[(&str, &str)]) -> Value {
        let deps: serde_json::Map<String, Value> = deps
            .iter()
            .map(|(name, range)| (name.to_string(), json!(range)))
            .collect();
        json!({ "name": name, "version": version, "dependencies": deps })
    }

    fn provider(manifests: Vec<Value>) -> MemoryProvider {
        let mut provider = MemoryProvider::new();
        for manifest in manifests {
            provider.insert_manifest(manifest).unwrap();
        }
        provider
    }

    fn names(tree: &PackageTree) -> Vec<String> {
        let mut names = Vec::new();
        tree.visit(tree.root(), true, |_, node| names.push(node.full_name()));
        names
    }

    #[tokio::test]
    async fn detects_loops_on_the_current_path() {
        let provider = provider(vec![
            manifest("app", "1.0.0", &[("lib", "1.0.0")]),
            manifest("lib", "1.0.0", &[("app", "1.0.0")]),
        ]);

        let tree = Visitor::new(
            PackageVersion::parse("app@1.0.0").unwrap(),
            &provider,
            &NullLogger,
        )
        .visit(DependencyField::Dependencies)
        .await
        .unwrap();

        assert_eq!(names(&tree), vec!["app@1.0.0", "lib@1.0.0", "app@1.0.0"]);

        let loops = tree.loops();
        assert_eq!(loops.len(), 1);
        let looped = tree.node(loops[0]);
        assert_eq!(looped.full_name(), "app@1.0.0");
        assert!(looped.direct_dependencies().is_empty());
        assert!(!tree.node(tree.root()).is_loop());
    }

    #[tokio::test]
    async fn diamond_is_materialized_per_path() {
        let provider = provider(vec![
            manifest("app", "1.0.0", &[("a", "^1.0.0"), ("b", "^1.0.0")]),
            manifest("a", "1.0.0", &[("c", "^1.0.0")]),
            manifest("b", "1.0.0", &[("c", "^1.0.0")]),
            manifest("c", "1.0.0", &[]),
        ]);

        let tree = Visitor::new(PackageVersion::latest("app"), &provider, &NullLogger)
            .visit(DependencyField::Dependencies)
            .await
            .unwrap();

        assert_eq!(tree.len(), 5);
        assert_eq!(
            names(&tree),
            vec!["app@1.0.0", "a@1.0.0", "c@1.0.0", "b@1.0.0", "c@1.0.0"]
        );
        assert!(tree.loops().is_empty());
        assert_eq!(tree.distinct().len(), 4);
    }

    #[tokio::test]
    async fn children_follow_declaration_order() {
        let provider = provider(vec![
            manifest("app", "1.0.0", &[("zed", "1.0.0"), ("alpha", "1.0.0")]),
            manifest("zed", "1.0.0", &[]),
            manifest("alpha", "1.0.0", &[]),
        ]);

        let tree = Visitor::new(PackageVersion::latest("app"), &provider, &NullLogger)
            .visit(DependencyField::Dependencies)
            .await
            .unwrap();

        let children: Vec<_> = tree
            .children(tree.root())
            .map(|(_, node)| node.name().to_string())
            .collect();
        assert_eq!(children, vec!["zed", "alpha"]);
        for (id, _) in tree.children(tree.root()) {
            assert_eq!(tree.parent(id).map(PackageNode::name), Some("app"));
        }
    }

    #[tokio::test]
    async fn depth_limit_keeps_boundary_nodes_as_leaves() {
        let provider = provider(vec![
            manifest("a", "1.0.0", &[("b", "1.0.0")]),
            manifest("b", "1.0.0", &[("c", "1.0.0")]),
            manifest("c", "1.0.0", &[("d", "1.0.0")]),
            manifest("d", "1.0.0", &[]),
        ]);

        for (max_depth, expected) in [
            (0, vec!["a@1.0.0"]),
            (1, vec!["a@1.0.0", "b@1.0.0"]),
            (2, vec!["a@1.0.0", "b@1.0.0", "c@1.0.0"]),
            (10, vec!["a@1.0.0", "b@1.0.0", "c@1.0.0", "d@1.0.0"]),
        ] {
            let tree = Visitor::new(PackageVersion::latest("a"), &provider, &NullLogger)
                .max_depth(max_depth)
                .visit(DependencyField::Dependencies)
                .await
                .unwrap();

            assert_eq!(names(&tree), expected, "max_depth = {max_depth}");
        }
    }

    #[tokio::test]
    async fn uses_the_selected_dependency_field() {
        let provider = provider(vec![
            json!({
                "name": "app",
                "version": "1.0.0",
                "dependencies": { "runtime": "1.0.0" },
                "devDependencies": { "tool": "1.0.0" }
            }),
            manifest("runtime", "1.0.0", &[]),
            json!({
                "name": "tool",
                "version": "1.0.0",
                "devDependencies": { "tool-helper": "1.0.0" }
            }),
            manifest("tool-helper", "1.0.0", &[]),
        ]);

        let tree = Visitor::new(PackageVersion::latest("app"), &provider, &NullLogger)
            .visit(DependencyField::DevDependencies)
            .await
            .unwrap();

        assert_eq!(
            names(&tree),
            vec!["app@1.0.0", "tool@1.0.0", "tool-helper@1.0.0"]
        );
    }

    #[tokio::test]
    async fn resolves_npm_aliases() {
        let provider = provider(vec![
            manifest("app", "1.0.0", &[("old-name", "npm:real-name@^2.0.0")]),
            manifest("real-name", "2.1.0", &[]),
        ]);

        let tree = Visitor::new(PackageVersion::latest("app"), &provider, &NullLogger)
            .visit(DependencyField::Dependencies)
            .await
            .unwrap();

        let (_, child) = tree.children(tree.root()).next().unwrap();
        assert_eq!(child.full_name(), "real-name@2.1.0");
        assert_eq!(child.alias(), Some("old-name"));
        assert_eq!(tree.node(tree.root()).alias(), None);
    }

    #[tokio::test]
    async fn provider_failure_aborts_with_context() {
        let provider = provider(vec![
            manifest("app", "1.0.0", &[("lib", "1.0.0")]),
            manifest("lib", "1.0.0", &[("ghost", "^1.0.0")]),
        ]);
        let logger = MemoryLogger::new();

        let err = Visitor::new(PackageVersion::latest("app"), &provider, &logger)
            .visit(DependencyField::Dependencies)
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            DeptreeError::Traversal { package, .. } if package == "lib@1.0.0"
        ));
        assert!(matches!(
            err.root_cause(),
            DeptreeError::PackageNotFound { name } if name == "ghost"
        ));
        assert_eq!(logger.lines().last(), Some(&LogLine::Stopped));
    }

    #[tokio::test]
    async fn missing_root_names_the_request() {
        let provider = MemoryProvider::new();
        let err = Visitor::new(
            PackageVersion::parse("nope@^1").unwrap(),
            &provider,
            &NullLogger,
        )
        .visit(DependencyField::Dependencies)
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DeptreeError::Traversal { ref package, .. } if package == "nope@^1"
        ));
    }

    #[tokio::test]
    async fn malformed_dependency_list_is_fatal() {
        let provider = provider(vec![json!({
            "name": "app",
            "version": "1.0.0",
            "dependencies": "lib"
        })]);

        let err = Visitor::new(PackageVersion::latest("app"), &provider, &NullLogger)
            .visit(DependencyField::Dependencies)
            .await
            .unwrap_err();

        assert!(matches!(err, DeptreeError::InvalidDependencies { .. }));
    }

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Attachment for Counter {
        async fn apply(&self, _ctx: &AttachmentContext<'_>) -> Result<AttachmentValue> {
            let seen = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(AttachmentValue::new(seen))
        }
    }

    struct FailsFor(&'static str);

    #[async_trait]
    impl Attachment for FailsFor {
        async fn apply(&self, ctx: &AttachmentContext<'_>) -> Result<AttachmentValue> {
            if ctx.name == self.0 {
                return Err(DeptreeError::AttachmentFailed {
                    package: ctx.full_name(),
                    key: "flaky".into(),
                    reason: "boom".into(),
                });
            }
            Ok(AttachmentValue::new(ctx.full_name()))
        }
    }

    #[tokio::test]
    async fn attachment_failures_are_isolated() {
        let provider = provider(vec![
            manifest("app", "1.0.0", &[("lib", "1.0.0")]),
            manifest("lib", "1.0.0", &[]),
        ]);
        let logger = MemoryLogger::new();
        let count = Arc::new(AtomicUsize::new(0));

        let attachments = Attachments::new()
            .with("flaky", FailsFor("lib"))
            .with("count", Counter(count.clone()));

        let tree = Visitor::new(PackageVersion::latest("app"), &provider, &logger)
            .attachments(attachments)
            .visit(DependencyField::Dependencies)
            .await
            .unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let root = tree.node(tree.root());
        assert_eq!(root.attachment::<String>("flaky").unwrap(), "app@1.0.0");
        assert_eq!(*root.attachment::<usize>("count").unwrap(), 0);

        let (_, lib) = tree.children(tree.root()).next().unwrap();
        assert_eq!(*lib.attachment::<usize>("count").unwrap(), 1);
        assert!(matches!(
            lib.attachment::<String>("flaky"),
            Err(DeptreeError::AttachmentMissing { .. })
        ));

        assert_eq!(tree.failures().len(), 1);
        assert_eq!(tree.failures()[0].package, "lib@1.0.0");
        assert_eq!(logger.errors().len(), 1);
    }
}
