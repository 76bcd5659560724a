use crate::attachment::{AttachmentFailure, AttachmentValue};
use crate::manifest::{Manifest, lookup_path};
use crate::{DeptreeError, Result};
use serde_json::Value;
use std::any::{Any, type_name};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct PackageNode {
    name: String,
    version: String,
    alias: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    is_loop: bool,
    manifest: Manifest,
    attachments: BTreeMap<String, AttachmentValue>,
}

impl PackageNode {
    pub fn from_manifest(manifest: Manifest) -> Result<Self> {
        let name = manifest.name()?.to_string();
        let version = manifest.version()?.to_string();

        Ok(PackageNode {
            name,
            version,
            alias: None,
            parent: None,
            children: Vec::new(),
            is_loop: false,
            manifest,
            attachments: BTreeMap::new(),
        })
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn full_name(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn direct_dependencies(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_loop(&self) -> bool {
        self.is_loop
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn raw_data(&self) -> &Value {
        self.manifest.raw()
    }

    /// Reads a dotted path out of the manifest, e.g. `license` or `repository.url`.
    pub fn get_data(&self, path: &str) -> Option<&Value> {
        lookup_path(self.manifest.raw(), path)
    }

    pub fn attachment_data(&self, key: &str) -> Result<&AttachmentValue> {
        self.attachments
            .get(key)
            .ok_or_else(|| DeptreeError::AttachmentMissing {
                package: self.full_name(),
                key: key.to_string(),
            })
    }

    /// Typed read of attachment data; a missing key and a wrong type are
    /// distinct errors.
    pub fn attachment<T: Any>(&self, key: &str) -> Result<&T> {
        self.attachment_data(key)?
            .downcast_ref::<T>()
            .ok_or_else(|| DeptreeError::AttachmentType {
                package: self.full_name(),
                key: key.to_string(),
                expected: type_name::<T>(),
            })
    }

    pub fn set_attachment_data(&mut self, key: impl Into<String>, value: AttachmentValue) {
        self.attachments.insert(key.into(), value);
    }
}

/// Nodes live in an arena and refer to each other by [`NodeId`]. A package
/// reached through two different parents is stored twice, once per path.
#[derive(Debug)]
pub struct PackageTree {
    nodes: Vec<PackageNode>,
    failures: Vec<AttachmentFailure>,
}

impl PackageTree {
    pub fn new(mut root: PackageNode) -> Self {
        root.parent = None;
        root.is_loop = false;
        PackageTree {
            nodes: vec![root],
            failures: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Panics if `id` was not handed out by this tree.
    pub fn node(&self, id: NodeId) -> &PackageNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut PackageNode {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&PackageNode> {
        self.nodes.get(id.0)
    }

    pub fn parent(&self, id: NodeId) -> Option<&PackageNode> {
        self.node(id).parent.map(|parent| self.node(parent))
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &PackageNode)> {
        self.node(id)
            .children
            .iter()
            .map(|child| (*child, self.node(*child)))
    }

    /// Appends `child` under `parent`, keeping insertion order.
    pub fn add_child(&mut self, parent: NodeId, mut child: PackageNode, is_loop: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        child.parent = Some(parent);
        child.is_loop = is_loop;
        child.children.clear();
        self.nodes.push(child);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Number of edges between the root and `id`.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.node(id).parent;

        while let Some(parent) = current {
            depth += 1;
            current = self.node(parent).parent;
        }

        depth
    }

    /// Node ids from the root down to `id`, inclusive.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = self.node(id).parent;

        while let Some(parent) = current {
            path.push(parent);
            current = self.node(parent).parent;
        }

        path.reverse();
        path
    }

    /// Depth-first, pre-order walk of the subtree under `start`, children in
    /// declaration order.
    pub fn visit<F>(&self, start: NodeId, include_self: bool, mut callback: F)
    where
        F: FnMut(NodeId, &PackageNode),
    {
        let mut stack: Vec<NodeId> = Vec::new();

        if include_self {
            stack.push(start);
        } else {
            stack.extend(self.node(start).children.iter().rev().copied());
        }

        while let Some(id) = stack.pop() {
            let node = self.node(id);
            callback(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    pub fn loops(&self) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.visit(self.root(), true, |id, node| {
            if node.is_loop {
                found.push(id);
            }
        });
        found
    }

    /// Distinct `name@version`s in the tree.
    pub fn distinct(&self) -> BTreeSet<String> {
        self.nodes.iter().map(PackageNode::full_name).collect()
    }

    pub fn record_failures(&mut self, failures: impl IntoIterator<Item = AttachmentFailure>) {
        self.failures.extend(failures);
    }

    /// Attachment runs that failed during traversal.
    pub fn failures(&self) -> &[AttachmentFailure] {
        &self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(name: &str, version: &str) -> PackageNode {
        PackageNode::from_manifest(Manifest::new(json!({
            "name": name,
            "version": version,
            "license": "MIT",
            "repository": { "url": format!("https://example.com/{}", name) }
        })))
        .unwrap()
    }

    fn fixture() -> (PackageTree, NodeId, NodeId, NodeId) {
        let mut tree = PackageTree::new(node("app", "1.0.0"));
        let root = tree.root();
        let a = tree.add_child(root, node("a", "1.0.0"), false);
        let c = tree.add_child(a, node("c", "1.0.0"), false);
        let b = tree.add_child(root, node("b", "1.0.0"), false);
        tree.add_child(b, node("c", "1.0.0"), false);
        (tree, a, b, c)
    }

    #[test]
    fn visits_depth_first_in_order() {
        let (tree, ..) = fixture();
        let mut seen = Vec::new();
        tree.visit(tree.root(), true, |_, node| seen.push(node.full_name()));

        assert_eq!(
            seen,
            vec!["app@1.0.0", "a@1.0.0", "c@1.0.0", "b@1.0.0", "c@1.0.0"]
        );

        let mut without_self = Vec::new();
        tree.visit(tree.root(), false, |_, node| without_self.push(node.name().to_string()));
        assert_eq!(without_self, vec!["a", "c", "b", "c"]);
    }

    #[test]
    fn parent_links_and_depth() {
        let (tree, a, _, c) = fixture();
        assert_eq!(tree.parent(c).map(PackageNode::name), Some("a"));
        assert!(tree.parent(tree.root()).is_none());
        assert_eq!(tree.depth(c), 2);
        assert_eq!(tree.path_to(c), vec![tree.root(), a, c]);
        assert_eq!(tree.distinct().len(), 4);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn reads_manifest_paths() {
        let (tree, a, ..) = fixture();
        let a = tree.node(a);
        assert_eq!(a.raw_data()["name"], json!("a"));
        assert_eq!(a.get_data("license"), Some(&json!("MIT")));
        assert_eq!(
            a.get_data("repository.url"),
            Some(&json!("https://example.com/a"))
        );
        assert!(a.get_data("nope").is_none());
    }

    #[test]
    fn attachment_reads_fail_distinctly() {
        let (mut tree, a, ..) = fixture();
        tree.node_mut(a)
            .set_attachment_data("size", AttachmentValue::new(1024u64));

        let a = tree.node(a);
        assert_eq!(*a.attachment::<u64>("size").unwrap(), 1024);
        assert!(matches!(
            a.attachment::<u64>("missing"),
            Err(DeptreeError::AttachmentMissing { .. })
        ));
        assert!(matches!(
            a.attachment::<String>("size"),
            Err(DeptreeError::AttachmentType { .. })
        ));
    }
}
