//! Read-only schema index.

use std::collections::HashMap;

use super::node::{QName, SchemaId, SchemaNode, SchemaPath};

/// Identity of a schema module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub prefix: String,
    pub namespace: String,
}

/// In-memory index over a compiled schema.
///
/// Built once by [`compile_schema`](super::compile_schema) and never mutated
/// afterwards, so a model can be shared behind an `Arc` by any number of
/// config trees and engines on any number of threads.
#[derive(Debug, Clone, Default)]
pub struct SchemaModel {
    pub(crate) modules: Vec<ModuleInfo>,
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) top: Vec<SchemaId>,
    pub(crate) data_roots: Vec<SchemaId>,
    pub(crate) by_path: HashMap<SchemaPath, SchemaId>,
    pub(crate) by_data_path: HashMap<String, SchemaId>,
    pub(crate) data_children: HashMap<(Option<SchemaId>, QName), SchemaId>,
    pub(crate) module_by_namespace: HashMap<String, usize>,
    pub(crate) module_by_prefix: HashMap<String, usize>,
    pub(crate) module_by_name: HashMap<String, usize>,
}

impl SchemaModel {
    /// Look up a node by id.
    ///
    /// Ids are only ever handed out by this model, so the lookup cannot miss.
    #[must_use]
    pub fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    /// All nodes in compilation order.
    pub fn nodes(&self) -> impl Iterator<Item = &SchemaNode> {
        self.nodes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level schema nodes of every module.
    #[must_use]
    pub fn top_level(&self) -> &[SchemaId] {
        &self.top
    }

    /// Top-level data nodes in schema order, looking through choice and case.
    #[must_use]
    pub fn data_roots(&self) -> &[SchemaId] {
        &self.data_roots
    }

    #[must_use]
    pub fn modules(&self) -> &[ModuleInfo] {
        &self.modules
    }

    /// Resolve a path to its schema node.
    ///
    /// The path may be a full schema path (choice and case segments included)
    /// or a data path that skips them.
    #[must_use]
    pub fn resolve(&self, path: &SchemaPath) -> Option<&SchemaNode> {
        if let Some(id) = self.by_path.get(path) {
            return Some(self.node(*id));
        }
        let mut parent = None;
        for qname in path.segments() {
            parent = Some(self.data_child(parent, qname)?);
        }
        parent.map(|id| self.node(id))
    }

    /// Resolve a prefixed data path such as `/if:interfaces/if:interface`.
    #[must_use]
    pub fn find(&self, data_path: &str) -> Option<&SchemaNode> {
        self.by_data_path.get(data_path).map(|id| self.node(*id))
    }

    /// Key leaf names of the list at `path`, empty if it is not a list.
    #[must_use]
    pub fn key_leaves_of(&self, path: &SchemaPath) -> &[String] {
        self.resolve(path).map_or(&[][..], SchemaNode::key_leaves)
    }

    /// Whether the collection at `path` is ordered by the user.
    #[must_use]
    pub fn is_user_ordered(&self, path: &SchemaPath) -> bool {
        self.resolve(path).is_some_and(SchemaNode::is_user_ordered)
    }

    /// Data child named `qname` under `parent` (`None` for the top level).
    #[must_use]
    pub fn data_child(&self, parent: Option<SchemaId>, qname: &QName) -> Option<SchemaId> {
        self.data_children.get(&(parent, qname.clone())).copied()
    }

    #[must_use]
    pub fn module_by_namespace(&self, namespace: &str) -> Option<&ModuleInfo> {
        self.module_by_namespace
            .get(namespace)
            .map(|idx| &self.modules[*idx])
    }

    #[must_use]
    pub fn module_by_prefix(&self, prefix: &str) -> Option<&ModuleInfo> {
        self.module_by_prefix.get(prefix).map(|idx| &self.modules[*idx])
    }

    #[must_use]
    pub fn module_by_name(&self, name: &str) -> Option<&ModuleInfo> {
        self.module_by_name.get(name).map(|idx| &self.modules[*idx])
    }

    /// Prefixed form `prefix:name` of a qualified name, falling back to the
    /// bare name when the namespace is not declared by any module.
    #[must_use]
    pub fn prefixed(&self, qname: &QName) -> String {
        match self.module_by_namespace(&qname.namespace) {
            Some(module) => format!("{}:{}", module.prefix, qname.name),
            None => qname.name.clone(),
        }
    }
}
