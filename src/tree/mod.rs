//! Config trees.
//!
//! A [`ConfigTree`] owns one configuration snapshot: a forest of namespaced
//! [`DataNode`]s, each resolved against the shared [`SchemaModel`]. Trees are
//! immutable; [`merge`](ConfigTree::merge), [`filter`](ConfigTree::filter) and
//! delta application always return a new tree.
//!
//! # Example
//!
//! ```ignore
//! use yang_delta::tree::ConfigTree;
//!
//! let tree = ConfigTree::from_xml(schema.clone(), reply_xml)?;
//! let up = tree.query("count(/if:interfaces/if:interface[enabled-v2='true'])")?.count();
//! ```

mod build;
mod equality;
mod merge;
mod node;
mod query;
mod value;
pub mod xml;

use std::collections::HashSet;
use std::sync::Arc;

pub(crate) use build::{build_content, check_siblings, leaf_value};
pub(crate) use equality::Comparison;
pub(crate) use merge::{SiblingMap, append_position, sibling_map};
pub use node::{DataNode, EntryIdentity, NodeIdentity};
pub(crate) use node::display_segment;
pub use query::{Matches, Query, QueryResult};
pub use value::LeafValue;
pub use xml::Element;

use crate::error::{DeltaError, ErrorContext, Result};
use crate::schema::{NodeKind, SchemaModel};

/// One configuration snapshot resolved against a schema.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    schema: Arc<SchemaModel>,
    roots: Vec<DataNode>,
}

impl ConfigTree {
    /// A tree with no nodes.
    #[must_use]
    pub const fn empty(schema: Arc<SchemaModel>) -> Self {
        Self {
            schema,
            roots: Vec::new(),
        }
    }

    /// Build a tree from the children of `root`.
    ///
    /// `root` is an envelope (such as `<config>` or `<data>`) whose children
    /// are the top-level config nodes; its own name is not checked. Every
    /// element must resolve to a schema node, list entries must carry all
    /// their keys, sibling identities must be unique and at most one case of
    /// each choice may be present.
    pub fn from_nodes(schema: Arc<SchemaModel>, root: &Element) -> Result<Self> {
        let roots = build::build_children(&schema, None, &root.children, "")?;
        tracing::debug!(roots = roots.len(), "built config tree");
        Ok(Self { schema, roots })
    }

    /// Decode an XML document and build a tree from its config payload.
    ///
    /// See [`xml::config_payload`] for the accepted envelopes.
    pub fn from_xml(schema: Arc<SchemaModel>, document: &str) -> Result<Self> {
        let root = xml::parse_document(document)?;
        let payload = xml::config_payload(root)?;
        Self::from_nodes(schema, &payload).context("building config tree")
    }

    pub(crate) const fn from_roots(schema: Arc<SchemaModel>, roots: Vec<DataNode>) -> Self {
        Self { schema, roots }
    }

    #[must_use]
    pub const fn schema(&self) -> &Arc<SchemaModel> {
        &self.schema
    }

    /// Top-level nodes in storage order.
    #[must_use]
    pub fn roots(&self) -> &[DataNode] {
        &self.roots
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(DataNode::subtree_len).sum()
    }

    pub(crate) fn shares_schema(&self, schema: &Arc<SchemaModel>) -> bool {
        Arc::ptr_eq(&self.schema, schema)
    }

    fn check_same_schema(&self, other: &Self) -> Result<()> {
        if other.shares_schema(&self.schema) {
            Ok(())
        } else {
            Err(DeltaError::schema_mismatch(
                "/",
                "trees were built against different schema models",
            ))
        }
    }

    /// Render as a NETCONF `<config>` document.
    pub fn to_xml(&self, pretty: bool) -> Result<String> {
        let mut out = xml::XmlOut::new(pretty);
        let attrs = [("xmlns".to_string(), xml::NETCONF_NS.to_string())];
        if self.roots.is_empty() {
            out.empty("config", &attrs)?;
            return out.finish();
        }
        out.start("config", &attrs)?;
        for node in &self.roots {
            xml::write_node(&mut out, &self.schema, node, xml::NETCONF_NS, Vec::new())?;
        }
        out.end("config")?;
        out.finish()
    }

    /// Right-biased merge: `other`'s leaves win, containers and list entries
    /// are merged by identity.
    pub fn merge(&self, other: &Self) -> Result<Self> {
        self.check_same_schema(other)?;
        let roots = merge::merge_children(&self.schema, &self.roots, &other.roots);
        Ok(Self::from_roots(Arc::clone(&self.schema), roots))
    }

    /// Structural equality.
    ///
    /// Children are matched by identity; order matters only within
    /// user-ordered collections; a leaf holding its default equals absence.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && Comparison::new(&self.schema).nodes_equal(&self.roots, &other.roots)
    }

    /// Whether every node of this tree is present in `other` with the same value.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && Comparison::new(&self.schema).is_subset(&self.roots, &other.roots)
    }

    /// Run a path query. See [`Query`] for the syntax.
    pub fn query(&self, expression: &str) -> Result<QueryResult<'_>> {
        let query = Query::parse(&self.schema, expression)?;
        Ok(query.evaluate(&self.roots))
    }

    /// Evaluate an already parsed query.
    #[must_use]
    pub fn evaluate(&self, query: &Query) -> QueryResult<'_> {
        query.evaluate(&self.roots)
    }

    /// A new tree with only the nodes selected by `expression`, their
    /// ancestors, and the key leaves of ancestor list entries.
    pub fn filter(&self, expression: &str) -> Result<Self> {
        let query = Query::parse(&self.schema, expression)?;
        if query.is_count() {
            return Err(DeltaError::query(expression, "filter needs a node-set, not count()"));
        }
        let hits: HashSet<*const DataNode> = query
            .evaluate(&self.roots)
            .into_nodes()
            .into_iter()
            .map(std::ptr::from_ref)
            .collect();
        let roots = filter_nodes(&self.schema, &self.roots, &hits);
        Ok(Self::from_roots(Arc::clone(&self.schema), roots))
    }
}

impl PartialEq for ConfigTree {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

fn filter_nodes(
    schema: &SchemaModel,
    nodes: &[DataNode],
    hits: &HashSet<*const DataNode>,
) -> Vec<DataNode> {
    nodes
        .iter()
        .filter_map(|node| {
            if hits.contains(&std::ptr::from_ref(node)) {
                return Some(node.clone());
            }
            let snode = schema.node(node.schema);
            let kept = filter_nodes(schema, &node.children, hits);
            if kept.is_empty() {
                return None;
            }
            let children = if snode.kind() == NodeKind::List {
                let mut with_keys: Vec<DataNode> = node
                    .children
                    .iter()
                    .filter(|c| snode.is_key(c.schema) && !kept.iter().any(|k| k.schema == c.schema))
                    .cloned()
                    .collect();
                with_keys.extend(kept);
                with_keys
            } else {
                kept
            };
            Some(DataNode {
                qname: node.qname.clone(),
                schema: node.schema,
                entry: node.entry.clone(),
                value: node.value.clone(),
                children,
            })
        })
        .collect()
}
