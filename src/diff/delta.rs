//! Delta representation.

use std::fmt;
use std::sync::Arc;

use crate::schema::{QName, SchemaId, SchemaModel};
use crate::tree::{DataNode, EntryIdentity, LeafValue, display_segment};

/// Where a user-ordered entry goes relative to its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Before every other entry of the same collection.
    First,
    /// Directly after the entry with this identity.
    After(EntryIdentity),
}

/// What happens to one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// The subtree is added.
    Create(DataNode),
    /// The subtree is removed. The removed content is kept so the operation
    /// can be turned around.
    Delete(DataNode),
    /// A leaf changes value.
    ReplaceLeaf { from: LeafValue, to: LeafValue },
    /// Something below this node changes.
    Merge,
    /// Only the position of this entry changes.
    Reorder,
}

impl Operation {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Delete(_) => "delete",
            Self::ReplaceLeaf { .. } => "replace",
            Self::Merge => "merge",
            Self::Reorder => "reorder",
        }
    }
}

/// Full target sequence of a collection touched by positional operations.
///
/// Transports without a move primitive rewrite the whole collection from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSnapshot {
    pub(crate) schema: SchemaId,
    pub(crate) entries: Vec<DataNode>,
}

impl CollectionSnapshot {
    #[must_use]
    pub const fn schema_id(&self) -> SchemaId {
        self.schema
    }

    #[must_use]
    pub fn entries(&self) -> &[DataNode] {
        &self.entries
    }
}

/// One node of a delta tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaNode {
    pub(crate) qname: QName,
    pub(crate) schema: SchemaId,
    pub(crate) entry: EntryIdentity,
    pub(crate) op: Operation,
    pub(crate) anchor: Option<Anchor>,
    pub(crate) children: Vec<DeltaNode>,
    pub(crate) snapshots: Vec<CollectionSnapshot>,
}

impl DeltaNode {
    pub(crate) fn new(node: &DataNode, op: Operation) -> Self {
        Self {
            qname: node.qname().clone(),
            schema: node.schema_id(),
            entry: node.entry().clone(),
            op,
            anchor: None,
            children: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    #[must_use]
    pub const fn qname(&self) -> &QName {
        &self.qname
    }

    #[must_use]
    pub const fn schema_id(&self) -> SchemaId {
        self.schema
    }

    #[must_use]
    pub const fn entry(&self) -> &EntryIdentity {
        &self.entry
    }

    #[must_use]
    pub const fn operation(&self) -> &Operation {
        &self.op
    }

    /// New position of a user-ordered entry, if it has one.
    #[must_use]
    pub const fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }

    /// Whether an existing entry changes position.
    #[must_use]
    pub const fn is_move(&self) -> bool {
        self.anchor.is_some() && !matches!(self.op, Operation::Create(_))
    }

    #[must_use]
    pub fn children(&self) -> &[DeltaNode] {
        &self.children
    }

    #[must_use]
    pub fn snapshots(&self) -> &[CollectionSnapshot] {
        &self.snapshots
    }

    /// Snapshot of the child collection `id`, if one was taken.
    #[must_use]
    pub fn snapshot(&self, id: SchemaId) -> Option<&CollectionSnapshot> {
        self.snapshots.iter().find(|s| s.schema == id)
    }
}

/// One direction of a delta.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaTree {
    pub(crate) roots: Vec<DeltaNode>,
    pub(crate) snapshots: Vec<CollectionSnapshot>,
}

impl DeltaTree {
    #[must_use]
    pub fn roots(&self) -> &[DeltaNode] {
        &self.roots
    }

    /// Snapshots of top-level collections.
    #[must_use]
    pub fn snapshots(&self) -> &[CollectionSnapshot] {
        &self.snapshots
    }

    #[must_use]
    pub fn snapshot(&self, id: SchemaId) -> Option<&CollectionSnapshot> {
        self.snapshots.iter().find(|s| s.schema == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    fn summary(&self) -> DeltaSummary {
        let mut summary = DeltaSummary::default();
        let mut stack: Vec<&DeltaNode> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            match node.op {
                Operation::Create(_) => summary.creates += 1,
                Operation::Delete(_) => summary.deletes += 1,
                Operation::ReplaceLeaf { .. } => summary.replaces += 1,
                Operation::Merge => summary.merges += 1,
                Operation::Reorder => {}
            }
            if node.is_move() {
                summary.reorders += 1;
            }
            stack.extend(&node.children);
        }
        summary
    }
}

/// Operation counts of one direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaSummary {
    pub creates: usize,
    pub deletes: usize,
    pub replaces: usize,
    pub merges: usize,
    pub reorders: usize,
}

impl DeltaSummary {
    /// Operations other than merges, which only carry their children.
    #[must_use]
    pub const fn changes(&self) -> usize {
        self.creates + self.deletes + self.replaces + self.reorders
    }
}

/// A transition between two config trees, stored with its inverse.
///
/// Computed by [`DeltaEngine::diff`](super::DeltaEngine::diff). Negation
/// swaps the two directions and never recomputes anything.
#[derive(Debug, Clone)]
pub struct Delta {
    pub(crate) schema: Arc<SchemaModel>,
    pub(crate) forward: DeltaTree,
    pub(crate) inverse: DeltaTree,
}

impl Delta {
    #[must_use]
    pub const fn schema(&self) -> &Arc<SchemaModel> {
        &self.schema
    }

    /// Operations turning the source tree into the target tree.
    #[must_use]
    pub const fn forward(&self) -> &DeltaTree {
        &self.forward
    }

    /// Operations turning the target tree back into the source tree.
    #[must_use]
    pub const fn inverse(&self) -> &DeltaTree {
        &self.inverse
    }

    /// The opposite transition.
    #[must_use]
    pub fn negate(&self) -> Self {
        self.clone().into_negated()
    }

    #[must_use]
    pub fn into_negated(self) -> Self {
        Self {
            schema: self.schema,
            forward: self.inverse,
            inverse: self.forward,
        }
    }

    /// Whether the delta contains no operation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.inverse.is_empty()
    }

    /// Operation counts of the forward direction.
    #[must_use]
    pub fn summary(&self) -> DeltaSummary {
        self.forward.summary()
    }
}

impl PartialEq for Delta {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self.forward == other.forward
            && self.inverse == other.inverse
    }
}

/// One line per operation of the forward direction:
///
/// ```text
/// + /if:interfaces/if:interface[name='eth2']
/// - /geo:region/geo:ontario
/// ~ /if:interfaces/if:interface[name='eth0']/if:mtu 1500 -> 9000
/// > /rt:routing/rt:route[prefix='10.0.0.0/8'] after [prefix='0.0.0.0/0']
/// ```
impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.forward.roots {
            write_lines(f, &self.schema, node, "")?;
        }
        Ok(())
    }
}

fn write_lines(
    f: &mut fmt::Formatter<'_>,
    schema: &SchemaModel,
    node: &DeltaNode,
    parent: &str,
) -> fmt::Result {
    let path = format!(
        "{parent}/{}",
        display_segment(schema, &node.qname, node.schema, &node.entry)
    );
    match &node.op {
        Operation::Create(_) => writeln!(f, "+ {path}")?,
        Operation::Delete(_) => writeln!(f, "- {path}")?,
        Operation::ReplaceLeaf { from, to } => writeln!(f, "~ {path} {from} -> {to}")?,
        Operation::Merge | Operation::Reorder => {}
    }
    if node.is_move() {
        match &node.anchor {
            Some(Anchor::After(prev)) => {
                let keys = schema.node(node.schema).key_leaves();
                writeln!(f, "> {path} after {}", prev.predicate(keys))?;
            }
            _ => writeln!(f, "> {path} first")?,
        }
    }
    for child in &node.children {
        write_lines(f, schema, child, &path)?;
    }
    Ok(())
}
