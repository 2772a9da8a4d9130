//! Structural equality and containment of config trees.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::node::{DataNode, EntryIdentity};
use crate::schema::{NodeKind, SchemaId, SchemaModel};

/// How two sibling sets are compared.
///
/// Shared by equality checks and the delta engine so both agree on which
/// collections are order-significant and which leaves count as absent.
#[derive(Clone, Copy)]
pub(crate) struct Comparison<'a> {
    pub(crate) schema: &'a SchemaModel,
    pub(crate) unordered: Option<&'a HashSet<SchemaId>>,
    pub(crate) normalize_defaults: bool,
}

impl<'a> Comparison<'a> {
    pub(crate) const fn new(schema: &'a SchemaModel) -> Self {
        Self {
            schema,
            unordered: None,
            normalize_defaults: true,
        }
    }

    /// Whether sibling order is significant for entries of `id`.
    pub(crate) fn is_ordered(&self, id: SchemaId) -> bool {
        self.schema.node(id).is_user_ordered()
            && !self.unordered.is_some_and(|set| set.contains(&id))
    }

    /// Whether a leaf carries its schema default, making it equal to absence.
    pub(crate) fn is_default_leaf(&self, node: &DataNode) -> bool {
        if !self.normalize_defaults {
            return false;
        }
        let snode = self.schema.node(node.schema);
        snode.kind() == NodeKind::Leaf
            && snode.default_value().is_some()
            && snode.default_value() == node.value()
    }

    pub(crate) fn nodes_equal(&self, a: &[DataNode], b: &[DataNode]) -> bool {
        let index_a = index(a);
        let index_b = index(b);

        for x in a {
            match index_b.get(&(x.schema, &x.entry)) {
                Some(y) => {
                    if x.value != y.value || !self.nodes_equal(&x.children, &y.children) {
                        return false;
                    }
                }
                None if self.is_default_leaf(x) => {}
                None => return false,
            }
        }
        for y in b {
            if !index_a.contains_key(&(y.schema, &y.entry)) && !self.is_default_leaf(y) {
                return false;
            }
        }

        let ordered: BTreeSet<SchemaId> = a
            .iter()
            .map(|n| n.schema)
            .filter(|id| self.is_ordered(*id))
            .collect();
        ordered.into_iter().all(|id| {
            let seq_a = a.iter().filter(|n| n.schema == id).map(|n| &n.entry);
            let seq_b = b.iter().filter(|n| n.schema == id).map(|n| &n.entry);
            seq_a.eq(seq_b)
        })
    }

    /// Whether every node of `a` exists in `b` with the same value.
    pub(crate) fn is_subset(&self, a: &[DataNode], b: &[DataNode]) -> bool {
        let index_b = index(b);
        a.iter().all(|x| match index_b.get(&(x.schema, &x.entry)) {
            Some(y) => x.value == y.value && self.is_subset(&x.children, &y.children),
            None => self.is_default_leaf(x),
        })
    }
}

pub(crate) fn index(nodes: &[DataNode]) -> HashMap<(SchemaId, &EntryIdentity), &DataNode> {
    nodes.iter().map(|n| ((n.schema, &n.entry), n)).collect()
}
