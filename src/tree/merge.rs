//! Right-biased merge of config trees.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::node::{DataNode, EntryIdentity};
use crate::schema::{SchemaId, SchemaModel};

pub(crate) type SiblingMap = IndexMap<(SchemaId, EntryIdentity), DataNode>;

/// Index just past the last sibling of kind `id`, or the end when there is none.
pub(crate) fn append_position(map: &SiblingMap, id: SchemaId) -> usize {
    map.keys()
        .rposition(|(s, _)| *s == id)
        .map_or(map.len(), |idx| idx + 1)
}

pub(crate) fn sibling_map(nodes: &[DataNode]) -> SiblingMap {
    nodes
        .iter()
        .map(|n| ((n.schema, n.entry.clone()), n.clone()))
        .collect()
}

/// Merge `right` into `left`.
///
/// Leaves take the value from `right`; containers and list entries present
/// on both sides are merged recursively; nodes only in `right` are appended
/// after their last same-kind sibling. Nodes of `left` that belong to a case
/// other than the one `right` selects are dropped, so the result never holds
/// two cases of one choice.
pub(crate) fn merge_children(schema: &SchemaModel, left: &[DataNode], right: &[DataNode]) -> Vec<DataNode> {
    let selected: HashMap<SchemaId, SchemaId> = right
        .iter()
        .flat_map(|n| schema.node(n.schema).choices().iter().copied())
        .collect();
    let displaced = |node: &DataNode| {
        schema
            .node(node.schema)
            .choices()
            .iter()
            .any(|(choice, case)| selected.get(choice).is_some_and(|sel| sel != case))
    };

    let mut merged: SiblingMap = left
        .iter()
        .filter(|n| !displaced(n))
        .map(|n| ((n.schema, n.entry.clone()), n.clone()))
        .collect();

    for node in right {
        let key = (node.schema, node.entry.clone());
        if let Some(existing) = merged.get_mut(&key) {
            if node.value.is_some() {
                existing.value.clone_from(&node.value);
            } else {
                existing.children = merge_children(schema, &existing.children, &node.children);
            }
        } else {
            let idx = append_position(&merged, node.schema);
            merged.shift_insert(idx, key, node.clone());
        }
    }

    merged.into_values().collect()
}
