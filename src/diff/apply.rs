//! Applying one direction of a delta to a tree.

use super::delta::{Anchor, DeltaNode, DeltaTree, Operation};
use crate::error::{DeltaError, OptionContext, Result};
use crate::schema::{SchemaId, SchemaModel};
use crate::tree::{DataNode, EntryIdentity, SiblingMap, append_position, display_segment, sibling_map};

pub(crate) fn apply_tree(schema: &SchemaModel, roots: &[DataNode], ops: &DeltaTree) -> Result<Vec<DataNode>> {
    apply_children(schema, roots, &ops.roots, "")
}

fn apply_children(
    schema: &SchemaModel,
    nodes: &[DataNode],
    ops: &[DeltaNode],
    parent_path: &str,
) -> Result<Vec<DataNode>> {
    let mut siblings = sibling_map(nodes);

    for op in ops {
        let path = format!(
            "{parent_path}/{}",
            display_segment(schema, &op.qname, op.schema, &op.entry)
        );
        let key = (op.schema, op.entry.clone());

        match &op.op {
            Operation::Create(node) => {
                if siblings.contains_key(&key) {
                    return Err(DeltaError::delta_mismatch(path, "node to create already exists"));
                }
                let idx = match &op.anchor {
                    None => append_position(&siblings, op.schema),
                    Some(Anchor::First) => first_position(&siblings, op.schema)
                        .unwrap_or_else(|| append_position(&siblings, op.schema)),
                    Some(Anchor::After(prev)) => anchor_index(&siblings, op.schema, prev, &path)? + 1,
                };
                siblings.shift_insert(idx, key, node.clone());
            }
            Operation::Delete(_) => {
                if siblings.shift_remove(&key).is_none() {
                    return Err(DeltaError::delta_mismatch(path, "node to delete does not exist"));
                }
            }
            Operation::ReplaceLeaf { from, to } => {
                let leaf = siblings
                    .get_mut(&key)
                    .or_mismatch(&path, "leaf to replace does not exist")?;
                if leaf.value.as_ref() != Some(from) {
                    let found = leaf.value.as_ref().map_or_else(String::new, ToString::to_string);
                    return Err(DeltaError::delta_mismatch(
                        path,
                        format!("expected value '{from}', found '{found}'"),
                    ));
                }
                leaf.value = Some(to.clone());
            }
            Operation::Merge | Operation::Reorder => {
                let existing = siblings
                    .get_mut(&key)
                    .or_mismatch(&path, "node to update does not exist")?;
                if !op.children.is_empty() {
                    existing.children = apply_children(schema, &existing.children, &op.children, &path)?;
                }
                if let Some(anchor) = &op.anchor {
                    move_entry(&mut siblings, &key, anchor, &path)?;
                }
            }
        }
    }

    Ok(siblings.into_values().collect())
}

pub(super) fn first_position(siblings: &SiblingMap, id: SchemaId) -> Option<usize> {
    siblings.keys().position(|(s, _)| *s == id)
}

pub(super) fn anchor_index(siblings: &SiblingMap, id: SchemaId, prev: &EntryIdentity, path: &str) -> Result<usize> {
    siblings
        .get_index_of(&(id, prev.clone()))
        .or_mismatch(path, "anchor entry does not exist")
}

/// Move an existing entry to `anchor`.
fn move_entry(
    siblings: &mut SiblingMap,
    key: &(SchemaId, EntryIdentity),
    anchor: &Anchor,
    path: &str,
) -> Result<()> {
    let from = siblings
        .get_index_of(key)
        .or_mismatch(path, "entry to move does not exist")?;
    let to = match anchor {
        Anchor::First => first_position(siblings, key.0).unwrap_or(from),
        Anchor::After(prev) => {
            let at = anchor_index(siblings, key.0, prev, path)?;
            if from > at { at + 1 } else { at }
        }
    };
    if from != to {
        siblings.move_index(from, to);
    }
    Ok(())
}
