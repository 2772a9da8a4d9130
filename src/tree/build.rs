//! Schema-guided construction of data nodes from XML elements.

use std::collections::{HashMap, HashSet};

use super::node::{DataNode, EntryIdentity, NodeIdentity, display_segment};
use super::value::LeafValue;
use super::xml::{Element, NETCONF_NS, YANG_NS};
use crate::error::{DeltaError, Result};
use crate::schema::{LeafType, NodeKind, QName, SchemaId, SchemaModel};

/// Attributes that mark an element as part of an edit, not a snapshot.
const EDIT_ATTRIBUTES: &[(&str, &str)] = &[
    (NETCONF_NS, "operation"),
    (YANG_NS, "insert"),
    (YANG_NS, "key"),
    (YANG_NS, "value"),
];

fn is_edit_attribute(name: &QName) -> bool {
    EDIT_ATTRIBUTES.contains(&(name.namespace.as_str(), name.name.as_str()))
}

/// Copy of `element` with every edit attribute in its subtree dropped.
fn without_edit_attributes(element: &Element) -> Element {
    Element {
        qname: element.qname.clone(),
        attributes: element
            .attributes
            .iter()
            .filter(|(name, _)| !is_edit_attribute(name))
            .cloned()
            .collect(),
        text: element.text.clone(),
        text_namespace: element.text_namespace.clone(),
        children: element.children.iter().map(without_edit_attributes).collect(),
    }
}

/// Build the content of a `create` or `replace` edit.
///
/// Operations nested below the edited node are ignored; the subtree is
/// taken as plain config.
pub(crate) fn build_content(
    schema: &SchemaModel,
    parent: Option<SchemaId>,
    element: &Element,
    parent_path: &str,
) -> Result<DataNode> {
    build_node(schema, parent, &without_edit_attributes(element), parent_path)
}

/// Build the children of `parent` from `elements`, validating them as siblings.
pub(crate) fn build_children(
    schema: &SchemaModel,
    parent: Option<SchemaId>,
    elements: &[Element],
    parent_path: &str,
) -> Result<Vec<DataNode>> {
    let nodes = elements
        .iter()
        .map(|e| build_node(schema, parent, e, parent_path))
        .collect::<Result<Vec<_>>>()?;
    check_siblings(schema, &nodes, parent_path)?;
    Ok(nodes)
}

fn build_node(
    schema: &SchemaModel,
    parent: Option<SchemaId>,
    element: &Element,
    parent_path: &str,
) -> Result<DataNode> {
    let id = schema.data_child(parent, &element.qname).ok_or_else(|| {
        DeltaError::schema_mismatch(
            format!("{parent_path}/{}", element.qname),
            "element does not resolve to any schema node",
        )
    })?;
    let snode = schema.node(id);
    let path = format!("{parent_path}/{}", schema.prefixed(&element.qname));

    if let Some((attr, _)) = element.attributes.iter().find(|(q, _)| is_edit_attribute(q)) {
        return Err(DeltaError::schema_mismatch(
            path,
            format!("edit attribute '{}' is not allowed in a config", attr.name),
        ));
    }

    match snode.kind() {
        NodeKind::Leaf | NodeKind::LeafList => {
            if !element.children.is_empty() {
                return Err(DeltaError::schema_mismatch(
                    path,
                    format!("{} cannot have child elements", snode.kind()),
                ));
            }
            let ty = snode.leaf_type().unwrap_or(LeafType::String);
            let value = leaf_value(schema, element, ty, &path)?;
            let entry = if snode.kind() == NodeKind::LeafList {
                EntryIdentity::Value(value.clone())
            } else {
                EntryIdentity::Single
            };
            Ok(DataNode {
                qname: element.qname.clone(),
                schema: id,
                entry,
                value: Some(value),
                children: Vec::new(),
            })
        }
        NodeKind::Container => Ok(DataNode {
            qname: element.qname.clone(),
            schema: id,
            entry: EntryIdentity::Single,
            value: None,
            children: build_children(schema, Some(id), &element.children, &path)?,
        }),
        NodeKind::List => {
            let children = build_children(schema, Some(id), &element.children, &path)?;
            let entry = list_entry_key(schema, id, &children, &path)?;
            Ok(DataNode {
                qname: element.qname.clone(),
                schema: id,
                entry,
                value: None,
                children,
            })
        }
        NodeKind::Choice | NodeKind::Case => Err(DeltaError::schema_mismatch(
            path,
            "choice and case nodes have no instances",
        )),
    }
}

/// Typed value of a leaf element; identity references are resolved through
/// the namespace bound to their prefix.
pub(crate) fn leaf_value(schema: &SchemaModel, element: &Element, ty: LeafType, path: &str) -> Result<LeafValue> {
    if ty == LeafType::Identityref
        && let Some(ns) = &element.text_namespace
        && let Some((_, identity)) = element.text.trim().split_once(':')
    {
        let module = schema.module_by_namespace(ns).ok_or_else(|| DeltaError::InvalidValue {
            path: path.to_string(),
            value: element.text.clone(),
            expected: "identity of a known module".to_string(),
        })?;
        return Ok(LeafValue::Enumeration(format!("{}:{identity}", module.name)));
    }
    LeafValue::parse(&element.text, ty, path)
}

/// Key tuple of a list entry, taken from its key leaf children.
pub(crate) fn list_entry_key(
    schema: &SchemaModel,
    list: SchemaId,
    children: &[DataNode],
    path: &str,
) -> Result<EntryIdentity> {
    let snode = schema.node(list);
    let mut values = Vec::with_capacity(snode.key_ids().len());
    let mut missing = Vec::new();
    for (key_id, key_name) in snode.key_ids().iter().zip(snode.key_leaves()) {
        match children
            .iter()
            .find(|c| c.schema == *key_id)
            .and_then(DataNode::value)
        {
            Some(value) => values.push(value.clone()),
            None => missing.push(key_name.clone()),
        }
    }
    if missing.is_empty() {
        Ok(EntryIdentity::Key(values))
    } else {
        Err(DeltaError::KeyViolation {
            path: path.to_string(),
            missing,
        })
    }
}

/// Reject duplicate identities and simultaneously active cases among siblings.
pub(crate) fn check_siblings(schema: &SchemaModel, nodes: &[DataNode], parent_path: &str) -> Result<()> {
    let mut seen: HashSet<NodeIdentity> = HashSet::with_capacity(nodes.len());
    let mut active: HashMap<SchemaId, SchemaId> = HashMap::new();

    for node in nodes {
        if !seen.insert(node.identity()) {
            return Err(DeltaError::DuplicateEntry {
                path: format!(
                    "{parent_path}/{}",
                    display_segment(schema, &node.qname, node.schema, &node.entry)
                ),
            });
        }
        for (choice, case) in schema.node(node.schema).choices() {
            match active.get(choice) {
                Some(existing) if existing != case => {
                    return Err(DeltaError::ChoiceConflict {
                        path: parent_path.to_string(),
                        choice: schema.node(*choice).name().to_string(),
                        cases: vec![
                            schema.node(*existing).name().to_string(),
                            schema.node(*case).name().to_string(),
                        ],
                    });
                }
                Some(_) => {}
                None => {
                    active.insert(*choice, *case);
                }
            }
        }
    }
    Ok(())
}
