//! NETCONF edit-config document.
//!
//! Every delta node becomes an element with an explicit `nc:operation`.
//! Moves and anchored creates carry `yang:insert` plus `yang:key` (lists) or
//! `yang:value` (leaf-lists) naming the entry they follow.

use super::path::{key_pairs, value_text};
use crate::config::EncodingConfig;
use crate::diff::{Anchor, Delta, DeltaNode, Operation};
use crate::error::Result;
use crate::schema::{NodeKind, SchemaModel};
use crate::tree::xml::{NETCONF_NS, XmlOut, YANG_NS, leaf_text, write_node};
use crate::tree::{DataNode, EntryIdentity};

/// Render the forward direction of `delta` as a `<config>` element for
/// `<edit-config>`.
pub fn encode_edit_config(delta: &Delta, config: &EncodingConfig) -> Result<String> {
    let schema = delta.schema();
    let mut out = XmlOut::new(config.pretty_xml);
    let attrs = [
        ("xmlns".to_string(), NETCONF_NS.to_string()),
        ("xmlns:nc".to_string(), NETCONF_NS.to_string()),
        ("xmlns:yang".to_string(), YANG_NS.to_string()),
    ];

    let roots = delta.forward().roots();
    if roots.is_empty() {
        out.empty("config", &attrs)?;
        return out.finish();
    }
    out.start("config", &attrs)?;
    for node in roots {
        write_op(&mut out, schema, node, NETCONF_NS)?;
    }
    out.end("config")?;
    out.finish()
}

fn operation_attr(name: &str) -> (String, String) {
    ("nc:operation".to_string(), name.to_string())
}

/// `yang:insert` and its companion attribute for an anchored node.
fn insert_attrs(schema: &SchemaModel, node: &DeltaNode) -> Vec<(String, String)> {
    let Some(anchor) = node.anchor() else {
        return Vec::new();
    };
    let prev = match anchor {
        Anchor::First => return vec![("yang:insert".to_string(), "first".to_string())],
        Anchor::After(prev) => prev,
    };

    let mut attrs = vec![("yang:insert".to_string(), "after".to_string())];
    match prev {
        EntryIdentity::Value(value) => {
            attrs.push(("yang:value".to_string(), value_text(value)));
        }
        EntryIdentity::Key(_) => {
            let prefix = schema
                .module_by_namespace(&node.qname().namespace)
                .map_or("", |m| m.prefix.as_str());
            let predicate: String = key_pairs(schema, node.schema_id(), prev)
                .into_iter()
                .map(|(name, value)| {
                    let text = value_text(value);
                    let quote = if text.contains('\'') { '"' } else { '\'' };
                    format!("[{prefix}:{name}={quote}{text}{quote}]")
                })
                .collect();
            if !prefix.is_empty() {
                attrs.push((format!("xmlns:{prefix}"), node.qname().namespace.clone()));
            }
            attrs.push(("yang:key".to_string(), predicate));
        }
        EntryIdentity::Single => {}
    }
    attrs
}

/// Opening attributes of an element written by hand.
fn element_attrs(node: &DeltaNode, parent_ns: &str, extra: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut attrs = Vec::with_capacity(extra.len() + 1);
    if node.qname().namespace != parent_ns {
        attrs.push(("xmlns".to_string(), node.qname().namespace.clone()));
    }
    attrs.extend(extra);
    attrs
}

/// Key leaves of a list entry, or the value of a leaf-list entry.
fn write_identity(out: &mut XmlOut, schema: &SchemaModel, node: &DeltaNode, attrs: &[(String, String)]) -> Result<()> {
    let name = node.qname().name.as_str();
    match node.entry() {
        EntryIdentity::Value(value) => {
            let (text, decl) = leaf_text(schema, schema.node(node.schema_id()).leaf_type(), value);
            let mut attrs = attrs.to_vec();
            attrs.extend(decl);
            out.leaf(name, &attrs, &text)
        }
        EntryIdentity::Key(_) => {
            out.start(name, attrs)?;
            write_keys(out, schema, node)?;
            out.end(name)
        }
        EntryIdentity::Single => out.empty(name, attrs),
    }
}

fn write_keys(out: &mut XmlOut, schema: &SchemaModel, node: &DeltaNode) -> Result<()> {
    let snode = schema.node(node.schema_id());
    for ((name, value), id) in key_pairs(schema, node.schema_id(), node.entry())
        .into_iter()
        .zip(snode.key_ids())
    {
        let (text, decl) = leaf_text(schema, schema.node(*id).leaf_type(), value);
        let attrs: Vec<(String, String)> = decl.into_iter().collect();
        out.leaf(name, &attrs, &text)?;
    }
    Ok(())
}

fn write_op(out: &mut XmlOut, schema: &SchemaModel, node: &DeltaNode, parent_ns: &str) -> Result<()> {
    let name = node.qname().name.as_str();
    match node.operation() {
        Operation::Create(data) => {
            let mut attrs = vec![operation_attr("create")];
            attrs.extend(insert_attrs(schema, node));
            write_node(out, schema, data, parent_ns, attrs)
        }
        Operation::Delete(_) => {
            let attrs = element_attrs(node, parent_ns, vec![operation_attr("delete")]);
            write_identity(out, schema, node, &attrs)
        }
        Operation::ReplaceLeaf { to, .. } => {
            let leaf = DataNode {
                qname: node.qname().clone(),
                schema: node.schema_id(),
                entry: node.entry().clone(),
                value: Some(to.clone()),
                children: Vec::new(),
            };
            write_node(out, schema, &leaf, parent_ns, vec![operation_attr("replace")])
        }
        Operation::Reorder => {
            let mut extra = vec![operation_attr("merge")];
            extra.extend(insert_attrs(schema, node));
            let attrs = element_attrs(node, parent_ns, extra);
            write_identity(out, schema, node, &attrs)
        }
        Operation::Merge => {
            let mut extra = vec![operation_attr("merge")];
            extra.extend(insert_attrs(schema, node));
            let attrs = element_attrs(node, parent_ns, extra);
            out.start(name, &attrs)?;
            if schema.node(node.schema_id()).kind() == NodeKind::List {
                write_keys(out, schema, node)?;
            }
            for child in node.children() {
                write_op(out, schema, child, &node.qname().namespace)?;
            }
            out.end(name)
        }
    }
}
