//! Applying NETCONF edit-config documents.
//!
//! An edit is a partial config whose elements may carry `nc:operation`
//! (merge, replace, create, delete, remove; merge when absent) and, on
//! entries of user-ordered collections, `yang:insert` with `yang:key` or
//! `yang:value`. Nodes created in one case of a choice displace the nodes of
//! the other cases.

use std::collections::{HashMap, HashSet};

use super::apply::{anchor_index, first_position};
use crate::error::{DeltaError, OptionContext, Result};
use crate::schema::{LeafType, NodeKind, SchemaId, SchemaModel};
use crate::tree::xml::{Element, NETCONF_NS, YANG_NS};
use crate::tree::{
    DataNode, EntryIdentity, LeafValue, SiblingMap, append_position, build_content, check_siblings,
    display_segment, leaf_value, sibling_map,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditOperation {
    Merge,
    Replace,
    Create,
    Delete,
    Remove,
}

impl EditOperation {
    fn parse(text: &str, path: &str) -> Result<Self> {
        match text {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            "remove" => Ok(Self::Remove),
            other => Err(DeltaError::schema_mismatch(
                path,
                format!("unknown edit operation '{other}'"),
            )),
        }
    }
}

/// Target position requested by `yang:insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Insert {
    First,
    Last,
    Before(EntryIdentity),
    After(EntryIdentity),
}

fn attribute<'e>(element: &'e Element, namespace: &str, name: &str) -> Option<&'e str> {
    element
        .attributes
        .iter()
        .find(|(q, _)| q.namespace == namespace && q.name == name)
        .map(|(_, v)| v.as_str())
}

/// Apply the edit whose top-level nodes are the children of `config`.
pub(crate) fn apply_edit(schema: &SchemaModel, roots: &[DataNode], config: &Element) -> Result<Vec<DataNode>> {
    edit_children(schema, None, roots, &config.children, "")
}

fn edit_children(
    schema: &SchemaModel,
    parent: Option<SchemaId>,
    nodes: &[DataNode],
    elements: &[Element],
    parent_path: &str,
) -> Result<Vec<DataNode>> {
    let mut siblings = sibling_map(nodes);
    let mut touched: HashSet<(SchemaId, EntryIdentity)> = HashSet::new();
    let mut selected: HashMap<SchemaId, SchemaId> = HashMap::new();

    for element in elements {
        let id = schema.data_child(parent, &element.qname).ok_or_else(|| {
            DeltaError::schema_mismatch(
                format!("{parent_path}/{}", element.qname),
                "element does not resolve to any schema node",
            )
        })?;
        let snode = schema.node(id);
        let entry = element_identity(
            schema,
            id,
            element,
            &format!("{parent_path}/{}", schema.prefixed(&element.qname)),
        )?;
        let path = format!(
            "{parent_path}/{}",
            display_segment(schema, &element.qname, id, &entry)
        );
        let operation = match attribute(element, NETCONF_NS, "operation") {
            Some(text) => EditOperation::parse(text, &path)?,
            None => EditOperation::Merge,
        };
        let insert = insert_position(schema, id, element, &path)?;
        let key = (id, entry);

        match operation {
            EditOperation::Delete => {
                siblings
                    .shift_remove(&key)
                    .or_mismatch(&path, "node to delete does not exist")?;
                continue;
            }
            EditOperation::Remove => {
                siblings.shift_remove(&key);
                continue;
            }
            EditOperation::Create if siblings.contains_key(&key) => {
                return Err(DeltaError::delta_mismatch(path, "node to create already exists"));
            }
            EditOperation::Create | EditOperation::Replace => {
                let node = build_content(schema, parent, element, parent_path)?;
                if let Some(existing) = siblings.get_mut(&key) {
                    *existing = node;
                    if let Some(insert) = &insert {
                        move_entry(&mut siblings, &key, insert, &path)?;
                    }
                } else {
                    place(&mut siblings, key.clone(), node, insert.as_ref(), &path)?;
                }
            }
            EditOperation::Merge => {
                if let Some(existing) = siblings.get_mut(&key) {
                    merge_into(schema, existing, element, &path)?;
                    if let Some(insert) = &insert {
                        move_entry(&mut siblings, &key, insert, &path)?;
                    }
                } else {
                    let node = merged_node(schema, parent, id, &key.1, element, parent_path, &path)?;
                    place(&mut siblings, key.clone(), node, insert.as_ref(), &path)?;
                }
            }
        }

        selected.extend(snode.choices().iter().copied());
        touched.insert(key);
    }

    // Untouched nodes of a case other than the one this edit selects go away.
    siblings.retain(|key, _| {
        touched.contains(key)
            || !schema
                .node(key.0)
                .choices()
                .iter()
                .any(|(choice, case)| selected.get(choice).is_some_and(|sel| sel != case))
    });

    let nodes: Vec<DataNode> = siblings.into_values().collect();
    check_siblings(schema, &nodes, parent_path)?;
    Ok(nodes)
}

/// Merge `element` into a node that already exists.
fn merge_into(schema: &SchemaModel, existing: &mut DataNode, element: &Element, path: &str) -> Result<()> {
    let snode = schema.node(existing.schema);
    match snode.kind() {
        NodeKind::Leaf => {
            let ty = snode.leaf_type().unwrap_or(LeafType::String);
            existing.value = Some(leaf_value(schema, element, ty, path)?);
        }
        NodeKind::LeafList => {}
        _ => {
            existing.children =
                edit_children(schema, Some(existing.schema), &existing.children, &element.children, path)?;
        }
    }
    Ok(())
}

/// A node merged into a place where none exists yet.
fn merged_node(
    schema: &SchemaModel,
    parent: Option<SchemaId>,
    id: SchemaId,
    entry: &EntryIdentity,
    element: &Element,
    parent_path: &str,
    path: &str,
) -> Result<DataNode> {
    match schema.node(id).kind() {
        NodeKind::Container | NodeKind::List => Ok(DataNode {
            qname: element.qname.clone(),
            schema: id,
            entry: entry.clone(),
            value: None,
            children: edit_children(schema, Some(id), &[], &element.children, path)?,
        }),
        _ => build_content(schema, parent, element, parent_path),
    }
}

/// Identity of the node an element addresses.
fn element_identity(schema: &SchemaModel, id: SchemaId, element: &Element, path: &str) -> Result<EntryIdentity> {
    let snode = schema.node(id);
    match snode.kind() {
        NodeKind::LeafList => {
            let ty = snode.leaf_type().unwrap_or(LeafType::String);
            Ok(EntryIdentity::Value(leaf_value(schema, element, ty, path)?))
        }
        NodeKind::List => {
            let mut values = Vec::with_capacity(snode.key_ids().len());
            let mut missing = Vec::new();
            for (key_id, key_name) in snode.key_ids().iter().zip(snode.key_leaves()) {
                let child = element
                    .children
                    .iter()
                    .find(|c| schema.data_child(Some(id), &c.qname) == Some(*key_id));
                match child {
                    Some(child) => {
                        let ty = schema.node(*key_id).leaf_type().unwrap_or(LeafType::String);
                        values.push(leaf_value(schema, child, ty, path)?);
                    }
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
        _ => Ok(EntryIdentity::Single),
    }
}

/// `yang:insert` of an element; ignored outside user-ordered collections.
fn insert_position(schema: &SchemaModel, id: SchemaId, element: &Element, path: &str) -> Result<Option<Insert>> {
    let Some(insert) = attribute(element, YANG_NS, "insert") else {
        return Ok(None);
    };
    if !schema.node(id).is_user_ordered() {
        return Ok(None);
    }
    match insert {
        "first" => Ok(Some(Insert::First)),
        "last" => Ok(Some(Insert::Last)),
        "before" => Ok(Some(Insert::Before(insert_anchor(schema, id, element, path)?))),
        "after" => Ok(Some(Insert::After(insert_anchor(schema, id, element, path)?))),
        other => Err(DeltaError::schema_mismatch(
            path,
            format!("unknown insert position '{other}'"),
        )),
    }
}

/// Entry named by `yang:value` (leaf-lists) or `yang:key` (lists).
fn insert_anchor(schema: &SchemaModel, id: SchemaId, element: &Element, path: &str) -> Result<EntryIdentity> {
    let snode = schema.node(id);
    if snode.kind() == NodeKind::LeafList {
        let value = attribute(element, YANG_NS, "value").ok_or_else(|| {
            DeltaError::schema_mismatch(path, "insert before/after needs a yang:value attribute")
        })?;
        let ty = snode.leaf_type().unwrap_or(LeafType::String);
        return Ok(EntryIdentity::Value(LeafValue::parse(value, ty, path)?));
    }
    let predicate = attribute(element, YANG_NS, "key").ok_or_else(|| {
        DeltaError::schema_mismatch(path, "insert before/after needs a yang:key attribute")
    })?;
    key_predicate(schema, id, predicate, path)
}

/// Parse a `yang:key` value such as `[rt:name='edge'][rt:seq='10']`.
fn key_predicate(schema: &SchemaModel, list: SchemaId, predicate: &str, path: &str) -> Result<EntryIdentity> {
    let malformed = || DeltaError::schema_mismatch(path, format!("malformed yang:key '{predicate}'"));

    let mut values: HashMap<&str, &str> = HashMap::new();
    let mut rest = predicate.trim();
    while !rest.is_empty() {
        let body = rest.strip_prefix('[').ok_or_else(malformed)?;
        let (name, tail) = body.split_once('=').ok_or_else(malformed)?;
        let tail = tail.trim_start();
        let quote = tail
            .chars()
            .next()
            .filter(|c| matches!(c, '\'' | '"'))
            .ok_or_else(malformed)?;
        let (value, tail) = tail[1..].split_once(quote).ok_or_else(malformed)?;
        rest = tail
            .trim_start()
            .strip_prefix(']')
            .ok_or_else(malformed)?
            .trim_start();
        let name = name.trim();
        let local = name.rsplit_once(':').map_or(name, |(_, local)| local);
        values.insert(local, value);
    }

    let snode = schema.node(list);
    let mut key = Vec::with_capacity(snode.key_ids().len());
    let mut missing = Vec::new();
    for (key_id, key_name) in snode.key_ids().iter().zip(snode.key_leaves()) {
        match values.get(key_name.as_str()) {
            Some(text) => {
                let ty = schema.node(*key_id).leaf_type().unwrap_or(LeafType::String);
                key.push(LeafValue::parse(text, ty, path)?);
            }
            None => missing.push(key_name.clone()),
        }
    }
    if missing.is_empty() {
        Ok(EntryIdentity::Key(key))
    } else {
        Err(DeltaError::KeyViolation {
            path: path.to_string(),
            missing,
        })
    }
}

/// Index at which an entry of kind `id` goes; the entry itself is not in `siblings`.
fn target_index(siblings: &SiblingMap, id: SchemaId, insert: Option<&Insert>, path: &str) -> Result<usize> {
    match insert {
        None | Some(Insert::Last) => Ok(append_position(siblings, id)),
        Some(Insert::First) => {
            Ok(first_position(siblings, id).unwrap_or_else(|| append_position(siblings, id)))
        }
        Some(Insert::Before(anchor)) => anchor_index(siblings, id, anchor, path),
        Some(Insert::After(anchor)) => Ok(anchor_index(siblings, id, anchor, path)? + 1),
    }
}

fn place(
    siblings: &mut SiblingMap,
    key: (SchemaId, EntryIdentity),
    node: DataNode,
    insert: Option<&Insert>,
    path: &str,
) -> Result<()> {
    let idx = target_index(siblings, key.0, insert, path)?;
    siblings.shift_insert(idx, key, node);
    Ok(())
}

fn move_entry(siblings: &mut SiblingMap, key: &(SchemaId, EntryIdentity), insert: &Insert, path: &str) -> Result<()> {
    let (key, node) = siblings
        .shift_remove_entry(key)
        .or_mismatch(path, "entry to move does not exist")?;
    place(siblings, key, node, Some(insert), path)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EncodingConfig;
    use crate::diff::DeltaEngine;
    use crate::encode::encode_edit_config;
    use crate::schema::test_support::example_schema;
    use crate::tree::ConfigTree;

    fn tree(schema: &Arc<SchemaModel>, xml: &str) -> ConfigTree {
        ConfigTree::from_xml(Arc::clone(schema), xml).unwrap()
    }

    fn edit(body: &str) -> String {
        format!(
            r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"
                       xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0"
                       xmlns:yang="urn:ietf:params:xml:ns:yang:1">{body}</config>"#
        )
    }

    fn routes(schema: &Arc<SchemaModel>, prefixes: &[&str]) -> ConfigTree {
        let body: String = prefixes
            .iter()
            .map(|p| format!("<route><prefix>{p}</prefix><next-hop>h</next-hop></route>"))
            .collect();
        tree(schema, &format!(r#"<routing xmlns="urn:example:routing">{body}</routing>"#))
    }

    #[test]
    fn test_encoded_delta_reads_back() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = tree(
            &schema,
            r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
                 <interfaces xmlns="urn:example:interfaces">
                   <interface><name>eth0</name><mtu>9000</mtu><address>10.0.0.1</address></interface>
                   <dns-server>a</dns-server><dns-server>b</dns-server><dns-server>c</dns-server>
                 </interfaces>
                 <routing xmlns="urn:example:routing">
                   <acl><name>edge</name><seq>10</seq><action>permit</action></acl>
                   <acl><name>edge</name><seq>20</seq><action>deny</action></acl>
                   <static-label>7</static-label>
                 </routing>
                 <region xmlns="urn:example:geo"><ontario><toronto>yyz</toronto></ontario></region>
               </config>"#,
        );
        let after = tree(
            &schema,
            r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
                 <interfaces xmlns="urn:example:interfaces">
                   <interface><name>eth0</name><dhcp-client/></interface>
                   <interface><name>eth1</name><enabled-v2>true</enabled-v2></interface>
                   <dns-server>c</dns-server><dns-server>d</dns-server><dns-server>a</dns-server>
                 </interfaces>
                 <routing xmlns="urn:example:routing">
                   <acl><name>edge</name><seq>20</seq><action>permit</action></acl>
                   <acl><name>edge</name><seq>10</seq><action>permit</action></acl>
                 </routing>
                 <region xmlns="urn:example:geo"><alberta><calgary>yyc</calgary></alberta></region>
               </config>"#,
        );
        let delta = engine.diff(&before, &after).unwrap();
        let xml = encode_edit_config(&delta, &EncodingConfig::default()).unwrap();

        let edited = engine.apply_edit_config(&before, &xml).unwrap();
        assert!(edited.equals(&after), "{xml}");

        let rollback = encode_edit_config(&delta.negate(), &EncodingConfig::default()).unwrap();
        assert!(engine.apply_edit_config(&after, &rollback).unwrap().equals(&before));
    }

    #[test]
    fn test_default_operation_is_merge() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces"><interface><name>eth0</name><mtu>9000</mtu></interface></interfaces>"#,
        );
        let edited = engine
            .apply_edit_config(
                &before,
                &edit(
                    r#"<interfaces xmlns="urn:example:interfaces">
                         <interface><name>eth0</name><description>uplink</description></interface>
                         <interface><name>eth1</name></interface>
                       </interfaces>"#,
                ),
            )
            .unwrap();
        let expected = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces">
                 <interface><name>eth0</name><mtu>9000</mtu><description>uplink</description></interface>
                 <interface><name>eth1</name></interface>
               </interfaces>"#,
        );
        assert!(edited.equals(&expected));
    }

    #[test]
    fn test_replace_and_remove() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces">
                 <interface><name>eth0</name><mtu>9000</mtu><description>x</description></interface>
               </interfaces>"#,
        );
        let edited = engine
            .apply_edit_config(
                &before,
                &edit(
                    r#"<interfaces xmlns="urn:example:interfaces">
                         <interface nc:operation="replace"><name>eth0</name><mtu>1400</mtu></interface>
                         <dns-server nc:operation="remove">a</dns-server>
                       </interfaces>"#,
                ),
            )
            .unwrap();
        let expected = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces"><interface><name>eth0</name><mtu>1400</mtu></interface></interfaces>"#,
        );
        assert!(edited.equals(&expected));
    }

    #[test]
    fn test_insert_positions() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = routes(&schema, &["A", "B", "C"]);
        let edited = engine
            .apply_edit_config(
                &before,
                &edit(
                    r#"<routing xmlns="urn:example:routing" xmlns:rt="urn:example:routing">
                         <route yang:insert="before" yang:key="[rt:prefix='A']"><prefix>C</prefix></route>
                         <route yang:insert="first"><prefix>D</prefix><next-hop>h</next-hop></route>
                         <route yang:insert="last"><prefix>A</prefix></route>
                       </routing>"#,
                ),
            )
            .unwrap();
        assert!(edited.equals(&routes(&schema, &["D", "C", "B", "A"])));
    }

    #[test]
    fn test_failed_edits() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = routes(&schema, &["A"]);

        let missing = edit(
            r#"<routing xmlns="urn:example:routing"><route nc:operation="delete"><prefix>Z</prefix></route></routing>"#,
        );
        assert!(engine.apply_edit_config(&before, &missing).unwrap_err().is_delta_mismatch());

        let exists = edit(
            r#"<routing xmlns="urn:example:routing"><route nc:operation="create"><prefix>A</prefix></route></routing>"#,
        );
        assert!(engine.apply_edit_config(&before, &exists).unwrap_err().is_delta_mismatch());

        let bad_anchor = edit(
            r#"<routing xmlns="urn:example:routing"><route yang:insert="after" yang:key="[prefix='Q']"><prefix>B</prefix></route></routing>"#,
        );
        assert!(engine.apply_edit_config(&before, &bad_anchor).unwrap_err().is_delta_mismatch());

        let unknown = edit(
            r#"<routing xmlns="urn:example:routing"><route nc:operation="frobnicate"><prefix>A</prefix></route></routing>"#,
        );
        assert!(matches!(
            engine.apply_edit_config(&before, &unknown).unwrap_err(),
            DeltaError::SchemaMismatch { .. }
        ));

        let keyless = edit(r#"<routing xmlns="urn:example:routing"><route><next-hop>h</next-hop></route></routing>"#);
        assert!(matches!(
            engine.apply_edit_config(&before, &keyless).unwrap_err(),
            DeltaError::KeyViolation { .. }
        ));
    }

    #[test]
    fn test_key_predicate_parsing() {
        let schema = example_schema();
        let acl = schema.find("/rt:routing/rt:acl").unwrap().id();
        let key = key_predicate(&schema, acl, r#" [rt:name="it's"] [seq='10'] "#, "/x").unwrap();
        assert_eq!(
            key,
            EntryIdentity::Key(vec![LeafValue::String("it's".into()), LeafValue::Integer(10)])
        );
        assert!(key_predicate(&schema, acl, "[name='a'", "/x").is_err());
        assert!(matches!(
            key_predicate(&schema, acl, "[name='a']", "/x").unwrap_err(),
            DeltaError::KeyViolation { .. }
        ));
    }

    #[test]
    fn test_edit_delta() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = routes(&schema, &["A", "B"]);
        let payload = crate::tree::xml::parse_document(&edit(
            r#"<routing xmlns="urn:example:routing"><route nc:operation="delete"><prefix>A</prefix></route></routing>"#,
        ))
        .unwrap();
        let delta = engine.edit_delta(&before, &payload).unwrap();
        assert_eq!(delta.summary().deletes, 1);
        assert!(engine.apply(&before, &delta).unwrap().equals(&routes(&schema, &["B"])));
    }
}
