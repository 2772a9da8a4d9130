//! gNMI-style set request with typed values.
//!
//! The transport has no move primitive. A collection whose order changes is
//! sent as one full-value replace built from the target snapshot kept in the
//! delta, and the degradation is recorded as a [`Fallback`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::json::{collection_value, node_value};
use super::path::{key_pairs, member_name, value_text};
use crate::config::EncodingConfig;
use crate::diff::{CollectionSnapshot, Delta, DeltaNode, Operation};
use crate::error::{DeltaError, EncodeErrorKind, Result};
use crate::schema::{LeafType, NodeKind, QName, SchemaId, SchemaModel};
use crate::tree::{EntryIdentity, LeafValue};

/// One element of a structured path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathElem {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub key: BTreeMap<String, String>,
}

impl PathElem {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: BTreeMap::new(),
        }
    }
}

/// Structured path, rendered as `/a/b[k=v]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GnmiPath {
    pub elem: Vec<PathElem>,
}

impl GnmiPath {
    fn child(&self, elem: PathElem) -> Self {
        let mut path = self.clone();
        path.elem.push(elem);
        path
    }
}

impl fmt::Display for GnmiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elem.is_empty() {
            return f.write_str("/");
        }
        for elem in &self.elem {
            write!(f, "/{}", elem.name)?;
            for (k, v) in &elem.key {
                write!(f, "[{k}={v}]")?;
            }
        }
        Ok(())
    }
}

/// Typed value of an update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypedValue {
    #[serde(rename = "json_ietf_val")]
    JsonIetf(Value),
    #[serde(rename = "string_val")]
    String(String),
    #[serde(rename = "int_val")]
    Int(i64),
    #[serde(rename = "uint_val")]
    Uint(u64),
    #[serde(rename = "bool_val")]
    Bool(bool),
}

impl TypedValue {
    fn scalar(value: &LeafValue, ty: Option<LeafType>) -> Self {
        match value {
            LeafValue::Integer(n) => {
                if let Ok(v) = i64::try_from(*n) {
                    Self::Int(v)
                } else if let Ok(v) = u64::try_from(*n) {
                    Self::Uint(v)
                } else {
                    Self::String(n.to_string())
                }
            }
            LeafValue::Boolean(b) => Self::Bool(*b),
            LeafValue::Empty => Self::JsonIetf(super::json::leaf_value(ty, value)),
            LeafValue::String(s) | LeafValue::Enumeration(s) => Self::String(s.clone()),
        }
    }
}

/// Path and value of one update or replace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub path: GnmiPath,
    pub val: TypedValue,
}

/// A collection sent as a full-value replace because its order changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fallback {
    pub path: GnmiPath,
    pub reason: String,
}

/// Deletes, replaces and updates, applied by the target in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SetRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub delete: Vec<GnmiPath>,
    pub replace: Vec<Update>,
    pub update: Vec<Update>,
    #[serde(skip)]
    pub fallbacks: Vec<Fallback>,
}

impl SetRequest {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.replace.is_empty() && self.update.is_empty()
    }
}

/// Encode the forward direction of `delta` as one set request.
pub fn encode_set_request(delta: &Delta, config: &EncodingConfig) -> Result<SetRequest> {
    let mut encoder = SetEncoder {
        schema: delta.schema(),
        qualify: !config.is_openconfig(),
        request: SetRequest {
            origin: config.gnmi_origin.clone(),
            ..SetRequest::default()
        },
    };
    let tree = delta.forward();
    encoder.siblings(tree.roots(), &GnmiPath::default(), None, tree.snapshots())?;
    Ok(encoder.request)
}

enum Plan {
    EachNode,
    Replace(Option<&'static str>),
}

struct SetEncoder<'a> {
    schema: &'a SchemaModel,
    qualify: bool,
    request: SetRequest,
}

impl SetEncoder<'_> {
    fn siblings(
        &mut self,
        nodes: &[DeltaNode],
        parent: &GnmiPath,
        parent_ns: Option<&str>,
        snapshots: &[CollectionSnapshot],
    ) -> Result<()> {
        for group in nodes.chunk_by(|a, b| a.schema_id() == b.schema_id()) {
            let id = group[0].schema_id();
            let snapshot = snapshots.iter().find(|s| s.schema_id() == id);
            match self.plan(id, group, snapshot) {
                Plan::EachNode => {
                    for node in group {
                        self.node(node, parent, parent_ns)?;
                    }
                }
                Plan::Replace(reason) => {
                    self.replace_collection(&group[0], parent, parent_ns, snapshot, reason)?;
                }
            }
        }
        Ok(())
    }

    /// Order-dependent groups go out whole; creates that only extend the
    /// end of a collection can still be sent as updates.
    fn plan(&self, id: SchemaId, group: &[DeltaNode], snapshot: Option<&CollectionSnapshot>) -> Plan {
        if group.iter().any(DeltaNode::is_move) {
            return Plan::Replace(Some("entries moved"));
        }
        if group.iter().any(|n| n.anchor().is_some()) {
            let created: HashSet<&EntryIdentity> = group
                .iter()
                .filter(|n| matches!(n.operation(), Operation::Create(_)))
                .map(DeltaNode::entry)
                .collect();
            let trailing = snapshot.map_or(0, |s| {
                s.entries()
                    .iter()
                    .rev()
                    .take_while(|e| created.contains(e.entry()))
                    .count()
            });
            if trailing < created.len() {
                return Plan::Replace(Some("positional insert"));
            }
        }
        if self.schema.node(id).kind() == NodeKind::LeafList {
            Plan::Replace(None)
        } else {
            Plan::EachNode
        }
    }

    fn replace_collection(
        &mut self,
        first: &DeltaNode,
        parent: &GnmiPath,
        parent_ns: Option<&str>,
        snapshot: Option<&CollectionSnapshot>,
        reason: Option<&'static str>,
    ) -> Result<()> {
        let path = parent.child(PathElem::new(self.name(first.qname(), parent_ns)?));
        let snapshot = snapshot.ok_or_else(|| {
            DeltaError::encode(
                format!("replacing {path}"),
                EncodeErrorKind::UnsupportedOperation("no target snapshot for collection".to_string()),
            )
        })?;

        if let Some(reason) = reason {
            tracing::info!(%path, reason, "sending collection as full-value replace");
            self.request.fallbacks.push(Fallback {
                path: path.clone(),
                reason: reason.to_string(),
            });
        }
        if snapshot.entries().is_empty() {
            self.request.delete.push(path);
        } else {
            let val = TypedValue::JsonIetf(collection_value(self.schema, snapshot.entries())?);
            self.request.replace.push(Update { path, val });
        }
        Ok(())
    }

    fn node(&mut self, node: &DeltaNode, parent: &GnmiPath, parent_ns: Option<&str>) -> Result<()> {
        let path = parent.child(self.elem(node.qname(), node.schema_id(), node.entry(), parent_ns)?);
        let ty = self.schema.node(node.schema_id()).leaf_type();
        match node.operation() {
            Operation::Create(data) => {
                let val = match data.value() {
                    Some(value) => TypedValue::scalar(value, ty),
                    None => TypedValue::JsonIetf(node_value(self.schema, data)?),
                };
                self.request.update.push(Update { path, val });
            }
            Operation::Delete(_) => self.request.delete.push(path),
            Operation::ReplaceLeaf { to, .. } => {
                let val = TypedValue::scalar(to, ty);
                self.request.update.push(Update { path, val });
            }
            Operation::Merge | Operation::Reorder => {
                self.siblings(node.children(), &path, Some(&node.qname().namespace), node.snapshots())?;
            }
        }
        Ok(())
    }

    fn name(&self, qname: &QName, parent_ns: Option<&str>) -> Result<String> {
        if self.qualify {
            member_name(self.schema, qname, parent_ns)
        } else {
            Ok(qname.name.clone())
        }
    }

    fn elem(&self, qname: &QName, id: SchemaId, entry: &EntryIdentity, parent_ns: Option<&str>) -> Result<PathElem> {
        let key = key_pairs(self.schema, id, entry)
            .into_iter()
            .map(|(k, v)| (k.to_string(), value_text(v)))
            .collect();
        Ok(PathElem {
            name: self.name(qname, parent_ns)?,
            key,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::diff::DeltaEngine;
    use crate::schema::test_support::example_schema;
    use crate::tree::ConfigTree;

    fn tree(schema: &Arc<SchemaModel>, xml: &str) -> ConfigTree {
        ConfigTree::from_xml(Arc::clone(schema), xml).unwrap()
    }

    fn routes(schema: &Arc<SchemaModel>, prefixes: &[&str]) -> ConfigTree {
        let body: String = prefixes
            .iter()
            .map(|p| format!("<route><prefix>{p}</prefix></route>"))
            .collect();
        tree(schema, &format!(r#"<routing xmlns="urn:example:routing">{body}</routing>"#))
    }

    fn paths(updates: &[Update]) -> Vec<String> {
        updates.iter().map(|u| u.path.to_string()).collect()
    }

    #[test]
    fn test_updates_and_deletes() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces">
                 <interface><name>eth0</name><mtu>1400</mtu></interface>
                 <interface><name>eth1</name></interface>
               </interfaces>"#,
        );
        let after = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces">
                 <interface><name>eth0</name><mtu>9000</mtu><enabled-v2>true</enabled-v2></interface>
                 <interface><name>eth2</name><description>up</description></interface>
               </interfaces>"#,
        );
        let delta = engine.diff(&before, &after).unwrap();
        let request = encode_set_request(&delta, &EncodingConfig::default()).unwrap();

        let deletes: Vec<String> = request.delete.iter().map(ToString::to_string).collect();
        assert_eq!(deletes, vec!["/example-interfaces:interfaces/interface[name=eth1]"]);
        assert!(request.replace.is_empty());
        assert_eq!(
            paths(&request.update),
            vec![
                "/example-interfaces:interfaces/interface[name=eth0]/mtu",
                "/example-interfaces:interfaces/interface[name=eth0]/enabled-v2",
                "/example-interfaces:interfaces/interface[name=eth2]",
            ]
        );
        assert_eq!(request.update[0].val, TypedValue::Int(9000));
        assert_eq!(request.update[1].val, TypedValue::Bool(true));
        assert_eq!(
            request.update[2].val,
            TypedValue::JsonIetf(json!({ "name": "eth2", "description": "up" }))
        );
        assert!(request.fallbacks.is_empty());
    }

    #[test]
    fn test_reorder_falls_back_to_replace() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let delta = engine
            .diff(&routes(&schema, &["A", "B", "C"]), &routes(&schema, &["B", "A", "C"]))
            .unwrap();
        let request = encode_set_request(&delta, &EncodingConfig::default()).unwrap();

        assert!(request.update.is_empty());
        assert_eq!(paths(&request.replace), vec!["/example-routing:routing/route"]);
        assert_eq!(
            request.replace[0].val,
            TypedValue::JsonIetf(json!([{ "prefix": "B" }, { "prefix": "A" }, { "prefix": "C" }]))
        );
        assert_eq!(request.fallbacks.len(), 1);
        assert_eq!(request.fallbacks[0].reason, "entries moved");
    }

    #[test]
    fn test_append_stays_an_update() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let delta = engine
            .diff(&routes(&schema, &["A"]), &routes(&schema, &["A", "B"]))
            .unwrap();
        let request = encode_set_request(&delta, &EncodingConfig::default()).unwrap();
        assert!(request.replace.is_empty());
        assert_eq!(paths(&request.update), vec!["/example-routing:routing/route[prefix=B]"]);
    }

    #[test]
    fn test_positional_insert_is_replace() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let delta = engine
            .diff(&routes(&schema, &["A"]), &routes(&schema, &["B", "A"]))
            .unwrap();
        let request = encode_set_request(&delta, &EncodingConfig::default()).unwrap();
        assert!(request.update.is_empty());
        assert_eq!(request.replace.len(), 1);
        assert_eq!(request.fallbacks[0].reason, "positional insert");
    }

    #[test]
    fn test_emptied_leaf_list_is_deleted() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces"><dns-server>a</dns-server><dns-server>b</dns-server></interfaces>"#,
        );
        let after = tree(&schema, r#"<interfaces xmlns="urn:example:interfaces"/>"#);
        let delta = engine.diff(&before, &after).unwrap();
        let request = encode_set_request(&delta, &EncodingConfig::default()).unwrap();
        let deletes: Vec<String> = request.delete.iter().map(ToString::to_string).collect();
        assert_eq!(deletes, vec!["/example-interfaces:interfaces/dns-server"]);
        assert!(request.fallbacks.is_empty());
    }

    #[test]
    fn test_openconfig_origin_drops_module_names() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let delta = engine
            .diff(&routes(&schema, &["A"]), &routes(&schema, &[]))
            .unwrap();
        let config = EncodingConfig {
            gnmi_origin: Some("openconfig".to_string()),
            ..EncodingConfig::default()
        };
        let request = encode_set_request(&delta, &config).unwrap();
        assert_eq!(request.origin.as_deref(), Some("openconfig"));
        assert_eq!(request.delete[0].to_string(), "/routing/route[prefix=A]");
    }
}
