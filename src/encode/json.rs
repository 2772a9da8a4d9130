//! JSON encoding of config data (RFC 7951 conventions).
//!
//! Member names are qualified with their module name at the top level and
//! wherever the namespace changes. 64-bit integers are strings, `empty`
//! leaves are `[null]`, identity references are `module:identity`.

use serde_json::{Map, Value, json};

use super::path::member_name;
use crate::error::Result;
use crate::schema::{LeafType, SchemaModel};
use crate::tree::{ConfigTree, DataNode, LeafValue};

/// Encode a whole tree as one JSON object.
pub fn encode_tree(tree: &ConfigTree) -> Result<Value> {
    Ok(Value::Object(members(tree.schema(), tree.roots(), None)?))
}

/// JSON value of a leaf or leaf-list entry.
pub(crate) fn leaf_value(ty: Option<LeafType>, value: &LeafValue) -> Value {
    match value {
        LeafValue::Integer(n) => {
            if matches!(ty, Some(LeafType::Integer { wide: true })) {
                Value::String(n.to_string())
            } else if let Ok(v) = i64::try_from(*n) {
                json!(v)
            } else if let Ok(v) = u64::try_from(*n) {
                json!(v)
            } else {
                Value::String(n.to_string())
            }
        }
        LeafValue::Boolean(b) => Value::Bool(*b),
        LeafValue::Empty => json!([null]),
        LeafValue::String(s) | LeafValue::Enumeration(s) => Value::String(s.clone()),
    }
}

/// Members for a sibling set; list and leaf-list entries are grouped into arrays.
pub(crate) fn members(schema: &SchemaModel, nodes: &[DataNode], parent_ns: Option<&str>) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for node in nodes {
        let name = member_name(schema, node.qname(), parent_ns)?;
        let value = node_value(schema, node)?;
        if schema.node(node.schema_id()).kind().is_collection() {
            match map.entry(name).or_insert_with(|| Value::Array(Vec::new())) {
                Value::Array(items) => items.push(value),
                other => *other = Value::Array(vec![value]),
            }
        } else {
            map.insert(name, value);
        }
    }
    Ok(map)
}

/// Value of a single node: a scalar for leaves, an object otherwise.
pub(crate) fn node_value(schema: &SchemaModel, node: &DataNode) -> Result<Value> {
    match node.value() {
        Some(value) => Ok(leaf_value(schema.node(node.schema_id()).leaf_type(), value)),
        None => Ok(Value::Object(members(schema, node.children(), Some(node.namespace()))?)),
    }
}

/// A node wrapped in its qualified member name, as a resource body:
/// `{"module:list": [entry]}` for entries, `{"module:name": value}` otherwise.
pub(crate) fn resource_body(schema: &SchemaModel, node: &DataNode) -> Result<Value> {
    let name = member_name(schema, node.qname(), None)?;
    let value = node_value(schema, node)?;
    let value = if schema.node(node.schema_id()).kind().is_collection() {
        Value::Array(vec![value])
    } else {
        value
    };
    let mut map = Map::new();
    map.insert(name, value);
    Ok(Value::Object(map))
}

/// Array value of a whole collection.
pub(crate) fn collection_value(schema: &SchemaModel, entries: &[DataNode]) -> Result<Value> {
    entries
        .iter()
        .map(|e| node_value(schema, e))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::test_support::example_schema;

    #[test]
    fn test_encode_tree() {
        let schema = example_schema();
        let tree = ConfigTree::from_xml(
            Arc::clone(&schema),
            r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
                 <interfaces xmlns="urn:example:interfaces" xmlns:x="urn:example:iana-types">
                   <interface>
                     <name>eth0</name>
                     <type>x:ethernetCsmacd</type>
                     <mtu>9000</mtu>
                     <dhcp-client/>
                     <tag>a</tag>
                     <tag>b</tag>
                   </interface>
                 </interfaces>
                 <routing xmlns="urn:example:routing">
                   <audit xmlns="urn:example:audit">true</audit>
                 </routing>
               </config>"#,
        )
        .unwrap();

        let value = encode_tree(&tree).unwrap();
        assert_eq!(
            value,
            json!({
                "example-interfaces:interfaces": {
                    "interface": [{
                        "name": "eth0",
                        "type": "example-iana-types:ethernetCsmacd",
                        "mtu": 9000,
                        "dhcp-client": [null],
                        "tag": ["a", "b"]
                    }]
                },
                "example-routing:routing": {
                    "example-audit:audit": true
                }
            })
        );
    }

    #[test]
    fn test_wide_integers_are_strings() {
        assert_eq!(
            leaf_value(Some(LeafType::Integer { wide: true }), &LeafValue::Integer(5)),
            json!("5")
        );
        assert_eq!(
            leaf_value(Some(LeafType::Integer { wide: false }), &LeafValue::Integer(-5)),
            json!(-5)
        );
    }
}
