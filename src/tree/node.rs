//! Config tree nodes and their identities.

use std::fmt::Write as _;

use super::value::LeafValue;
use crate::schema::{QName, SchemaId, SchemaModel};

/// Identity of a node among siblings that share its name.
///
/// Containers and leaves occur at most once per parent, list entries are
/// identified by their key tuple and leaf-list entries by their value.
/// Position never takes part in identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryIdentity {
    Single,
    Key(Vec<LeafValue>),
    Value(LeafValue),
}

impl EntryIdentity {
    /// Render as XPath predicates, e.g. `[name='eth0']` or `[.='10.0.0.1']`.
    #[must_use]
    pub fn predicate(&self, key_names: &[String]) -> String {
        match self {
            Self::Single => String::new(),
            Self::Key(values) => {
                let mut out = String::new();
                for (name, value) in key_names.iter().zip(values) {
                    let _ = write!(out, "[{name}='{value}']");
                }
                out
            }
            Self::Value(value) => format!("[.='{value}']"),
        }
    }
}

/// Sibling-unique identity: qualified name plus entry identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdentity {
    pub qname: QName,
    pub entry: EntryIdentity,
}

/// One element of a config tree.
///
/// The node refers to its schema node by [`SchemaId`]; the schema itself is
/// held by the owning [`ConfigTree`](super::ConfigTree).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataNode {
    pub(crate) qname: QName,
    pub(crate) schema: SchemaId,
    pub(crate) entry: EntryIdentity,
    pub(crate) value: Option<LeafValue>,
    pub(crate) children: Vec<DataNode>,
}

impl DataNode {
    #[must_use]
    pub const fn qname(&self) -> &QName {
        &self.qname
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.qname.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.qname.namespace
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
    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity {
            qname: self.qname.clone(),
            entry: self.entry.clone(),
        }
    }

    /// Value of a leaf or leaf-list entry.
    #[must_use]
    pub const fn value(&self) -> Option<&LeafValue> {
        self.value.as_ref()
    }

    /// Children in storage order.
    #[must_use]
    pub fn children(&self) -> &[DataNode] {
        &self.children
    }

    /// First child with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&DataNode> {
        self.children.iter().find(|c| c.qname.name == name)
    }

    /// Number of nodes in this subtree, the node itself included.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(DataNode::subtree_len).sum::<usize>()
    }
}

/// Path segment of a node for messages, e.g. `if:interface[name='eth0']`.
pub(crate) fn display_segment(
    schema: &SchemaModel,
    qname: &QName,
    id: SchemaId,
    entry: &EntryIdentity,
) -> String {
    let keys = schema.node(id).key_leaves();
    format!("{}{}", schema.prefixed(qname), entry.predicate(keys))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_rendering() {
        let keys = vec!["name".to_string(), "seq".to_string()];
        let entry = EntryIdentity::Key(vec![
            LeafValue::String("acl1".to_string()),
            LeafValue::Integer(10),
        ]);
        assert_eq!(entry.predicate(&keys), "[name='acl1'][seq='10']");
        assert_eq!(
            EntryIdentity::Value(LeafValue::Integer(5)).predicate(&[]),
            "[.='5']"
        );
        assert_eq!(EntryIdentity::Single.predicate(&[]), "");
    }

    #[test]
    fn test_identity_ordering_is_total() {
        let a = EntryIdentity::Key(vec![LeafValue::String("a".to_string())]);
        let b = EntryIdentity::Key(vec![LeafValue::String("b".to_string())]);
        assert!(a < b);
        assert!(EntryIdentity::Single < a);
    }
}
