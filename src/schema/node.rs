//! Schema node definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::LeafValue;

/// Namespace-qualified name of a schema or data node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    pub namespace: String,
    pub name: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.name)
    }
}

/// Index of a node inside a [`SchemaModel`](super::SchemaModel).
///
/// Config tree nodes refer to their schema node through this index; the
/// model owns the node, the tree only looks it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub(crate) u32);

impl SchemaId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Sequence of qualified names from the schema root, choice and case nodes included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchemaPath(pub Vec<QName>);

impl SchemaPath {
    #[must_use]
    pub fn child(&self, qname: QName) -> Self {
        let mut segments = self.0.clone();
        segments.push(qname);
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[QName] {
        &self.0
    }
}

impl FromIterator<QName> for SchemaPath {
    fn from_iter<I: IntoIterator<Item = QName>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Kind of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Container,
    List,
    Leaf,
    LeafList,
    Choice,
    Case,
}

impl NodeKind {
    /// Whether instances of this node appear as elements in a config tree.
    #[must_use]
    pub const fn is_data(self) -> bool {
        !matches!(self, Self::Choice | Self::Case)
    }

    /// Whether the node is a collection of sibling entries.
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::List | Self::LeafList)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::List => "list",
            Self::Leaf => "leaf",
            Self::LeafList => "leaf-list",
            Self::Choice => "choice",
            Self::Case => "case",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordering policy of a list or leaf-list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ordering {
    #[default]
    #[serde(alias = "system-ordered")]
    System,
    #[serde(alias = "user-ordered")]
    User,
}

/// Deprecation status. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Current,
    #[serde(alias = "obsolete")]
    Deprecated,
}

/// Value type of a leaf or leaf-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafType {
    /// Any integer type; `wide` marks 64-bit types, which JSON renders as strings
    Integer { wide: bool },
    Boolean,
    Empty,
    Enumeration,
    /// Identity reference, normalized to a `module:identity` token
    Identityref,
    String,
}

impl LeafType {
    /// Map a YANG built-in type name to a leaf type.
    ///
    /// Unknown and derived type names fall back to [`LeafType::String`].
    #[must_use]
    pub fn from_type_name(name: &str) -> Self {
        let base = name.rsplit(':').next().unwrap_or(name);
        match base {
            "int8" | "int16" | "int32" | "uint8" | "uint16" | "uint32" => {
                Self::Integer { wide: false }
            }
            "int64" | "uint64" => Self::Integer { wide: true },
            "boolean" => Self::Boolean,
            "empty" => Self::Empty,
            "enumeration" => Self::Enumeration,
            "identityref" => Self::Identityref,
            _ => Self::String,
        }
    }
}

/// One node of the compiled schema.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub(crate) id: SchemaId,
    pub(crate) parent: Option<SchemaId>,
    pub(crate) data_parent: Option<SchemaId>,
    pub(crate) qname: QName,
    pub(crate) kind: NodeKind,
    pub(crate) key_leaves: Vec<String>,
    pub(crate) key_ids: Vec<SchemaId>,
    pub(crate) ordering: Ordering,
    pub(crate) default: Option<LeafValue>,
    pub(crate) status: Status,
    pub(crate) leaf_type: Option<LeafType>,
    pub(crate) children: Vec<SchemaId>,
    pub(crate) data_children: Vec<SchemaId>,
    pub(crate) position: u32,
    pub(crate) path: SchemaPath,
    pub(crate) data_path: String,
    pub(crate) choices: Vec<(SchemaId, SchemaId)>,
}

impl SchemaNode {
    #[must_use]
    pub const fn id(&self) -> SchemaId {
        self.id
    }

    /// Parent schema node, choice and case nodes included.
    #[must_use]
    pub const fn parent(&self) -> Option<SchemaId> {
        self.parent
    }

    /// Nearest ancestor that is a data node.
    #[must_use]
    pub const fn data_parent(&self) -> Option<SchemaId> {
        self.data_parent
    }

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
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Key leaf names of a list, empty for every other kind.
    #[must_use]
    pub fn key_leaves(&self) -> &[String] {
        &self.key_leaves
    }

    pub(crate) fn key_ids(&self) -> &[SchemaId] {
        &self.key_ids
    }

    #[must_use]
    pub const fn ordering(&self) -> Ordering {
        self.ordering
    }

    #[must_use]
    pub fn is_user_ordered(&self) -> bool {
        self.kind.is_collection() && self.ordering == Ordering::User
    }

    #[must_use]
    pub const fn default_value(&self) -> Option<&LeafValue> {
        self.default.as_ref()
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub const fn leaf_type(&self) -> Option<LeafType> {
        self.leaf_type
    }

    /// Direct schema children, choice and case nodes included.
    #[must_use]
    pub fn children(&self) -> &[SchemaId] {
        &self.children
    }

    /// Data children in schema order, looking through choice and case nodes.
    #[must_use]
    pub fn data_children(&self) -> &[SchemaId] {
        &self.data_children
    }

    /// Index of this node among its data parent's data children.
    #[must_use]
    pub const fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub const fn path(&self) -> &SchemaPath {
        &self.path
    }

    /// Data path with module prefixes, e.g. `/if:interfaces/if:interface`.
    #[must_use]
    pub fn data_path(&self) -> &str {
        &self.data_path
    }

    /// `(choice, case)` pairs between this node and its data parent, outermost first.
    #[must_use]
    pub fn choices(&self) -> &[(SchemaId, SchemaId)] {
        &self.choices
    }

    /// Whether `id` is one of this list's key leaves.
    #[must_use]
    pub fn is_key(&self, id: SchemaId) -> bool {
        self.key_ids.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_type_mapping() {
        assert_eq!(
            LeafType::from_type_name("uint32"),
            LeafType::Integer { wide: false }
        );
        assert_eq!(
            LeafType::from_type_name("int64"),
            LeafType::Integer { wide: true }
        );
        assert_eq!(LeafType::from_type_name("boolean"), LeafType::Boolean);
        assert_eq!(LeafType::from_type_name("identityref"), LeafType::Identityref);
        assert_eq!(LeafType::from_type_name("inet:ipv4-address"), LeafType::String);
        assert_eq!(LeafType::from_type_name("decimal64"), LeafType::String);
    }

    #[test]
    fn test_node_kind_serde() {
        let kind: NodeKind = serde_json::from_str("\"leaf-list\"").unwrap();
        assert_eq!(kind, NodeKind::LeafList);
        assert!(kind.is_collection());
        assert!(!NodeKind::Choice.is_data());
    }

    #[test]
    fn test_ordering_aliases() {
        let ordering: Ordering = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(ordering, Ordering::User);
        let ordering: Ordering = serde_json::from_str("\"system-ordered\"").unwrap();
        assert_eq!(ordering, Ordering::System);
    }
}
