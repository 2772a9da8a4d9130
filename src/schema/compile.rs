//! Compilation of schema documents into a [`SchemaModel`].
//!
//! A schema document is the output of an external YANG compiler: groupings
//! are already expanded and augments merged, so every node is spelled out in
//! place. The document can be written as JSON or YAML:
//!
//! ```yaml
//! modules:
//!   - name: example-interfaces
//!     prefix: if
//!     namespace: urn:example:interfaces
//!     nodes:
//!       - name: interfaces
//!         kind: container
//!         children:
//!           - name: interface
//!             kind: list
//!             keys: [name]
//!             children:
//!               - { name: name, kind: leaf, type: string }
//!               - { name: mtu, kind: leaf, type: uint16, default: 1500 }
//! ```

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::model::{ModuleInfo, SchemaModel};
use super::node::{
    LeafType, NodeKind, Ordering, QName, SchemaId, SchemaNode, SchemaPath, Status,
};
use crate::error::{DeltaError, ErrorContext, Result, SchemaErrorKind};
use crate::tree::LeafValue;

/// A compiled schema document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub modules: Vec<ModuleDocument>,
}

/// One module of a schema document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDocument {
    pub name: String,
    pub prefix: String,
    pub namespace: String,
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
}

/// One node of a schema document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeDocument {
    pub name: String,
    pub kind: NodeKind,
    /// Namespace of an augmenting module; inherited from the parent when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    #[serde(default)]
    pub ordered_by: Ordering,
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDocument>,
}

/// Accept defaults written as YAML/JSON numbers or booleans as well as strings.
fn scalar_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

impl SchemaDocument {
    /// Parse a schema document from JSON.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("parsing JSON schema document")
    }

    /// Parse a schema document from YAML.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).context("parsing YAML schema document")
    }

    /// Load a schema document, picking the format from the file extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DeltaError::io(path, e))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
        .with_context(|| format!("loading {}", path.display()))
    }
}

/// Compile a schema document into a read-only [`SchemaModel`].
pub fn compile_schema(document: &SchemaDocument) -> Result<SchemaModel> {
    let mut compiler = Compiler::default();
    for module in &document.modules {
        compiler.register_module(module)?;
    }
    for module in &document.modules {
        for node in &module.nodes {
            let id = compiler.add_node(node, &Scope::top(&module.namespace))?;
            compiler.model.top.push(id);
        }
    }

    tracing::debug!(
        modules = compiler.model.modules.len(),
        nodes = compiler.model.nodes.len(),
        "compiled schema"
    );
    Ok(compiler.model)
}

/// Where a node is being attached.
struct Scope<'a> {
    parent: Option<SchemaId>,
    namespace: &'a str,
    path: SchemaPath,
    data_parent: Option<SchemaId>,
    parent_data_path: String,
    choices: Vec<(SchemaId, SchemaId)>,
}

impl<'a> Scope<'a> {
    fn top(namespace: &'a str) -> Self {
        Self {
            parent: None,
            namespace,
            path: SchemaPath::default(),
            data_parent: None,
            parent_data_path: String::new(),
            choices: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Compiler {
    model: SchemaModel,
}

impl Compiler {
    fn register_module(&mut self, module: &ModuleDocument) -> Result<()> {
        let idx = self.model.modules.len();
        if self
            .model
            .module_by_namespace
            .insert(module.namespace.clone(), idx)
            .is_some()
        {
            return Err(DeltaError::schema(
                format!("module {}", module.name),
                SchemaErrorKind::DuplicateNamespace(module.namespace.clone()),
            ));
        }
        if self
            .model
            .module_by_prefix
            .insert(module.prefix.clone(), idx)
            .is_some()
        {
            return Err(DeltaError::schema(
                format!("module {}", module.name),
                SchemaErrorKind::DuplicatePrefix(module.prefix.clone()),
            ));
        }
        self.model.module_by_name.insert(module.name.clone(), idx);
        self.model.modules.push(ModuleInfo {
            name: module.name.clone(),
            prefix: module.prefix.clone(),
            namespace: module.namespace.clone(),
        });
        Ok(())
    }

    fn add_node(&mut self, doc: &NodeDocument, scope: &Scope<'_>) -> Result<SchemaId> {
        let namespace = doc.namespace.as_deref().unwrap_or(scope.namespace);
        let prefix = self
            .model
            .module_by_namespace(namespace)
            .map(|m| m.prefix.clone())
            .ok_or_else(|| {
                DeltaError::schema(
                    format!("node {}", doc.name),
                    SchemaErrorKind::UnknownNamespace(namespace.to_string()),
                )
            })?;
        let parent_kind = scope.parent.map(|p| self.model.node(p).kind);

        // Shorthand case: a data node directly under a choice gets its own case.
        if parent_kind == Some(NodeKind::Choice) && doc.kind != NodeKind::Case {
            let implicit = NodeDocument {
                name: doc.name.clone(),
                kind: NodeKind::Case,
                namespace: Some(namespace.to_string()),
                keys: Vec::new(),
                ordered_by: Ordering::System,
                default: None,
                status: doc.status,
                type_name: None,
                children: vec![doc.clone()],
            };
            let case_id = self.add_node(&implicit, scope)?;
            return Ok(self.model.node(case_id).children[0]);
        }
        if doc.kind == NodeKind::Case && parent_kind != Some(NodeKind::Choice) {
            return Err(DeltaError::schema(
                format!("node {}", doc.name),
                SchemaErrorKind::MisplacedCase(doc.name.clone()),
            ));
        }

        let qname = QName::new(namespace, doc.name.as_str());
        let path = scope.path.child(qname.clone());
        let data_path = format!("{}/{}:{}", scope.parent_data_path, prefix, doc.name);
        let id = SchemaId(self.model.nodes.len() as u32);

        if self.model.by_path.insert(path.clone(), id).is_some() {
            return Err(DeltaError::schema(
                "registering schema path",
                SchemaErrorKind::DuplicateNode(data_path),
            ));
        }

        let mut position = 0;
        if doc.kind.is_data() {
            let key = (scope.data_parent, qname.clone());
            if self.model.data_children.insert(key, id).is_some() {
                return Err(DeltaError::schema(
                    "registering data node",
                    SchemaErrorKind::DuplicateNode(data_path),
                ));
            }
            self.model.by_data_path.insert(data_path.clone(), id);
            let siblings = match scope.data_parent {
                Some(p) => &mut self.model.nodes[p.index()].data_children,
                None => &mut self.model.data_roots,
            };
            position = siblings.len() as u32;
            siblings.push(id);
        }

        if matches!(doc.kind, NodeKind::Leaf | NodeKind::LeafList) && !doc.children.is_empty() {
            return Err(DeltaError::schema(
                "compiling node",
                SchemaErrorKind::UnexpectedChildren {
                    node: data_path,
                    kind: doc.kind.to_string(),
                },
            ));
        }
        if doc.kind == NodeKind::List && doc.keys.is_empty() {
            return Err(DeltaError::schema(
                "compiling list",
                SchemaErrorKind::MissingKeys(data_path),
            ));
        }

        let leaf_type = matches!(doc.kind, NodeKind::Leaf | NodeKind::LeafList).then(|| {
            doc.type_name
                .as_deref()
                .map_or(LeafType::String, LeafType::from_type_name)
        });
        let default = match (&doc.default, leaf_type) {
            (Some(text), Some(ty)) if doc.kind == NodeKind::Leaf => {
                Some(self.parse_default(text, ty, &data_path)?)
            }
            _ => None,
        };

        self.model.nodes.push(SchemaNode {
            id,
            parent: scope.parent,
            data_parent: scope.data_parent,
            qname,
            kind: doc.kind,
            key_leaves: if doc.kind == NodeKind::List {
                doc.keys.clone()
            } else {
                Vec::new()
            },
            key_ids: Vec::new(),
            ordering: if doc.kind.is_collection() {
                doc.ordered_by
            } else {
                Ordering::System
            },
            default,
            status: doc.status,
            leaf_type,
            children: Vec::new(),
            data_children: Vec::new(),
            position,
            path: path.clone(),
            data_path: data_path.clone(),
            choices: scope.choices.clone(),
        });

        let child_scope = match doc.kind {
            NodeKind::Choice => Scope {
                parent: Some(id),
                namespace,
                path,
                data_parent: scope.data_parent,
                parent_data_path: scope.parent_data_path.clone(),
                choices: scope.choices.clone(),
            },
            NodeKind::Case => {
                let mut choices = scope.choices.clone();
                if let Some(choice) = scope.parent {
                    choices.push((choice, id));
                }
                Scope {
                    parent: Some(id),
                    namespace,
                    path,
                    data_parent: scope.data_parent,
                    parent_data_path: scope.parent_data_path.clone(),
                    choices,
                }
            }
            _ => Scope {
                parent: Some(id),
                namespace,
                path,
                data_parent: Some(id),
                parent_data_path: data_path.clone(),
                choices: Vec::new(),
            },
        };

        let mut children = Vec::with_capacity(doc.children.len());
        for child in &doc.children {
            children.push(self.add_node(child, &child_scope)?);
        }
        self.model.nodes[id.index()].children = children;

        if doc.kind == NodeKind::List {
            let key_ids = self.resolve_keys(id, &doc.keys, &data_path)?;
            self.model.nodes[id.index()].key_ids = key_ids;
        }

        Ok(id)
    }

    fn resolve_keys(&self, list: SchemaId, keys: &[String], list_path: &str) -> Result<Vec<SchemaId>> {
        let node = self.model.node(list);
        keys.iter()
            .map(|key| {
                node.children
                    .iter()
                    .copied()
                    .find(|c| {
                        let child = self.model.node(*c);
                        child.kind == NodeKind::Leaf && child.qname.name == *key
                    })
                    .ok_or_else(|| {
                        DeltaError::schema(
                            "resolving list keys",
                            SchemaErrorKind::UnknownKey {
                                list: list_path.to_string(),
                                key: key.clone(),
                            },
                        )
                    })
            })
            .collect()
    }

    fn parse_default(&self, text: &str, ty: LeafType, node: &str) -> Result<LeafValue> {
        let invalid = || {
            DeltaError::schema(
                "parsing default value",
                SchemaErrorKind::InvalidDefault {
                    node: node.to_string(),
                    value: text.to_string(),
                },
            )
        };
        if ty == LeafType::Identityref {
            // Defaults name identities by prefix; values carry the module name.
            let token = match text.split_once(':') {
                Some((prefix, name)) => match self.model.module_by_prefix(prefix) {
                    Some(module) => format!("{}:{name}", module.name),
                    None => text.to_string(),
                },
                None => text.to_string(),
            };
            return Ok(LeafValue::Enumeration(token));
        }
        LeafValue::parse(text, ty, node).map_err(|_| invalid())
    }
}
