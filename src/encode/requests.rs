//! RESTCONF-style request list.
//!
//! One request per maximal changed subtree, in delta pre-order: a parent is
//! created before its children and children are deleted before anything
//! else in their collection is created.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::json::{leaf_value, resource_body};
use super::path::{member_name, restconf_segment};
use crate::config::EncodingConfig;
use crate::diff::{Anchor, CollectionSnapshot, Delta, DeltaNode, Operation};
use crate::error::{DeltaError, EncodeErrorKind, Result};
use crate::schema::SchemaModel;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// One independent request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestRequest {
    pub method: Method,
    /// Resource path, including the data root
    pub path: String,
    /// Query parameters (`insert`, `point`)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RestRequest {
    /// Path with its query string.
    #[must_use]
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

impl fmt::Display for RestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.target())
    }
}

/// Flatten the forward direction of `delta` into requests.
pub fn encode_requests(delta: &Delta, config: &EncodingConfig) -> Result<Vec<RestRequest>> {
    let mut encoder = RequestEncoder {
        schema: delta.schema(),
        root: config.restconf_root.trim_end_matches('/'),
        requests: Vec::new(),
    };
    let tree = delta.forward();
    for node in tree.roots() {
        encoder.node(node, "", None, tree.snapshots())?;
    }
    Ok(encoder.requests)
}

struct RequestEncoder<'a> {
    schema: &'a SchemaModel,
    root: &'a str,
    requests: Vec<RestRequest>,
}

impl RequestEncoder<'_> {
    /// `parent` is the data path below the root, empty at the top.
    fn node(
        &mut self,
        node: &DeltaNode,
        parent: &str,
        parent_ns: Option<&str>,
        snapshots: &[CollectionSnapshot],
    ) -> Result<()> {
        let segment = restconf_segment(self.schema, node.qname(), node.entry(), parent_ns)?;
        let path = format!("{parent}/{segment}");

        match node.operation() {
            Operation::Create(data) => {
                let query = self.insert_query(node, parent, parent_ns)?;
                self.push(Method::Post, format!("{}{parent}", self.root), query, Some(resource_body(self.schema, data)?));
            }
            Operation::Delete(_) => {
                self.push(Method::Delete, format!("{}{path}", self.root), Vec::new(), None);
            }
            Operation::ReplaceLeaf { to, .. } => {
                let ty = self.schema.node(node.schema_id()).leaf_type();
                let name = member_name(self.schema, node.qname(), None)?;
                let mut body = Map::new();
                body.insert(name, leaf_value(ty, to));
                self.push(Method::Put, format!("{}{path}", self.root), Vec::new(), Some(Value::Object(body)));
            }
            Operation::Merge | Operation::Reorder if node.is_move() => {
                // The whole entry is rewritten in its new position.
                let entry = snapshots
                    .iter()
                    .find(|s| s.schema_id() == node.schema_id())
                    .and_then(|s| s.entries().iter().find(|e| e.entry() == node.entry()))
                    .ok_or_else(|| {
                        DeltaError::encode(
                            format!("moving {path}"),
                            EncodeErrorKind::UnsupportedOperation("no target snapshot for moved entry".to_string()),
                        )
                    })?;
                let query = self.insert_query(node, parent, parent_ns)?;
                self.push(Method::Put, format!("{}{path}", self.root), query, Some(resource_body(self.schema, entry)?));
            }
            Operation::Merge | Operation::Reorder => {
                for child in node.children() {
                    self.node(child, &path, Some(&node.qname().namespace), node.snapshots())?;
                }
            }
        }
        Ok(())
    }

    fn insert_query(&self, node: &DeltaNode, parent: &str, parent_ns: Option<&str>) -> Result<Vec<(String, String)>> {
        Ok(match node.anchor() {
            None => Vec::new(),
            Some(Anchor::First) => vec![("insert".to_string(), "first".to_string())],
            Some(Anchor::After(prev)) => {
                let point = restconf_segment(self.schema, node.qname(), prev, parent_ns)?;
                vec![
                    ("insert".to_string(), "after".to_string()),
                    ("point".to_string(), format!("{parent}/{point}")),
                ]
            }
        })
    }

    fn push(&mut self, method: Method, path: String, query: Vec<(String, String)>, body: Option<Value>) {
        tracing::debug!(%method, %path, "encoded request");
        self.requests.push(RestRequest {
            method,
            path,
            query,
            body,
        });
    }
}
