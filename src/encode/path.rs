//! Resource paths and qualified names shared by the encoders.

use std::fmt::Write as _;

use crate::error::{DeltaError, EncodeErrorKind, Result};
use crate::schema::{QName, SchemaId, SchemaModel};
use crate::tree::{EntryIdentity, LeafValue};

/// Module name declaring `namespace`.
pub(crate) fn module_name<'s>(schema: &'s SchemaModel, namespace: &str) -> Result<&'s str> {
    schema
        .module_by_namespace(namespace)
        .map(|m| m.name.as_str())
        .ok_or_else(|| {
            DeltaError::encode(
                "qualifying node name",
                EncodeErrorKind::UnknownNamespace(namespace.to_string()),
            )
        })
}

/// `module:name` when the namespace changes from `parent_ns`, else `name`.
pub(crate) fn member_name(schema: &SchemaModel, qname: &QName, parent_ns: Option<&str>) -> Result<String> {
    if parent_ns == Some(qname.namespace.as_str()) {
        Ok(qname.name.clone())
    } else {
        Ok(format!("{}:{}", module_name(schema, &qname.namespace)?, qname.name))
    }
}

/// Text of a value inside a path or query string.
pub(crate) fn value_text(value: &LeafValue) -> String {
    match value {
        LeafValue::String(s) | LeafValue::Enumeration(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Key leaf names paired with their values, for list entries.
pub(crate) fn key_pairs<'a>(
    schema: &'a SchemaModel,
    id: SchemaId,
    entry: &'a EntryIdentity,
) -> Vec<(&'a str, &'a LeafValue)> {
    match entry {
        EntryIdentity::Key(values) => schema
            .node(id)
            .key_leaves()
            .iter()
            .map(String::as_str)
            .zip(values)
            .collect(),
        _ => Vec::new(),
    }
}

/// One RESTCONF path segment, e.g. `example-routing:route=10.0.0.0%2F8`.
pub(crate) fn restconf_segment(
    schema: &SchemaModel,
    qname: &QName,
    entry: &EntryIdentity,
    parent_ns: Option<&str>,
) -> Result<String> {
    let mut segment = member_name(schema, qname, parent_ns)?;
    match entry {
        EntryIdentity::Single => {}
        EntryIdentity::Key(values) => {
            let keys: Vec<String> = values
                .iter()
                .map(|v| urlencoding::encode(&value_text(v)).into_owned())
                .collect();
            let _ = write!(segment, "={}", keys.join(","));
        }
        EntryIdentity::Value(value) => {
            let _ = write!(segment, "={}", urlencoding::encode(&value_text(value)));
        }
    }
    Ok(segment)
}
