//! XML decoding and rendering of configuration documents.
//!
//! Decoding produces namespace-resolved [`Element`]s; building a
//! [`ConfigTree`](super::ConfigTree) from them is a separate, schema-aware
//! step. Rendering writes data nodes back with the namespace declarations
//! they need.

use std::borrow::Cow;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, QName as XmlName, ResolveResult};
use quick_xml::{NsReader, Writer};

use super::node::DataNode;
use super::value::LeafValue;
use crate::error::{DeltaError, EncodeErrorKind, ParseErrorKind, Result};
use crate::schema::{LeafType, QName, SchemaModel};

/// NETCONF base namespace.
pub const NETCONF_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// YANG XML namespace carrying the `insert`, `key` and `value` attributes.
pub const YANG_NS: &str = "urn:ietf:params:xml:ns:yang:1";

/// A namespace-resolved XML element.
///
/// This is the raw input of [`ConfigTree::from_nodes`](super::ConfigTree::from_nodes):
/// whatever decoded a device reply or an edit document hands over elements
/// in this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub qname: QName,
    pub attributes: Vec<(QName, String)>,
    pub text: String,
    /// Namespace bound to the prefix of `text` when the text reads `prefix:name`
    pub text_namespace: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qname: QName::new(namespace, name),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_attribute(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attributes
            .push((QName::new(namespace, name), value.into()));
        self
    }

    fn is(&self, namespace: &str, name: &str) -> bool {
        self.qname.namespace == namespace && self.qname.name == name
    }

    fn find_child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.qname.name == name)
    }
}

fn xml_error(message: String) -> DeltaError {
    DeltaError::parse("decoding XML", ParseErrorKind::InvalidXml(message))
}

fn owned_namespace(resolved: ResolveResult<'_>) -> Result<String> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Ok(String::from_utf8_lossy(ns).into_owned()),
        ResolveResult::Unbound => Ok(String::new()),
        ResolveResult::Unknown(prefix) => Err(xml_error(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

/// Whether `text` has the shape `prefix:name` of a qualified identity.
fn looks_qualified(text: &str) -> bool {
    text.split_once(':').is_some_and(|(prefix, local)| {
        !prefix.is_empty()
            && !local.is_empty()
            && !local.contains(':')
            && prefix
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !local.chars().any(char::is_whitespace)
    })
}

/// Decode an XML document into its root element.
pub fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        let (resolved, event) = reader
            .read_resolved_event()
            .map_err(|e| xml_error(format!("{e} at position {position}")))?;
        let namespace = owned_namespace(resolved)?;

        match event {
            Event::Start(e) => {
                let element = open_element(&reader, namespace, &e)?;
                stack.push(element);
            }
            Event::Empty(e) => {
                let element = open_element(&reader, namespace, &e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| xml_error(format!("{e} at position {position}")))?;
                    let trimmed = text.trim();
                    if looks_qualified(trimmed) {
                        let (bound, _) = reader.resolve_element(XmlName(trimmed.as_bytes()));
                        if let ResolveResult::Bound(Namespace(ns)) = bound {
                            top.text_namespace = Some(String::from_utf8_lossy(ns).into_owned());
                        }
                    }
                    top.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| xml_error(format!("unbalanced end tag at position {position}")))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(xml_error(format!("{} unclosed element(s)", stack.len())));
    }
    root.ok_or_else(|| DeltaError::parse("decoding XML", ParseErrorKind::MissingPayload))
}

fn open_element(reader: &NsReader<&[u8]>, namespace: String, e: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut element = Element {
        qname: QName::new(namespace, name),
        ..Element::default()
    };
    for attr in e.attributes() {
        let attr = attr.map_err(|e| xml_error(e.to_string()))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let namespace = owned_namespace(resolved)?;
        let value = attr
            .unescape_value()
            .map_err(|e| xml_error(e.to_string()))?
            .into_owned();
        element.attributes.push((
            QName::new(namespace, String::from_utf8_lossy(local.as_ref()).into_owned()),
            value,
        ));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(xml_error("multiple root elements".to_string()))
    }
}

/// Locate the configuration payload of a decoded document.
///
/// Returns an element whose children are the top-level config nodes. Replies
/// (`rpc-reply/data`), bare `data` or `config` elements and edit requests
/// (`rpc/edit-config/config`, `edit-config/config`) are unwrapped; any other
/// root is taken as a single top-level config node.
pub fn config_payload(root: Element) -> Result<Element> {
    let missing = || DeltaError::parse("locating config payload", ParseErrorKind::MissingPayload);

    if root.is(NETCONF_NS, "rpc-reply") {
        return root.find_child("data").cloned().ok_or_else(missing);
    }
    if root.is(NETCONF_NS, "rpc") {
        return root
            .find_child("edit-config")
            .and_then(|e| e.find_child("config"))
            .cloned()
            .ok_or_else(missing);
    }
    if root.is(NETCONF_NS, "edit-config") {
        return root.find_child("config").cloned().ok_or_else(missing);
    }
    if root.qname.name == "data" || root.is(NETCONF_NS, "config") {
        return Ok(root);
    }
    Ok(Element::new(NETCONF_NS, "config").with_child(root))
}

// ============================================================================
// Rendering
// ============================================================================

fn write_error(e: impl std::fmt::Display) -> DeltaError {
    DeltaError::encode("writing XML", EncodeErrorKind::Xml(e.to_string()))
}

/// Thin wrapper over a quick-xml writer producing a `String`.
pub(crate) struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    pub(crate) fn new(pretty: bool) -> Self {
        let writer = if pretty {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };
        Self { writer }
    }

    fn start_tag<'a>(name: &'a str, attrs: &'a [(String, String)]) -> BytesStart<'a> {
        BytesStart::new(name).with_attributes(attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub(crate) fn start(&mut self, name: &str, attrs: &[(String, String)]) -> Result<()> {
        self.writer
            .write_event(Event::Start(Self::start_tag(name, attrs)))
            .map_err(write_error)
    }

    pub(crate) fn empty(&mut self, name: &str, attrs: &[(String, String)]) -> Result<()> {
        self.writer
            .write_event(Event::Empty(Self::start_tag(name, attrs)))
            .map_err(write_error)
    }

    pub(crate) fn text(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error)
    }

    pub(crate) fn end(&mut self, name: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(write_error)
    }

    /// Write an element holding only text, or an empty element for empty text.
    pub(crate) fn leaf(&mut self, name: &str, attrs: &[(String, String)], text: &str) -> Result<()> {
        if text.is_empty() {
            self.empty(name, attrs)
        } else {
            self.start(name, attrs)?;
            self.text(text)?;
            self.end(name)
        }
    }

    pub(crate) fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(write_error)
    }
}

/// XML text of a leaf value plus the namespace declaration it needs.
///
/// Identity references are stored as `module:identity` and written as
/// `prefix:identity` with the prefix declared on the element.
pub(crate) fn leaf_text<'v>(
    schema: &SchemaModel,
    ty: Option<LeafType>,
    value: &'v LeafValue,
) -> (Cow<'v, str>, Option<(String, String)>) {
    if let (Some(LeafType::Identityref), LeafValue::Enumeration(token)) = (ty, value)
        && let Some((module, identity)) = token.split_once(':')
        && let Some(info) = schema.module_by_name(module)
    {
        return (
            Cow::Owned(format!("{}:{identity}", info.prefix)),
            Some((format!("xmlns:{}", info.prefix), info.namespace.clone())),
        );
    }
    match value {
        LeafValue::String(s) | LeafValue::Enumeration(s) => (Cow::Borrowed(s.as_str()), None),
        other => (Cow::Owned(other.to_string()), None),
    }
}

/// Write a data node and its whole subtree.
///
/// `attrs` are added to the node's own element; an `xmlns` declaration is
/// added whenever the node's namespace differs from `parent_ns`.
pub(crate) fn write_node(
    out: &mut XmlOut,
    schema: &SchemaModel,
    node: &DataNode,
    parent_ns: &str,
    mut attrs: Vec<(String, String)>,
) -> Result<()> {
    if node.namespace() != parent_ns {
        attrs.insert(0, ("xmlns".to_string(), node.namespace().to_string()));
    }
    let name = node.name();
    if let Some(value) = node.value() {
        let (text, decl) = leaf_text(schema, schema.node(node.schema_id()).leaf_type(), value);
        attrs.extend(decl);
        return out.leaf(name, &attrs, &text);
    }
    if node.children().is_empty() {
        return out.empty(name, &attrs);
    }
    out.start(name, &attrs)?;
    for child in node.children() {
        write_node(out, schema, child, node.namespace(), Vec::new())?;
    }
    out.end(name)
}
