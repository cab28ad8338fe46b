//! Abstract message-tree model and XML codec.
//!
//! NETCONF envelopes and subtree filters are both trees of named nodes.
//! This module defines the one node shape shared by the hello envelope,
//! filter trees and data trees ([`Node`]), together with a namespace-aware
//! XML reader/writer built on `quick-xml`. The model is deliberately
//! schema-free: a node has a qualified name, ordered attributes, an
//! optional text value and ordered children. Converting typed YANG data
//! into and out of this shape is the job of an external schema layer.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Writer};

use crate::error::{NetconfError, Result};

/// A qualified element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI, if the name is namespace-qualified.
    pub namespace: Option<String>,
    /// Local part of the name.
    pub local: String,
}

impl QName {
    /// Create a namespace-qualified name.
    pub fn new(namespace: &str, local: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            local: local.to_string(),
        }
    }

    /// Create a name without a namespace.
    pub fn unqualified(local: &str) -> Self {
        Self {
            namespace: None,
            local: local.to_string(),
        }
    }
}

impl std::fmt::Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// A named attribute carried by a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name, optionally namespace-qualified.
    pub name: QName,
    /// Attribute value.
    pub value: String,
}

/// One node of a message/filter/data tree.
///
/// Invariant maintained by the XML reader: a node carries a text `value`
/// only when it has no element children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Qualified element name.
    pub name: QName,
    /// Attributes in document order, namespace declarations excluded.
    pub attributes: Vec<Attribute>,
    /// Text content, present only on leaf nodes.
    pub value: Option<String>,
    /// Child elements in document order.
    pub children: Vec<Node>,
}

impl Node {
    /// Create an empty element.
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            value: None,
            children: Vec::new(),
        }
    }

    /// Set the text value.
    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    /// Append a child element.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Append an attribute.
    pub fn with_attribute(mut self, name: QName, value: &str) -> Self {
        self.attributes.push(Attribute {
            name,
            value: value.to_string(),
        });
        self
    }

    /// First child with the given local name and namespace.
    pub fn child(&self, namespace: &str, local: &str) -> Option<&Node> {
        self.children.iter().find(|c| {
            c.name.local == local && c.name.namespace.as_deref() == Some(namespace)
        })
    }

    /// All children with the given local name and namespace.
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |c| {
            c.name.local == local && c.name.namespace.as_deref() == Some(namespace)
        })
    }

    /// Trimmed text value, if any.
    pub fn text(&self) -> Option<&str> {
        self.value.as_deref().map(str::trim)
    }

    /// True when the node has no attributes, no value and no children.
    pub fn is_bare(&self) -> bool {
        self.attributes.is_empty() && self.value.is_none() && self.children.is_empty()
    }

    /// Parse a single-rooted XML document into a tree.
    pub fn from_xml(xml: &str) -> Result<Node> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_resolved_event_into(&mut buf) {
                Ok((ns, Event::Start(e))) => {
                    let namespace = bound_namespace(ns);
                    let node = start_node(&reader, namespace, &e)?;
                    stack.push(node);
                }
                Ok((ns, Event::Empty(e))) => {
                    let namespace = bound_namespace(ns);
                    let node = start_node(&reader, namespace, &e)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Ok((_, Event::Text(t))) => {
                    let text = t
                        .unescape()
                        .map_err(|e| NetconfError::Xml(e.to_string()))?;
                    if let Some(top) = stack.last_mut() {
                        append_text(top, &text);
                    }
                }
                Ok((_, Event::CData(t))) => {
                    let text = String::from_utf8_lossy(&t.into_inner()).to_string();
                    if let Some(top) = stack.last_mut() {
                        append_text(top, &text);
                    }
                }
                Ok((_, Event::End(_))) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| NetconfError::Xml("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, node)?;
                }
                Ok((_, Event::Eof)) => break,
                Ok(_) => {}
                Err(e) => return Err(NetconfError::Xml(e.to_string())),
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(NetconfError::Xml("unexpected end of document".to_string()));
        }
        root.ok_or_else(|| NetconfError::Xml("document has no root element".to_string()))
    }

    /// Serialize the tree to an XML string.
    ///
    /// Default-namespace declarations are emitted wherever a node's
    /// namespace differs from its parent's; namespaced attributes get
    /// generated prefixes on the owning element.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_node(&mut writer, self, None)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| NetconfError::Xml(e.to_string()))
    }
}

fn bound_namespace(ns: ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(n) => Some(String::from_utf8_lossy(n.as_ref()).to_string()),
        _ => None,
    }
}

fn start_node(
    reader: &NsReader<&[u8]>,
    namespace: Option<String>,
    e: &BytesStart<'_>,
) -> Result<Node> {
    let local = String::from_utf8_lossy(e.local_name().as_ref()).to_string();

    let mut node = Node::new(QName { namespace, local });
    for attr in e.attributes() {
        let attr = attr.map_err(|e| NetconfError::Xml(e.to_string()))?;
        // xmlns declarations are namespace plumbing, not data
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (attr_ns, attr_local) = reader.resolve_attribute(attr.key);
        let attr_namespace = bound_namespace(attr_ns);
        let value = attr
            .unescape_value()
            .map_err(|e| NetconfError::Xml(e.to_string()))?
            .to_string();
        node.attributes.push(Attribute {
            name: QName {
                namespace: attr_namespace,
                local: String::from_utf8_lossy(attr_local.as_ref()).to_string(),
            },
            value,
        });
    }
    Ok(node)
}

fn attach(stack: &mut Vec<Node>, root: &mut Option<Node>, mut node: Node) -> Result<()> {
    // keep the leaf-only-value invariant
    if !node.children.is_empty() {
        node.value = None;
    }
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(NetconfError::Xml(
                    "document has more than one root element".to_string(),
                ));
            }
            *root = Some(node);
            Ok(())
        }
    }
}

fn append_text(node: &mut Node, text: &str) {
    match &mut node.value {
        Some(existing) => existing.push_str(text),
        None => node.value = Some(text.to_string()),
    }
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    node: &Node,
    inherited_ns: Option<&str>,
) -> Result<()> {
    let own_ns = node.name.namespace.as_deref();

    // namespaced attributes need generated prefixes; build the final
    // name/value list up front so the event can borrow from it
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut prefixed = 0usize;
    for attr in &node.attributes {
        match &attr.name.namespace {
            Some(ns) => {
                let prefix = format!("p{prefixed}");
                prefixed += 1;
                attrs.push((format!("xmlns:{prefix}"), ns.clone()));
                attrs.push((format!("{prefix}:{}", attr.name.local), attr.value.clone()));
            }
            None => attrs.push((attr.name.local.clone(), attr.value.clone())),
        }
    }

    let mut start = BytesStart::new(node.name.local.as_str());
    if own_ns != inherited_ns {
        start.push_attribute(("xmlns", own_ns.unwrap_or("")));
    }
    for (name, value) in &attrs {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    if node.children.is_empty() && node.value.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(value) = &node.value {
        writer.write_event(Event::Text(BytesText::new(value)))?;
    }
    for child in &node.children {
        write_node(writer, child, own_ns)?;
    }
    writer.write_event(Event::End(BytesEnd::new(node.name.local.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_tree() {
        let xml = r#"<top xmlns="urn:example:cfg"><users><user><name>fred</name></user></users></top>"#;
        let tree = Node::from_xml(xml).unwrap();

        assert_eq!(tree.name, QName::new("urn:example:cfg", "top"));
        let users = tree.child("urn:example:cfg", "users").unwrap();
        let user = users.child("urn:example:cfg", "user").unwrap();
        let name = user.child("urn:example:cfg", "name").unwrap();
        assert_eq!(name.text(), Some("fred"));
    }

    #[test]
    fn test_parse_attributes_skip_xmlns() {
        let xml = r#"<filter xmlns="urn:a" type="subtree"/>"#;
        let tree = Node::from_xml(xml).unwrap();

        assert_eq!(tree.attributes.len(), 1);
        assert_eq!(tree.attributes[0].name, QName::unqualified("type"));
        assert_eq!(tree.attributes[0].value, "subtree");
    }

    #[test]
    fn test_roundtrip() {
        let tree = Node::new(QName::new("urn:example:cfg", "top"))
            .with_child(
                Node::new(QName::new("urn:example:cfg", "name")).with_value("alpha"),
            )
            .with_child(Node::new(QName::new("urn:example:cfg", "enabled")));

        let xml = tree.to_xml().unwrap();
        let parsed = Node::from_xml(&xml).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_namespace_change_emits_declaration() {
        let tree = Node::new(QName::new("urn:a", "outer"))
            .with_child(Node::new(QName::new("urn:b", "inner")).with_value("x"));

        let xml = tree.to_xml().unwrap();
        assert!(xml.contains(r#"<outer xmlns="urn:a""#));
        assert!(xml.contains(r#"<inner xmlns="urn:b""#));

        let parsed = Node::from_xml(&xml).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_multiple_roots_rejected() {
        assert!(Node::from_xml("<a/><b/>").is_err());
    }

    #[test]
    fn test_escaped_text_roundtrip() {
        let tree = Node::new(QName::unqualified("v")).with_value("a < b & c");
        let xml = tree.to_xml().unwrap();
        let parsed = Node::from_xml(&xml).unwrap();
        assert_eq!(parsed.value.as_deref(), Some("a < b & c"));
    }
}
