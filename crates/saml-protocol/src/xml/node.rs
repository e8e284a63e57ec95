//! Owned XML tree.
//!
//! Every element and attribute carries its resolved namespace URI next to
//! the prefix it was written with, so lookups and canonicalization never
//! need to walk back up the tree.

use crate::types::Namespace;

/// Namespace URI reserved for the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A namespace declaration (`xmlns` or `xmlns:prefix`) written on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Declared prefix; `None` for the default namespace.
    pub prefix: Option<String>,
    /// Bound URI; empty when the default namespace is undeclared.
    pub uri: String,
}

/// An attribute other than a namespace declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Prefix as written.
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
    /// Resolved namespace URI; unprefixed attributes have none.
    pub namespace: Option<String>,
    /// Unescaped value.
    pub value: String,
}

/// Child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Character data, unescaped.
    Text(String),
}

/// An element with its declarations, attributes and children in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Prefix as written.
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
    /// Resolved namespace URI.
    pub namespace: Option<String>,
    /// Declarations written on this element.
    pub namespaces: Vec<NamespaceDecl>,
    /// Attributes in document order.
    pub attributes: Vec<Attribute>,
    /// Children in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an element in a well-known namespace, written with its
    /// conventional prefix.
    #[must_use]
    pub fn new(ns: Namespace, name: impl Into<String>) -> Self {
        Self {
            prefix: Some(ns.prefix.to_string()),
            name: name.into(),
            namespace: Some(ns.uri.to_string()),
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the qualified name as written.
    #[must_use]
    pub fn qname(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Returns true if this element has the given namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Declares a namespace on this element.
    #[must_use]
    pub fn with_namespace(mut self, ns: Namespace) -> Self {
        self.declare(ns);
        self
    }

    /// Declares a namespace on this element unless it already is.
    pub fn declare(&mut self, ns: Namespace) {
        let already = self
            .namespaces
            .iter()
            .any(|d| d.prefix.as_deref() == Some(ns.prefix));
        if !already {
            self.namespaces.push(NamespaceDecl {
                prefix: Some(ns.prefix.to_string()),
                uri: ns.uri.to_string(),
            });
        }
    }

    /// Sets an unprefixed attribute, replacing an existing value.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.prefix.is_none() && a.name == name)
        {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                prefix: None,
                name: name.to_string(),
                namespace: None,
                value,
            }),
        }
    }

    /// Builder form of [`Element::set_attribute`].
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Adds a namespaced attribute.
    pub fn push_prefixed_attribute(
        &mut self,
        prefix: &str,
        namespace: &str,
        name: &str,
        value: impl Into<String>,
    ) {
        self.attributes.push(Attribute {
            prefix: Some(prefix.to_string()),
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
            value: value.into(),
        });
    }

    /// Returns the value of an unprefixed attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns the value of a namespaced attribute.
    #[must_use]
    pub fn attribute_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace.as_deref() == Some(namespace))
            .map(|a| a.value.as_str())
    }

    /// Appends a child element.
    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Builder form of [`Element::push`].
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    /// Appends character data.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Iterates over child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Returns the first child element with the given namespace and name.
    #[must_use]
    pub fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(namespace, name))
    }

    /// Returns the first child element with the given namespace and name,
    /// mutably.
    pub fn child_mut(&mut self, namespace: &str, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.is(namespace, name) => Some(e),
            _ => None,
        })
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Returns the concatenated text content of this element and its
    /// descendants.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Removes the first direct child element matching `pred` and returns it
    /// with its position in `children`.
    pub fn take_child(&mut self, pred: impl Fn(&Element) -> bool) -> Option<(usize, Element)> {
        let index = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if pred(e)))?;
        match self.children.remove(index) {
            Node::Element(e) => Some((index, e)),
            Node::Text(_) => None,
        }
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

/// A parsed or built document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The document element.
    pub root: Element,
}

impl Document {
    /// Wraps a root element.
    #[must_use]
    pub const fn new(root: Element) -> Self {
        Self { root }
    }
}
