//! Parses XML text into a [`Document`].
//!
//! Document type declarations are refused outright, which closes off entity
//! expansion attacks. Comments and processing instructions are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::node::{Attribute, Document, Element, NamespaceDecl, Node, XML_NAMESPACE};
use crate::error::{SamlError, SamlResult};

/// Parses a complete document.
///
/// # Errors
///
/// Returns [`SamlError::DecodeFailed`] for malformed XML, a DTD, an unbound
/// prefix, or content outside the document element.
pub fn parse(xml: &str) -> SamlResult<Document> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut scopes: Vec<Vec<NamespaceDecl>> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                check_single_root(&root)?;
                let element = start_element(&e, &mut scopes)?;
                stack.push(element);
            }
            Event::Empty(e) => {
                check_single_root(&root)?;
                let element = start_element(&e, &mut scopes)?;
                scopes.pop();
                attach(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                scopes.pop();
                let element = stack
                    .pop()
                    .ok_or_else(|| SamlError::DecodeFailed("unexpected end tag".to_string()))?;
                attach(element, &mut stack, &mut root);
            }
            Event::Text(t) => {
                let text = t.unescape()?.replace("\r\n", "\n");
                push_text(text, &mut stack)?;
            }
            Event::CData(c) => {
                let text = String::from_utf8(c.into_inner().into_owned())
                    .map_err(|e| SamlError::DecodeFailed(format!("invalid UTF-8 in CDATA: {e}")))?;
                push_text(text, &mut stack)?;
            }
            Event::DocType(_) => {
                return Err(SamlError::DecodeFailed(
                    "document type declarations are not allowed".to_string(),
                ));
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(SamlError::DecodeFailed("unclosed element".to_string()));
    }
    root.map(Document::new)
        .ok_or_else(|| SamlError::DecodeFailed("no document element".to_string()))
}

fn check_single_root(root: &Option<Element>) -> SamlResult<()> {
    if root.is_some() {
        return Err(SamlError::DecodeFailed(
            "content after the document element".to_string(),
        ));
    }
    Ok(())
}

fn attach(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

fn push_text(text: String, stack: &mut [Element]) -> SamlResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            match parent.children.last_mut() {
                Some(Node::Text(prev)) => prev.push_str(&text),
                _ => parent.children.push(Node::Text(text)),
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(SamlError::DecodeFailed(
            "text outside the document element".to_string(),
        )),
    }
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

fn utf8(bytes: &[u8]) -> SamlResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| SamlError::DecodeFailed(format!("invalid UTF-8: {e}")))
}

fn resolve(scopes: &[Vec<NamespaceDecl>], prefix: Option<&str>) -> SamlResult<Option<String>> {
    if prefix == Some("xml") {
        return Ok(Some(XML_NAMESPACE.to_string()));
    }
    let found = scopes
        .iter()
        .rev()
        .flat_map(|scope| scope.iter())
        .find(|decl| decl.prefix.as_deref() == prefix);
    match (found, prefix) {
        (Some(decl), _) if decl.uri.is_empty() => Ok(None),
        (Some(decl), _) => Ok(Some(decl.uri.clone())),
        (None, None) => Ok(None),
        (None, Some(p)) => Err(SamlError::DecodeFailed(format!(
            "unbound namespace prefix: {p}"
        ))),
    }
}

/// Builds an element from a start tag and pushes its declarations as a new
/// scope. The caller pops the scope when the element closes.
fn start_element(e: &BytesStart<'_>, scopes: &mut Vec<Vec<NamespaceDecl>>) -> SamlResult<Element> {
    let mut declarations = Vec::new();
    let mut raw_attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.as_ref())?.to_string();
        let raw = utf8(&attr.value)?.replace(['\t', '\n', '\r'], " ");
        let value = quick_xml::escape::unescape(&raw)
            .map_err(|e| SamlError::DecodeFailed(format!("XML attribute error: {e}")))?
            .into_owned();

        if key == "xmlns" {
            declarations.push(NamespaceDecl { prefix: None, uri: value });
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declarations.push(NamespaceDecl {
                prefix: Some(prefix.to_string()),
                uri: value,
            });
        } else {
            raw_attributes.push((key, value));
        }
    }

    scopes.push(declarations.clone());

    let qname = utf8(e.name().as_ref())?.to_string();
    let (prefix, name) = split_qname(&qname);
    let namespace = resolve(scopes, prefix)?;

    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        let (attr_prefix, attr_name) = split_qname(&key);
        let attr_namespace = match attr_prefix {
            Some(_) => resolve(scopes, attr_prefix)?,
            None => None,
        };
        attributes.push(Attribute {
            prefix: attr_prefix.map(str::to_string),
            name: attr_name.to_string(),
            namespace: attr_namespace,
            value,
        });
    }

    Ok(Element {
        prefix: prefix.map(str::to_string),
        name: name.to_string(),
        namespace,
        namespaces: declarations,
        attributes,
        children: Vec::new(),
    })
}
