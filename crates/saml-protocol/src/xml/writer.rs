//! Serializes a tree back to text exactly as it is held.
//!
//! Declarations and attributes are written in stored order. Empty elements
//! use a start and end tag pair, matching canonical form.

use super::node::{Document, Element, Node};

/// Serializes a document without an XML declaration.
#[must_use]
pub fn to_string(doc: &Document) -> String {
    let mut out = String::new();
    write_element(&doc.root, &mut out);
    out
}

/// Serializes a single element and its subtree.
#[must_use]
pub fn element_to_string(element: &Element) -> String {
    let mut out = String::new();
    write_element(element, &mut out);
    out
}

fn write_element(element: &Element, out: &mut String) {
    let qname = element.qname();
    out.push('<');
    out.push_str(&qname);
    for decl in &element.namespaces {
        match &decl.prefix {
            Some(prefix) => {
                out.push_str(" xmlns:");
                out.push_str(prefix);
            }
            None => out.push_str(" xmlns"),
        }
        out.push_str("=\"");
        escape_attribute(&decl.uri, out);
        out.push('"');
    }
    for attr in &element.attributes {
        out.push(' ');
        if let Some(prefix) = &attr.prefix {
            out.push_str(prefix);
            out.push(':');
        }
        out.push_str(&attr.name);
        out.push_str("=\"");
        escape_attribute(&attr.value, out);
        out.push('"');
    }
    out.push('>');
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(e, out),
            Node::Text(t) => escape_text(t, out),
        }
    }
    out.push_str("</");
    out.push_str(&qname);
    out.push('>');
}

/// Escapes character data the way canonical XML does.
pub(crate) fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
}

/// Escapes an attribute value the way canonical XML does.
pub(crate) fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SAML, SAMLP};
    use crate::xml::parse;

    #[test]
    fn writes_declarations_attributes_and_escapes() {
        let root = Element::new(SAMLP, "Response")
            .with_namespace(SAMLP)
            .with_namespace(SAML)
            .with_attribute("ID", "_1")
            .with_attribute("Note", "a\"b<c&\n")
            .with_child(Element::new(SAML, "Issuer").with_text("x > y & z"))
            .with_child(Element::new(SAMLP, "Status"));

        assert_eq!(
            element_to_string(&root),
            "<samlp:Response xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\" \
             xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" ID=\"_1\" \
             Note=\"a&quot;b&lt;c&amp;&#xA;\"><saml:Issuer>x &gt; y &amp; z</saml:Issuer>\
             <samlp:Status></samlp:Status></samlp:Response>"
        );
    }

    #[test]
    fn parse_and_write_is_stable() {
        let xml = "<a xmlns=\"urn:x\" b=\"1\"><c>t&amp;u</c>\n</a>";
        let doc = parse(xml).unwrap();
        assert_eq!(to_string(&doc), xml);
    }
}
