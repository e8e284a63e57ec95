//! XML Canonicalization 1.0 without comments, exclusive and inclusive.
//!
//! Output has no XML declaration, declarations sorted with the default
//! namespace first, attributes sorted by namespace URI then local name, and
//! empty elements as start/end pairs. The exclusive form renders a namespace
//! only where its prefix is visibly utilized; the inclusive form renders
//! every in-scope namespace. Neither repeats a binding already rendered by an
//! output ancestor.

use std::collections::BTreeMap;

use super::node::{Element, NamespaceDecl, Node};
use super::writer::{escape_attribute, escape_text};

/// Prefix token that names the default namespace in a `PrefixList`.
const DEFAULT_PREFIX_TOKEN: &str = "#default";

/// Namespace prefixes to treat as in inclusive canonicalization
/// (`ec:InclusiveNamespaces/@PrefixList`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InclusivePrefixes(Vec<Option<String>>);

impl InclusivePrefixes {
    /// Parses a whitespace separated `PrefixList`.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        Self(
            list.split_whitespace()
                .map(|p| (p != DEFAULT_PREFIX_TOKEN).then(|| p.to_string()))
                .collect(),
        )
    }

    /// Returns true if no prefixes are listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Canonicalization flavour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum C14nMode {
    /// Exclusive canonicalization with an optional inclusive prefix list.
    Exclusive(InclusivePrefixes),
    /// Inclusive canonicalization.
    Inclusive,
}

impl Default for C14nMode {
    fn default() -> Self {
        Self::Exclusive(InclusivePrefixes::default())
    }
}

type Rendered = BTreeMap<Option<String>, String>;

/// Canonicalizes `element` as an apex node.
///
/// `inherited` holds the namespace declarations in scope from ancestors of
/// `element`, outermost first. Exclusive mode consults them only for
/// prefixes on the inclusive list.
#[must_use]
pub fn canonicalize(element: &Element, inherited: &[NamespaceDecl], mode: &C14nMode) -> String {
    let mut out = String::new();
    let rendered = Rendered::new();
    let mut scope: Vec<NamespaceDecl> = inherited.to_vec();
    write_element(element, &rendered, &mut scope, mode, &mut out);
    out
}

fn lookup<'a>(scope: &'a [NamespaceDecl], prefix: Option<&str>) -> Option<&'a str> {
    scope
        .iter()
        .rev()
        .find(|d| d.prefix.as_deref() == prefix)
        .map(|d| d.uri.as_str())
}

fn write_element(
    element: &Element,
    rendered: &Rendered,
    scope: &mut Vec<NamespaceDecl>,
    mode: &C14nMode,
    out: &mut String,
) {
    let scope_len = scope.len();
    scope.extend(element.namespaces.iter().cloned());

    let mut utilized: Vec<(Option<String>, String)> = Vec::new();
    match mode {
        C14nMode::Exclusive(inclusive) => {
            utilized.push((
                element.prefix.clone(),
                element.namespace.clone().unwrap_or_default(),
            ));
            for attr in &element.attributes {
                if let (Some(prefix), Some(ns)) = (&attr.prefix, &attr.namespace) {
                    utilized.push((Some(prefix.clone()), ns.clone()));
                }
            }
            for prefix in &inclusive.0 {
                if let Some(uri) = lookup(scope, prefix.as_deref()) {
                    utilized.push((prefix.clone(), uri.to_string()));
                }
            }
        }
        C14nMode::Inclusive => {
            // Later declarations shadow earlier ones with the same prefix.
            let mut in_scope: BTreeMap<Option<String>, String> = BTreeMap::new();
            for decl in scope.iter() {
                in_scope.insert(decl.prefix.clone(), decl.uri.clone());
            }
            utilized.extend(in_scope);
        }
    }

    let mut emit: BTreeMap<Option<String>, String> = BTreeMap::new();
    for (prefix, uri) in utilized {
        if prefix.as_deref() == Some("xml") {
            continue;
        }
        let current = rendered.get(&prefix).map_or("", String::as_str);
        if current != uri {
            emit.insert(prefix, uri);
        }
    }

    let qname = element.qname();
    out.push('<');
    out.push_str(&qname);
    for (prefix, uri) in &emit {
        match prefix {
            Some(p) => {
                out.push_str(" xmlns:");
                out.push_str(p);
            }
            None => out.push_str(" xmlns"),
        }
        out.push_str("=\"");
        escape_attribute(uri, out);
        out.push('"');
    }

    let mut attributes: Vec<_> = element.attributes.iter().collect();
    attributes.sort_by(|a, b| {
        let a_ns = a.namespace.as_deref().unwrap_or("");
        let b_ns = b.namespace.as_deref().unwrap_or("");
        a_ns.cmp(b_ns).then_with(|| a.name.cmp(&b.name))
    });
    for attr in attributes {
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

    let child_rendered = if emit.is_empty() {
        None
    } else {
        let mut next = rendered.clone();
        next.extend(emit);
        Some(next)
    };
    let child_rendered = child_rendered.as_ref().unwrap_or(rendered);

    for child in &element.children {
        match child {
            Node::Element(e) => write_element(e, child_rendered, scope, mode, out),
            Node::Text(t) => escape_text(t, out),
        }
    }

    out.push_str("</");
    out.push_str(&qname);
    out.push('>');
    scope.truncate(scope_len);
}
