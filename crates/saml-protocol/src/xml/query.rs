//! Namespace-aware path lookups over a [`Element`] tree.
//!
//! Paths are `/`-separated qualified names relative to a context element,
//! optionally ending in `@Attribute`: `saml:Subject/saml:NameID/@Format`.
//! Prefixes in a path resolve through the context's registrations, never
//! through the prefixes the document happens to use.

use super::node::Element;
use crate::error::{SamlError, SamlResult};
use crate::types::{Namespace, DS, SAML, SAMLP};

/// Registered prefixes for path lookups.
#[derive(Debug, Clone)]
pub struct QueryContext {
    namespaces: Vec<Namespace>,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryContext {
    /// Creates a context with `saml`, `samlp` and `ds` registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            namespaces: vec![SAML, SAMLP, DS],
        }
    }

    /// Registers another prefix.
    #[must_use]
    pub fn with_namespace(mut self, ns: Namespace) -> Self {
        self.namespaces.push(ns);
        self
    }

    fn resolve_step<'p>(&self, step: &'p str) -> SamlResult<(&'static str, &'p str)> {
        let (prefix, local) = step.split_once(':').ok_or_else(|| {
            SamlError::Config(format!("path step {step} has no namespace prefix"))
        })?;
        let ns = self
            .namespaces
            .iter()
            .find(|ns| ns.prefix == prefix)
            .ok_or_else(|| SamlError::Config(format!("unregistered query prefix: {prefix}")))?;
        Ok((ns.uri, local))
    }

    /// Returns the first element reached by `path` from `from`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the path uses an unregistered prefix.
    pub fn element<'a>(&self, from: &'a Element, path: &str) -> SamlResult<Option<&'a Element>> {
        let mut current = from;
        for step in path.split('/').filter(|s| !s.is_empty()) {
            let (uri, local) = self.resolve_step(step)?;
            match current.child(uri, local) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Returns every element matching the last step of `path`, in document
    /// order, under the first match of the preceding steps.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the path uses an unregistered prefix.
    pub fn elements<'a>(&self, from: &'a Element, path: &str) -> SamlResult<Vec<&'a Element>> {
        let (parent_path, last) = match path.rsplit_once('/') {
            Some((parent, last)) => (parent, last),
            None => ("", path),
        };
        let Some(parent) = self.element(from, parent_path)? else {
            return Ok(Vec::new());
        };
        let (uri, local) = self.resolve_step(last)?;
        Ok(parent.elements().filter(|e| e.is(uri, local)).collect())
    }

    /// Returns the attribute value or text content reached by `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the path uses an unregistered prefix.
    pub fn value(&self, from: &Element, path: &str) -> SamlResult<Option<String>> {
        let (element_path, attribute) = match path.rsplit_once('@') {
            Some((element_path, attribute)) => (element_path.trim_end_matches('/'), Some(attribute)),
            None => (path, None),
        };
        let Some(element) = self.element(from, element_path)? else {
            return Ok(None);
        };
        Ok(match attribute {
            Some(name) => element.attribute(name).map(str::to_string),
            None => Some(element.text()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    const DOC: &str = r#"<p:Response xmlns:p="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:a="urn:oasis:names:tc:SAML:2.0:assertion" ID="_r"><a:Issuer>idp</a:Issuer><p:Status><p:StatusCode Value="ok"/></p:Status><a:Assertion><a:AttributeStatement><a:Attribute Name="x"/><a:Attribute Name="y"/></a:AttributeStatement></a:Assertion></p:Response>"#;

    #[test]
    fn lookups_use_registered_prefixes() {
        let doc = parse(DOC).unwrap();
        let ctx = QueryContext::new();

        assert_eq!(ctx.value(&doc.root, "saml:Issuer").unwrap().as_deref(), Some("idp"));
        assert_eq!(
            ctx.value(&doc.root, "samlp:Status/samlp:StatusCode/@Value").unwrap().as_deref(),
            Some("ok")
        );
        assert_eq!(ctx.value(&doc.root, "@ID").unwrap().as_deref(), Some("_r"));
        assert_eq!(ctx.value(&doc.root, "samlp:Issuer").unwrap(), None);
    }

    #[test]
    fn elements_collects_siblings() {
        let doc = parse(DOC).unwrap();
        let ctx = QueryContext::new();
        let attrs = ctx
            .elements(&doc.root, "saml:Assertion/saml:AttributeStatement/saml:Attribute")
            .unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[1].attribute("Name"), Some("y"));
    }

    #[test]
    fn unregistered_prefix_is_an_error() {
        let doc = parse(DOC).unwrap();
        assert!(QueryContext::new().value(&doc.root, "md:EntityDescriptor").is_err());
    }
}
