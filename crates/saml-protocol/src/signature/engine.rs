//! The XML security engine seam.
//!
//! The adapter in [`super::XmlSigner`] and [`super::SignatureVerifier`]
//! decides what may be signed and with which algorithms; an
//! [`XmlSecEngine`] does the canonicalization and cryptography. The default
//! [`NativeEngine`] works on the in-crate XML tree with RSA keys from
//! `saml-crypto`.

use base64::Engine as _;
use saml_crypto::{sha1_base64, SigningKey, VerifyingKey};

use super::{algorithms, CanonicalizationMethod, DigestMethod, SignatureMethod, SignatureTemplate};
use crate::error::{SamlError, SamlResult};
use crate::types::{DS, EXC_C14N};
use crate::xml::{canonicalize, C14nMode, Document, Element, InclusivePrefixes, NamespaceDecl, Node};

/// Canonicalization, signing and verification over an XML tree.
pub trait XmlSecEngine: Send + Sync + std::fmt::Debug {
    /// Canonicalizes `element`; `inherited` holds ancestor declarations.
    fn canonicalize(&self, element: &Element, inherited: &[NamespaceDecl], mode: &C14nMode) -> String;

    /// Fills in the digest and signature values of the template already
    /// injected as a direct child of `root`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureCreation`] if the template is missing or
    /// the key fails to sign.
    fn sign(&self, root: &mut Element, key: &SigningKey, template: &SignatureTemplate) -> SamlResult<()>;

    /// Verifies the root signature of `doc`.
    ///
    /// With a non-empty `trusted` list only those keys are tried; otherwise
    /// the key material embedded in `KeyInfo` is used.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::NoSignaturePresent`] or
    /// [`SamlError::SignatureInvalid`].
    fn verify(&self, doc: &Document, trusted: &[VerifyingKey]) -> SamlResult<()>;
}

/// Engine backed by the in-crate canonicalizer and `saml-crypto` RSA keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

fn invalid(reason: impl Into<String>) -> SamlError {
    SamlError::SignatureInvalid(reason.into())
}

fn is_signature(element: &Element) -> bool {
    element.is(DS.uri, "Signature")
}

fn contains_signature(element: &Element) -> bool {
    element
        .elements()
        .any(|e| is_signature(e) || contains_signature(e))
}

/// Returns the index in `root.children` of the signature that is a direct
/// child of `root`.
///
/// # Errors
///
/// Returns [`SamlError::NoSignaturePresent`] when no direct child is a
/// signature, even if nested elements carry one, and
/// [`SamlError::SignatureInvalid`] when more than one is.
pub fn locate_signature(root: &Element) -> SamlResult<usize> {
    let mut found = root
        .children
        .iter()
        .enumerate()
        .filter(|(_, n)| matches!(n, Node::Element(e) if is_signature(e)))
        .map(|(i, _)| i);
    match (found.next(), found.next()) {
        (Some(index), None) => Ok(index),
        (Some(_), Some(_)) => Err(invalid("more than one signature on the document element")),
        (None, _) => {
            if contains_signature(root) {
                tracing::debug!("only nested signatures present, none covers the document element");
            }
            Err(SamlError::NoSignaturePresent)
        }
    }
}

/// Applies the enveloped-signature transform: `root` without the signature
/// child at `index`.
fn enveloped(root: &Element, index: usize) -> Element {
    let mut content = root.clone();
    content.children.remove(index);
    content
}

fn signature_at(root: &Element, index: usize) -> SamlResult<&Element> {
    match root.children.get(index) {
        Some(Node::Element(e)) => Ok(e),
        _ => Err(invalid("signature element not found")),
    }
}

fn inclusive_prefixes(method: &Element) -> InclusivePrefixes {
    method
        .child(EXC_C14N.uri, "InclusiveNamespaces")
        .and_then(|e| e.attribute("PrefixList"))
        .map(InclusivePrefixes::parse)
        .unwrap_or_default()
}

fn decode_base64(text: &str, what: &str) -> SamlResult<Vec<u8>> {
    let compact: String = text.split_whitespace().collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| invalid(format!("{what} is not valid base64: {e}")))
}

fn ds_child<'a>(parent: &'a Element, name: &str) -> SamlResult<&'a Element> {
    parent
        .child(DS.uri, name)
        .ok_or_else(|| invalid(format!("missing ds:{name}")))
}

fn algorithm(element: &Element) -> &str {
    element.attribute("Algorithm").unwrap_or_default()
}

/// Reference processing decided by the received `Transforms`.
fn reference_mode(reference: &Element) -> SamlResult<C14nMode> {
    let transforms: Vec<&Element> = reference
        .child(DS.uri, "Transforms")
        .map(|t| t.elements().filter(|e| e.is(DS.uri, "Transform")).collect())
        .unwrap_or_default();
    match transforms.as_slice() {
        // A node-set result is converted with inclusive C14N.
        [only] if algorithm(only) == algorithms::ENVELOPED => Ok(C14nMode::Inclusive),
        [first, second]
            if algorithm(first) == algorithms::ENVELOPED
                && algorithm(second) == algorithms::EXC_C14N =>
        {
            Ok(C14nMode::Exclusive(inclusive_prefixes(second)))
        }
        _ => Err(invalid("transform chain is not accepted")),
    }
}

fn embedded_keys(signature: &Element) -> Vec<VerifyingKey> {
    let mut keys = Vec::new();
    let Some(key_info) = signature.child(DS.uri, "KeyInfo") else {
        return keys;
    };
    for data in key_info.elements().filter(|e| e.is(DS.uri, "X509Data")) {
        for cert in data.elements().filter(|e| e.is(DS.uri, "X509Certificate")) {
            let key = decode_base64(&cert.text(), "X509Certificate")
                .ok()
                .and_then(|der| VerifyingKey::from_certificate_der(&der).ok());
            keys.extend(key);
        }
    }
    for value in key_info.elements().filter(|e| e.is(DS.uri, "KeyValue")) {
        if let Some(rsa) = value.child(DS.uri, "RSAKeyValue") {
            let modulus = rsa.child(DS.uri, "Modulus").map(Element::text);
            let exponent = rsa.child(DS.uri, "Exponent").map(Element::text);
            if let (Some(m), Some(e)) = (modulus, exponent) {
                let key = decode_base64(&m, "Modulus")
                    .and_then(|m| Ok((m, decode_base64(&e, "Exponent")?)))
                    .ok()
                    .and_then(|(m, e)| VerifyingKey::from_components(&m, &e).ok());
                keys.extend(key);
            }
        }
    }
    keys
}

impl XmlSecEngine for NativeEngine {
    fn canonicalize(&self, element: &Element, inherited: &[NamespaceDecl], mode: &C14nMode) -> String {
        canonicalize(element, inherited, mode)
    }

    fn sign(&self, root: &mut Element, key: &SigningKey, template: &SignatureTemplate) -> SamlResult<()> {
        if template.signature_method != SignatureMethod::RsaSha1 {
            return Err(SamlError::UnsupportedKeyType(format!(
                "{} key cannot produce {}",
                key.key_type().name(),
                template.signature_method.uri()
            )));
        }
        let index = locate_signature(root)
            .map_err(|_| SamlError::SignatureCreation("signature template is not in place".to_string()))?;

        let content = enveloped(root, index);
        let digest = sha1_base64(self.canonicalize(&content, &[], &C14nMode::default()).as_bytes());

        let mut inherited = root.namespaces.clone();
        let Some(Node::Element(signature)) = root.children.get_mut(index) else {
            return Err(SamlError::SignatureCreation("signature template is not in place".to_string()));
        };
        inherited.extend(signature.namespaces.iter().cloned());

        let missing = |name: &str| SamlError::SignatureCreation(format!("template has no ds:{name}"));
        let signed_info = signature
            .child_mut(DS.uri, "SignedInfo")
            .ok_or_else(|| missing("SignedInfo"))?;
        signed_info
            .child_mut(DS.uri, "Reference")
            .and_then(|r| r.child_mut(DS.uri, "DigestValue"))
            .ok_or_else(|| missing("DigestValue"))?
            .set_text(digest);

        let canonical_signed_info = self.canonicalize(signed_info, &inherited, &C14nMode::default());
        let value = key.sign_sha1(canonical_signed_info.as_bytes())?;
        signature
            .child_mut(DS.uri, "SignatureValue")
            .ok_or_else(|| missing("SignatureValue"))?
            .set_text(base64::engine::general_purpose::STANDARD.encode(value));
        Ok(())
    }

    fn verify(&self, doc: &Document, trusted: &[VerifyingKey]) -> SamlResult<()> {
        let root = &doc.root;
        let index = locate_signature(root)?;
        let signature = signature_at(root, index)?;
        let signed_info = ds_child(signature, "SignedInfo")?;

        let c14n_method = ds_child(signed_info, "CanonicalizationMethod")?;
        if CanonicalizationMethod::from_uri(algorithm(c14n_method)).is_none() {
            return Err(invalid(format!(
                "canonicalization method not accepted: {}",
                algorithm(c14n_method)
            )));
        }
        let signed_info_mode = C14nMode::Exclusive(inclusive_prefixes(c14n_method));

        match SignatureMethod::from_uri(algorithm(ds_child(signed_info, "SignatureMethod")?)) {
            Some(SignatureMethod::RsaSha1) => {}
            Some(SignatureMethod::DsaSha1) => {
                return Err(invalid("DSA signatures cannot be verified by this engine"));
            }
            None => return Err(invalid("signature method not accepted")),
        }

        let mut references = signed_info.elements().filter(|e| e.is(DS.uri, "Reference"));
        let reference = match (references.next(), references.next()) {
            (Some(r), None) => r,
            _ => return Err(invalid("exactly one reference is required")),
        };
        let uri = reference.attribute("URI").unwrap_or_default();
        let covers_root = uri.is_empty()
            || uri
                .strip_prefix('#')
                .is_some_and(|id| root.attribute("ID") == Some(id));
        if !covers_root {
            return Err(invalid(format!("reference {uri} does not cover the document element")));
        }

        let reference_mode = reference_mode(reference)?;
        if DigestMethod::from_uri(algorithm(ds_child(reference, "DigestMethod")?)).is_none() {
            return Err(invalid("digest method not accepted"));
        }
        let expected_digest = decode_base64(&ds_child(reference, "DigestValue")?.text(), "DigestValue")?;

        let content = enveloped(root, index);
        let actual_digest = saml_crypto::sha1(self.canonicalize(&content, &[], &reference_mode).as_bytes());
        if actual_digest != expected_digest {
            return Err(invalid("digest mismatch"));
        }

        let mut inherited = root.namespaces.clone();
        inherited.extend(signature.namespaces.iter().cloned());
        let canonical_signed_info = self.canonicalize(signed_info, &inherited, &signed_info_mode);
        let signature_value = decode_base64(&ds_child(signature, "SignatureValue")?.text(), "SignatureValue")?;

        let embedded;
        let keys: &[VerifyingKey] = if trusted.is_empty() {
            embedded = embedded_keys(signature);
            &embedded
        } else {
            trusted
        };
        if keys.is_empty() {
            return Err(invalid("no usable verification key"));
        }
        if keys
            .iter()
            .any(|k| k.verify_sha1(canonical_signed_info.as_bytes(), &signature_value).is_ok())
        {
            Ok(())
        } else {
            Err(invalid("signature value does not verify"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    #[test]
    fn locate_requires_direct_child() {
        let nested = parse(concat!(
            r#"<r xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><a><ds:Signature/></a></r>"#
        ))
        .unwrap();
        assert!(matches!(
            locate_signature(&nested.root),
            Err(SamlError::NoSignaturePresent)
        ));

        let direct = parse(concat!(
            r#"<r xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><a/><ds:Signature/></r>"#
        ))
        .unwrap();
        assert_eq!(locate_signature(&direct.root).unwrap(), 1);

        let double = parse(concat!(
            r#"<r xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:Signature/><ds:Signature/></r>"#
        ))
        .unwrap();
        assert!(matches!(
            locate_signature(&double.root),
            Err(SamlError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn transform_chains() {
        let doc = parse(concat!(
            r#"<ds:Reference xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:ec="http://www.w3.org/2001/10/xml-exc-c14n#"><ds:Transforms>"#,
            r#"<ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>"#,
            r#"<ds:Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"><ec:InclusiveNamespaces PrefixList="xs"/></ds:Transform>"#,
            r#"</ds:Transforms></ds:Reference>"#
        ))
        .unwrap();
        assert_eq!(
            reference_mode(&doc.root).unwrap(),
            C14nMode::Exclusive(InclusivePrefixes::parse("xs"))
        );

        let xslt = parse(concat!(
            r#"<ds:Reference xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:Transforms>"#,
            r#"<ds:Transform Algorithm="http://www.w3.org/TR/1999/REC-xslt-19991116"/>"#,
            r#"</ds:Transforms></ds:Reference>"#
        ))
        .unwrap();
        assert!(reference_mode(&xslt.root).is_err());
    }

    #[test]
    fn externally_signed_document_verifies() {
        // Digest and signature computed with openssl over the hand-written
        // canonical forms of the content and of SignedInfo.
        let xml = concat!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_ext">"#,
            r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo>"#,
            r#"<ds:CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"></ds:CanonicalizationMethod>"#,
            r#"<ds:SignatureMethod Algorithm="http://www.w3.org/2000/09/xmldsig#rsa-sha1"></ds:SignatureMethod>"#,
            r##"<ds:Reference URI="#_ext"><ds:Transforms>"##,
            r#"<ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"></ds:Transform>"#,
            r#"<ds:Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"></ds:Transform>"#,
            r#"</ds:Transforms><ds:DigestMethod Algorithm="http://www.w3.org/2000/09/xmldsig#sha1"></ds:DigestMethod>"#,
            r#"<ds:DigestValue>vqzyX7GvUpOuaxWEBN7PHCEv8lo=</ds:DigestValue></ds:Reference></ds:SignedInfo>"#,
            r#"<ds:SignatureValue>bT0bj6Mws43iHXQEsOg7XEwy9/A6SE5cygaAEQaLkOfi41de0dUCc8GsdMeAEQHmHstul8W1ZtAxwovgk2iGQ2r16uC69G+6E+UJDoAZvbfgXiLIIEWIiZXNUVj62UkOsGqxtewfXaYw4cHHEiPOGyBZV45tM0CaHWvg1yXox1KATkdLX6Wmm0lISv1JPHND4gQCynNsyvSTc133iISBQURLMKJki37ybx1zEA6yDq2UYMqRa3g5aB+5/6NLXkKP6mHAheDKCRhbIPRqpxrRNqmvYxs89ZyETE7d+I+2j2FXUszB/lxP2gnfwTw9IiXcyKsd+eyhiGJfYSHvhgqBoA==</ds:SignatureValue>"#,
            r#"</ds:Signature><samlp:Status/></samlp:Response>"#
        );
        let doc = parse(xml).unwrap();
        let cert = include_str!("../../../saml-crypto/testdata/sp-cert.pem");
        let trusted = [VerifyingKey::from_certificate_pem(cert).unwrap()];
        NativeEngine.verify(&doc, &trusted).unwrap();

        // No KeyInfo and nothing trusted.
        assert!(matches!(
            NativeEngine.verify(&doc, &[]),
            Err(SamlError::SignatureInvalid(_))
        ));

        let edited = parse(&xml.replace("<samlp:Status/>", "<samlp:Status></samlp:Status><x/>")).unwrap();
        assert!(NativeEngine.verify(&edited, &trusted).is_err());
    }
}
