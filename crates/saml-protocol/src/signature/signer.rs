//! Enveloped signature creation.
//!
//! The signer injects a `ds:Signature` template into the element, attaches
//! the key material, then hands the element to the engine to fill in the
//! digest and signature values.

use std::sync::Arc;

use base64::Engine as _;
use saml_crypto::{KeyType, SigningKey};

use super::{algorithms, engine::XmlSecEngine, NativeEngine, SignatureMethod, SignatureTemplate, SigningState};
use crate::error::{SamlError, SamlResult};
use crate::types::{DS, SAML};
use crate::xml::{self, Element, Node};

/// XML document signer.
///
/// Signs SAML messages with an enveloped signature placed where the schema
/// expects it: right after `saml:Issuer`.
#[derive(Debug, Clone)]
pub struct XmlSigner {
    key: SigningKey,
    template: SignatureTemplate,
    engine: Arc<dyn XmlSecEngine>,
}

impl XmlSigner {
    /// Creates a signer using the default template and engine.
    #[must_use]
    pub fn new(key: SigningKey) -> Self {
        Self {
            key,
            template: SignatureTemplate::default(),
            engine: Arc::new(NativeEngine),
        }
    }

    /// Creates a signer from a PEM private key and optional certificate.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if either PEM block cannot be loaded.
    pub fn from_pem(private_key_pem: &str, certificate_pem: Option<&str>) -> SamlResult<Self> {
        let mut key = SigningKey::from_pem(private_key_pem)?;
        if let Some(pem) = certificate_pem {
            key = key.with_certificate_pem(pem)?;
        }
        Ok(Self::new(key))
    }

    /// Sets the signature template.
    #[must_use]
    pub fn with_template(mut self, template: SignatureTemplate) -> Self {
        self.template = template;
        self
    }

    /// Replaces the engine.
    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn XmlSecEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Returns the signing key.
    #[must_use]
    pub const fn key(&self) -> &SigningKey {
        &self.key
    }

    /// Returns the template in use.
    #[must_use]
    pub const fn template(&self) -> &SignatureTemplate {
        &self.template
    }

    /// Signs `element` in place.
    ///
    /// `reference_id` is written to the reference URI. When non-empty it
    /// must equal the element's `ID` attribute; when empty the reference
    /// covers the whole document (`URI=""`).
    ///
    /// # Errors
    ///
    /// - [`SamlError::UnsupportedKeyType`] if the key cannot produce the
    ///   template's signature method
    /// - [`SamlError::SignatureCreation`] if the element is already signed,
    ///   the reference does not match, or the engine fails
    ///
    /// On error the element is left as it was.
    pub fn sign_element(&self, element: &mut Element, reference_id: &str) -> SamlResult<()> {
        self.check_key()?;

        if element.child(DS.uri, "Signature").is_some() {
            return Err(SamlError::SignatureCreation(
                "element already carries a signature".to_string(),
            ));
        }
        if !reference_id.is_empty() && element.attribute("ID") != Some(reference_id) {
            return Err(SamlError::SignatureCreation(format!(
                "reference {reference_id} does not match the element ID"
            )));
        }

        let mut state = SigningState::Unsigned;
        let position = element
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.is(SAML.uri, "Issuer")))
            .map_or(0, |i| i + 1);
        element
            .children
            .insert(position, Node::Element(self.build_template(reference_id)));
        advance(&mut state, SigningState::TemplateInjected);

        if let Err(err) = self.engine.sign(element, &self.key, &self.template) {
            element.children.remove(position);
            tracing::debug!(error = %err, "signing failed, template removed");
            return Err(err);
        }
        advance(&mut state, SigningState::Signed);
        Ok(())
    }

    /// Parses, signs and re-serializes an XML document.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::DecodeFailed`] if `xml` does not parse, otherwise
    /// the errors of [`XmlSigner::sign_element`].
    pub fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        let mut doc = xml::parse(xml)?;
        self.sign_element(&mut doc.root, reference_id)?;
        Ok(xml::to_string(&doc))
    }

    fn check_key(&self) -> SamlResult<()> {
        match (self.template.signature_method, self.key.key_type()) {
            (SignatureMethod::RsaSha1, KeyType::Rsa) => Ok(()),
            (method, key_type) => Err(SamlError::UnsupportedKeyType(format!(
                "{} key cannot produce {}",
                key_type.name(),
                method.uri()
            ))),
        }
    }

    fn build_template(&self, reference_id: &str) -> Element {
        let uri = if reference_id.is_empty() {
            String::new()
        } else {
            format!("#{reference_id}")
        };
        let algorithm = |name: &str, uri: &str| Element::new(DS, name).with_attribute("Algorithm", uri);

        let transforms = Element::new(DS, "Transforms")
            .with_child(algorithm("Transform", self.template.transform.uri()))
            .with_child(algorithm("Transform", algorithms::EXC_C14N));
        let reference = Element::new(DS, "Reference")
            .with_attribute("URI", uri)
            .with_child(transforms)
            .with_child(algorithm("DigestMethod", self.template.digest_method.uri()))
            .with_child(Element::new(DS, "DigestValue"));
        let signed_info = Element::new(DS, "SignedInfo")
            .with_child(algorithm(
                "CanonicalizationMethod",
                self.template.canonicalization.uri(),
            ))
            .with_child(algorithm("SignatureMethod", self.template.signature_method.uri()))
            .with_child(reference);

        let mut signature = Element::new(DS, "Signature")
            .with_namespace(DS)
            .with_child(signed_info)
            .with_child(Element::new(DS, "SignatureValue"));
        if let Some(key_info) = self.key_info() {
            signature.push(key_info);
        }
        signature
    }

    /// `KeyValue` then `X509Data`, both complete before anything is digested.
    fn key_info(&self) -> Option<Element> {
        let b64 = |bytes: &[u8]| base64::engine::general_purpose::STANDARD.encode(bytes);
        let mut key_info = Element::new(DS, "KeyInfo");

        if self.template.include_key_value {
            let public = self.key.verifying_key();
            let rsa = Element::new(DS, "RSAKeyValue")
                .with_child(Element::new(DS, "Modulus").with_text(b64(&public.modulus())))
                .with_child(Element::new(DS, "Exponent").with_text(b64(&public.exponent())));
            key_info.push(Element::new(DS, "KeyValue").with_child(rsa));
        }
        if self.template.include_x509 {
            if let Some(der) = self.key.certificate_der() {
                key_info.push(
                    Element::new(DS, "X509Data")
                        .with_child(Element::new(DS, "X509Certificate").with_text(b64(der))),
                );
            }
        }

        (!key_info.children.is_empty()).then_some(key_info)
    }
}

fn advance(state: &mut SigningState, next: SigningState) {
    debug_assert!(state.can_advance_to(next));
    tracing::trace!(from = ?state, to = ?next, "signing state");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SignatureVerifier;
    use crate::types::SAMLP;

    const KEY: &str = include_str!("../../../saml-crypto/testdata/sp-key.pem");
    const CERT: &str = include_str!("../../../saml-crypto/testdata/sp-cert.pem");

    fn message() -> Element {
        Element::new(SAMLP, "AuthnRequest")
            .with_namespace(SAMLP)
            .with_namespace(SAML)
            .with_attribute("ID", "_abc")
            .with_child(Element::new(SAML, "Issuer").with_text("https://sp.example.com"))
            .with_child(Element::new(SAMLP, "NameIDPolicy").with_attribute("AllowCreate", "true"))
    }

    #[test]
    fn template_lands_after_issuer() {
        let signer = XmlSigner::from_pem(KEY, Some(CERT)).unwrap();
        let mut root = message();
        signer.sign_element(&mut root, "_abc").unwrap();

        let names: Vec<_> = root.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Issuer", "Signature", "NameIDPolicy"]);

        let signature = root.child(DS.uri, "Signature").unwrap();
        let key_info = signature.child(DS.uri, "KeyInfo").unwrap();
        let parts: Vec<_> = key_info.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(parts, ["KeyValue", "X509Data"]);
        assert!(!signature.child(DS.uri, "SignatureValue").unwrap().text().is_empty());
    }

    #[test]
    fn signature_without_issuer_is_first_child() {
        let signer = XmlSigner::from_pem(KEY, None).unwrap();
        let mut root = Element::new(SAMLP, "Response")
            .with_namespace(SAMLP)
            .with_attribute("ID", "_r")
            .with_child(Element::new(SAMLP, "Status"));
        signer.sign_element(&mut root, "").unwrap();
        assert_eq!(root.elements().next().unwrap().name, "Signature");

        let reference = root
            .child(DS.uri, "Signature")
            .and_then(|s| s.child(DS.uri, "SignedInfo"))
            .and_then(|s| s.child(DS.uri, "Reference"))
            .unwrap();
        assert_eq!(reference.attribute("URI"), Some(""));
    }

    #[test]
    fn re_entry_is_rejected() {
        let signer = XmlSigner::from_pem(KEY, None).unwrap();
        let mut root = message();
        signer.sign_element(&mut root, "_abc").unwrap();
        let signed = root.clone();
        assert!(matches!(
            signer.sign_element(&mut root, "_abc"),
            Err(SamlError::SignatureCreation(_))
        ));
        assert_eq!(root, signed);
    }

    #[test]
    fn reference_must_match_id() {
        let signer = XmlSigner::from_pem(KEY, None).unwrap();
        let mut root = message();
        let before = root.clone();
        assert!(matches!(
            signer.sign_element(&mut root, "_other"),
            Err(SamlError::SignatureCreation(_))
        ));
        assert_eq!(root, before);
    }

    #[test]
    fn dsa_template_needs_a_dsa_key() {
        let template = SignatureTemplate::prepare(
            algorithms::EXC_C14N,
            algorithms::DSA_SHA1,
            algorithms::SHA1,
            algorithms::ENVELOPED,
        )
        .unwrap();
        let signer = XmlSigner::from_pem(KEY, None).unwrap().with_template(template);
        let mut root = message();
        assert!(matches!(
            signer.sign_element(&mut root, "_abc"),
            Err(SamlError::UnsupportedKeyType(_))
        ));
        assert!(root.child(DS.uri, "Signature").is_none());
    }

    #[test]
    fn signed_string_verifies() {
        let signer = XmlSigner::from_pem(KEY, Some(CERT)).unwrap();
        let unsigned = xml::to_string(&crate::xml::Document::new(message()));
        let signed = signer.sign(&unsigned, "_abc").unwrap();
        assert!(signed.contains("<ds:Signature xmlns:ds="));
        SignatureVerifier::new().verify(&signed).unwrap();
    }
}
