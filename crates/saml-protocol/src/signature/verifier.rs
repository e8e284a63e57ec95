//! Enveloped signature verification.

use std::sync::Arc;

use saml_crypto::VerifyingKey;

use super::{engine::XmlSecEngine, locate_signature, NativeEngine, VerificationState};
use crate::error::SamlResult;
use crate::xml::{self, Document};

/// Verifies the signature on the root of a received document.
///
/// With trusted keys configured, only those keys are accepted and any key
/// material embedded in the message is ignored.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    trusted: Vec<VerifyingKey>,
    engine: Arc<dyn XmlSecEngine>,
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier {
    /// Creates a verifier that trusts the key embedded in each message.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trusted: Vec::new(),
            engine: Arc::new(NativeEngine),
        }
    }

    /// Restricts verification to the given keys.
    #[must_use]
    pub fn with_trusted_keys(mut self, keys: Vec<VerifyingKey>) -> Self {
        self.trusted = keys;
        self
    }

    /// Creates a verifier trusting the keys of PEM certificates.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::Crypto`] if a certificate cannot be loaded.
    pub fn from_pem(certificates_pem: &[&str]) -> SamlResult<Self> {
        let keys = certificates_pem
            .iter()
            .map(|pem| VerifyingKey::from_certificate_pem(pem))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new().with_trusted_keys(keys))
    }

    /// Replaces the engine.
    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn XmlSecEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Returns the trusted keys.
    #[must_use]
    pub fn trusted_keys(&self) -> &[VerifyingKey] {
        &self.trusted
    }

    /// Parses and verifies `xml`, returning the verified document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::DecodeFailed`] for malformed XML,
    /// otherwise see [`SignatureVerifier::verify_document`].
    pub fn verify(&self, xml: &str) -> SamlResult<Document> {
        self.verify_document(xml::parse(xml)?)
    }

    /// Verifies a parsed document and hands it back only if it is valid.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::NoSignaturePresent`] or
    /// [`crate::SamlError::SignatureInvalid`]. The document is dropped.
    pub fn verify_document(&self, doc: Document) -> SamlResult<Document> {
        let mut state = VerificationState::Received;

        if let Err(err) = locate_signature(&doc.root) {
            reject(&mut state, &err);
            return Err(err);
        }
        advance(&mut state, VerificationState::SignatureLocated);

        match self.engine.verify(&doc, &self.trusted) {
            Ok(()) => {
                advance(&mut state, VerificationState::Verified);
                Ok(doc)
            }
            Err(err) => {
                reject(&mut state, &err);
                Err(err)
            }
        }
    }
}

fn advance(state: &mut VerificationState, next: VerificationState) {
    debug_assert!(state.can_advance_to(next));
    tracing::trace!(from = ?state, to = ?next, "verification state");
    *state = next;
}

fn reject(state: &mut VerificationState, err: &crate::SamlError) {
    advance(state, VerificationState::Rejected);
    tracing::warn!(category = ?err.category(), "signature verification rejected");
    tracing::debug!(error = %err, "verification failure detail");
}
