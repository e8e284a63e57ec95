//! XML Signature support for SAML.
//!
//! This module provides enveloped XML-DSig signing and validation of SAML
//! messages through a narrow adapter:
//!
//! - [`SignatureTemplate::prepare`] accepts only whitelisted algorithm URIs
//! - [`XmlSigner`] injects the template and has the engine sign
//! - [`SignatureVerifier`] locates and validates a signature before any
//!   field of the document is trusted
//!
//! The cryptographic XML work happens behind the [`XmlSecEngine`] trait.
//!
//! # Algorithms
//!
//! | Slot                   | Accepted URI                     |
//! |------------------------|----------------------------------|
//! | SignatureMethod        | RSA-SHA1, DSA-SHA1               |
//! | DigestMethod           | SHA1                             |
//! | Transform              | enveloped-signature              |
//! | CanonicalizationMethod | exclusive C14N without comments  |
//!
//! DSA-SHA1 templates are accepted but the default engine only holds RSA
//! keys, so signing with one fails with `UnsupportedKeyType`.

mod engine;
mod signer;
mod verifier;

pub use engine::*;
pub use signer::*;
pub use verifier::*;

use crate::error::{MethodKind, SamlError, SamlResult};

/// Algorithm URIs.
pub mod algorithms {
    /// RSA with SHA-1.
    pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";

    /// DSA with SHA-1.
    pub const DSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#dsa-sha1";

    /// SHA-1 digest.
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";

    /// Enveloped signature transform.
    pub const ENVELOPED: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

    /// Exclusive canonicalization without comments.
    pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
}

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureMethod {
    /// RSA with SHA-1.
    #[default]
    RsaSha1,
    /// DSA with SHA-1.
    DsaSha1,
}

impl SignatureMethod {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha1 => algorithms::RSA_SHA1,
            Self::DsaSha1 => algorithms::DSA_SHA1,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithms::RSA_SHA1 => Some(Self::RsaSha1),
            algorithms::DSA_SHA1 => Some(Self::DsaSha1),
            _ => None,
        }
    }
}

/// Digest algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestMethod {
    /// SHA-1.
    #[default]
    Sha1,
}

impl DigestMethod {
    /// Returns the URI for this digest algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Sha1 => algorithms::SHA1,
        }
    }

    /// Parses a digest algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        (uri == algorithms::SHA1).then_some(Self::Sha1)
    }
}

/// Reference transform selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    /// Enveloped signature.
    #[default]
    Enveloped,
}

impl Transform {
    /// Returns the URI for this transform.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Enveloped => algorithms::ENVELOPED,
        }
    }

    /// Parses a transform from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        (uri == algorithms::ENVELOPED).then_some(Self::Enveloped)
    }
}

/// Canonicalization algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalizationMethod {
    /// Exclusive C14N without comments.
    #[default]
    ExclusiveC14n,
}

impl CanonicalizationMethod {
    /// Returns the URI for this canonicalization algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::ExclusiveC14n => algorithms::EXC_C14N,
        }
    }

    /// Parses a canonicalization algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        (uri == algorithms::EXC_C14N).then_some(Self::ExclusiveC14n)
    }
}

/// Validated description of the signature to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureTemplate {
    /// Canonicalization of `SignedInfo` and of the referenced content.
    pub canonicalization: CanonicalizationMethod,
    /// Signature algorithm.
    pub signature_method: SignatureMethod,
    /// Digest algorithm.
    pub digest_method: DigestMethod,
    /// Reference transform.
    pub transform: Transform,
    /// Attach `ds:KeyValue`.
    pub include_key_value: bool,
    /// Attach `ds:X509Data` when the key carries a certificate.
    pub include_x509: bool,
}

impl Default for SignatureTemplate {
    fn default() -> Self {
        Self {
            canonicalization: CanonicalizationMethod::ExclusiveC14n,
            signature_method: SignatureMethod::RsaSha1,
            digest_method: DigestMethod::Sha1,
            transform: Transform::Enveloped,
            include_key_value: true,
            include_x509: true,
        }
    }
}

impl SignatureTemplate {
    /// Builds a template from algorithm URIs.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnsupportedMethod`] naming the first slot whose
    /// URI is outside the whitelist.
    pub fn prepare(
        canonicalization: &str,
        signature_method: &str,
        digest_method: &str,
        transform: &str,
    ) -> SamlResult<Self> {
        let unsupported = |kind, uri: &str| SamlError::UnsupportedMethod {
            kind,
            uri: uri.to_string(),
        };
        Ok(Self {
            canonicalization: CanonicalizationMethod::from_uri(canonicalization)
                .ok_or_else(|| unsupported(MethodKind::Canonicalization, canonicalization))?,
            signature_method: SignatureMethod::from_uri(signature_method)
                .ok_or_else(|| unsupported(MethodKind::Signature, signature_method))?,
            digest_method: DigestMethod::from_uri(digest_method)
                .ok_or_else(|| unsupported(MethodKind::Digest, digest_method))?,
            transform: Transform::from_uri(transform)
                .ok_or_else(|| unsupported(MethodKind::Transform, transform))?,
            ..Self::default()
        })
    }

    /// Sets whether `ds:KeyValue` is attached.
    #[must_use]
    pub const fn with_key_value(mut self, include: bool) -> Self {
        self.include_key_value = include;
        self
    }

    /// Sets whether `ds:X509Data` is attached.
    #[must_use]
    pub const fn with_x509(mut self, include: bool) -> Self {
        self.include_x509 = include;
        self
    }
}

/// Builds a template from algorithm URIs; see [`SignatureTemplate::prepare`].
///
/// # Errors
///
/// Returns [`SamlError::UnsupportedMethod`] for a URI outside the whitelist.
pub fn prepare_signature_template(
    canonicalization: &str,
    signature_method: &str,
    digest_method: &str,
    transform: &str,
) -> SamlResult<SignatureTemplate> {
    SignatureTemplate::prepare(canonicalization, signature_method, digest_method, transform)
}

/// Progress of a signing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningState {
    /// Nothing has been added to the element.
    Unsigned,
    /// The signature template sits in the element, values empty.
    TemplateInjected,
    /// Digest and signature values are filled in.
    Signed,
}

impl SigningState {
    /// Returns true if `next` directly follows this state.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unsigned, Self::TemplateInjected) | (Self::TemplateInjected, Self::Signed)
        )
    }
}

/// Progress of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    /// The document has been parsed, nothing checked yet.
    Received,
    /// A signature covering the root was found.
    SignatureLocated,
    /// The signature is valid.
    Verified,
    /// Verification failed. Terminal.
    Rejected,
}

impl VerificationState {
    /// Returns true if `next` directly follows this state.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::SignatureLocated | Self::Rejected)
                | (Self::SignatureLocated, Self::Verified | Self::Rejected)
        )
    }
}
