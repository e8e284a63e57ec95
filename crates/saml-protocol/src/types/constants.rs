//! SAML 2.0 constants and URIs.
//!
//! Contains namespace bindings, binding URIs, name ID formats, and other
//! constants defined by SAML 2.0 core and bindings.

use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};

/// Protocol version carried by every message.
pub const SAML_VERSION: &str = "2.0";

/// Timestamp layout used for every xs:dateTime the serializer emits.
///
/// UTC, second precision, no zone designator.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Subject confirmation method for bearer assertions.
pub const CM_BEARER: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";

// ============================================================================
// Namespaces
// ============================================================================

/// A namespace prefix bound to a URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// The conventional prefix.
    pub prefix: &'static str,
    /// The namespace URI.
    pub uri: &'static str,
}

impl Namespace {
    /// Creates a namespace binding.
    #[must_use]
    pub const fn new(prefix: &'static str, uri: &'static str) -> Self {
        Self { prefix, uri }
    }
}

/// SAML 2.0 assertion namespace.
pub const SAML: Namespace = Namespace::new("saml", "urn:oasis:names:tc:SAML:2.0:assertion");

/// SAML 2.0 protocol namespace.
pub const SAMLP: Namespace = Namespace::new("samlp", "urn:oasis:names:tc:SAML:2.0:protocol");

/// XML Digital Signature namespace.
pub const DS: Namespace = Namespace::new("ds", "http://www.w3.org/2000/09/xmldsig#");

/// XML Schema namespace.
pub const XS: Namespace = Namespace::new("xs", "http://www.w3.org/2001/XMLSchema");

/// XML Schema instance namespace.
pub const XSI: Namespace = Namespace::new("xsi", "http://www.w3.org/2001/XMLSchema-instance");

/// X.500/LDAP attribute profile namespace.
pub const X500: Namespace =
    Namespace::new("x500", "urn:oasis:names:tc:SAML:2.0:profiles:attribute:X500");

/// Exclusive canonicalization namespace (`InclusiveNamespaces`).
pub const EXC_C14N: Namespace = Namespace::new("ec", "http://www.w3.org/2001/10/xml-exc-c14n#");

// ============================================================================
// Binding URIs
// ============================================================================

/// Protocol bindings a response may be requested over.
///
/// The set is closed: a received `ProtocolBinding` outside it is rejected
/// rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProtocolBinding {
    /// HTTP POST binding.
    #[default]
    HttpPost,
    /// HTTP Redirect binding.
    HttpRedirect,
}

impl ProtocolBinding {
    /// Returns the URI for this binding.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::HttpPost => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
            Self::HttpRedirect => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
        }
    }

    /// Parses a binding from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" => Some(Self::HttpPost),
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" => Some(Self::HttpRedirect),
            _ => None,
        }
    }

    /// Parses a binding URI, rejecting anything outside the closed set.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidEnum`] for an unknown URI.
    pub fn parse(uri: &str) -> SamlResult<Self> {
        Self::from_uri(uri).ok_or_else(|| SamlError::InvalidEnum {
            field: "ProtocolBinding",
            value: uri.to_string(),
        })
    }
}

// ============================================================================
// Name ID Formats
// ============================================================================

/// SAML Name ID formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NameIdFormat {
    /// Unspecified name ID format.
    #[default]
    Unspecified,
    /// Email address format.
    Email,
    /// X.509 subject name format.
    X509SubjectName,
    /// Persistent identifier format.
    Persistent,
    /// Transient identifier format.
    Transient,
}

impl NameIdFormat {
    /// Returns the URI for this name ID format.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Unspecified => "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified",
            Self::Email => "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress",
            Self::X509SubjectName => "urn:oasis:names:tc:SAML:1.1:nameid-format:X509SubjectName",
            Self::Persistent => "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
            Self::Transient => "urn:oasis:names:tc:SAML:2.0:nameid-format:transient",
        }
    }

    /// Parses a name ID format from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified" => Some(Self::Unspecified),
            "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress" => Some(Self::Email),
            "urn:oasis:names:tc:SAML:1.1:nameid-format:X509SubjectName" => {
                Some(Self::X509SubjectName)
            }
            "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent" => Some(Self::Persistent),
            "urn:oasis:names:tc:SAML:2.0:nameid-format:transient" => Some(Self::Transient),
            _ => None,
        }
    }
}

// ============================================================================
// Authentication Context Classes
// ============================================================================

/// SAML authentication context class references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthnContextClass {
    /// Unspecified authentication context.
    #[default]
    Unspecified,
    /// Password-based authentication.
    Password,
    /// Password protected transport (TLS + password).
    PasswordProtectedTransport,
    /// X.509 certificate authentication.
    X509,
    /// Previous session (SSO).
    PreviousSession,
}

impl AuthnContextClass {
    /// Returns the URI for this authentication context class.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Unspecified => "urn:oasis:names:tc:SAML:2.0:ac:classes:unspecified",
            Self::Password => "urn:oasis:names:tc:SAML:2.0:ac:classes:Password",
            Self::PasswordProtectedTransport => {
                "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport"
            }
            Self::X509 => "urn:oasis:names:tc:SAML:2.0:ac:classes:X509",
            Self::PreviousSession => "urn:oasis:names:tc:SAML:2.0:ac:classes:PreviousSession",
        }
    }
}

// ============================================================================
// Attribute name formats
// ============================================================================

/// Attribute `NameFormat` URIs.
pub mod attrname_formats {
    /// Attribute name is a URI (typically an OID URN).
    pub const URI: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri";

    /// Attribute name is a simple string.
    pub const BASIC: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:basic";
}

// ============================================================================
// Status Codes
// ============================================================================

/// Top-level SAML status code URIs.
pub mod status_codes {
    /// Success status code.
    pub const SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";

    /// Requester error status code.
    pub const REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";

    /// Responder error status code.
    pub const RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";

    /// Version mismatch status code.
    pub const VERSION_MISMATCH: &str = "urn:oasis:names:tc:SAML:2.0:status:VersionMismatch";
}
