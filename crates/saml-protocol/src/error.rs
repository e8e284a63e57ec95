//! SAML error types.
//!
//! Every pipeline stage (serializer, signature adapter, transport codec and
//! populator) reports failures through [`SamlError`]. Callers surface the
//! [`FailureCategory`] to end users and keep the detailed message for logs.

use saml_crypto::SignatureError;
use thiserror::Error;

use crate::types::status_codes;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// The message model could not be turned into XML.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// A cryptographic algorithm outside the accepted whitelist was requested.
    #[error("unsupported {kind} method: {uri}")]
    UnsupportedMethod {
        /// Which template slot carried the URI.
        kind: MethodKind,
        /// The rejected algorithm URI.
        uri: String,
    },

    /// The key cannot produce the requested signature method.
    #[error("unsupported signature key type: {0}")]
    UnsupportedKeyType(String),

    /// The transport envelope inflated to nothing.
    #[error("empty payload")]
    EmptyPayload,

    /// The transport envelope or the XML inside it is malformed.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// The embedded signature did not validate.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// Verification was requested but the document is not signed.
    #[error("no signature present")]
    NoSignaturePresent,

    /// The signature could not be created.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// A required element or attribute is absent.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// An enumerated field holds a value outside its closed set.
    #[error("invalid value for {field}: {value}")]
    InvalidEnum {
        /// The field being parsed.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A field is present but cannot be parsed.
    #[error("invalid value for {field}: {reason}")]
    InvalidField {
        /// The field being parsed.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The decoded message is not the kind the caller asked for.
    #[error("unexpected message: expected {expected}, got {actual}")]
    UnexpectedMessage {
        /// The expected root element.
        expected: &'static str,
        /// The actual root element.
        actual: String,
    },

    /// Key loading or another cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Template slot that carried an unsupported algorithm URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// `CanonicalizationMethod`.
    Canonicalization,
    /// `SignatureMethod`.
    Signature,
    /// `DigestMethod`.
    Digest,
    /// `Transform`.
    Transform,
}

impl std::fmt::Display for MethodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Canonicalization => "c14n",
            Self::Signature => "signature",
            Self::Digest => "digest",
            Self::Transform => "transform",
        })
    }
}

/// Generic failure category that is safe to show to a remote party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// The message could not be decoded or parsed.
    MalformedMessage,
    /// The message failed signature verification.
    AuthenticationFailed,
    /// A local configuration or programming error.
    Internal,
}

impl SamlError {
    /// Returns the generic category for this error.
    #[must_use]
    pub const fn category(&self) -> FailureCategory {
        match self {
            Self::EmptyPayload
            | Self::DecodeFailed(_)
            | Self::MissingField(_)
            | Self::InvalidEnum { .. }
            | Self::InvalidField { .. }
            | Self::UnexpectedMessage { .. } => FailureCategory::MalformedMessage,
            Self::SignatureInvalid(_) | Self::NoSignaturePresent => {
                FailureCategory::AuthenticationFailed
            }
            Self::SerializationFailed(_)
            | Self::UnsupportedMethod { .. }
            | Self::UnsupportedKeyType(_)
            | Self::SignatureCreation(_)
            | Self::Crypto(_)
            | Self::Config(_) => FailureCategory::Internal,
        }
    }

    /// Returns true if this error is a verification failure.
    #[must_use]
    pub const fn is_verification_failure(&self) -> bool {
        matches!(self.category(), FailureCategory::AuthenticationFailed)
    }

    /// Returns the SAML status code for this error.
    ///
    /// Malformed or unverifiable input is the requester's fault; everything
    /// else is reported as a responder failure.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        match self.category() {
            FailureCategory::MalformedMessage | FailureCategory::AuthenticationFailed => {
                status_codes::REQUESTER
            }
            FailureCategory::Internal => status_codes::RESPONDER,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::DecodeFailed(format!("XML parsing error: {err}"))
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::DecodeFailed(format!("XML attribute error: {err}"))
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::DecodeFailed(format!("base64 decode error: {err}"))
    }
}

impl From<SignatureError> for SamlError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::Verification => Self::SignatureInvalid(err.to_string()),
            SignatureError::UnsupportedKeyType(kind) => Self::UnsupportedKeyType(kind),
            SignatureError::Signing(msg) => Self::SignatureCreation(msg),
            other => Self::Crypto(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_categories() {
        assert_eq!(SamlError::EmptyPayload.category(), FailureCategory::MalformedMessage);
        assert_eq!(
            SamlError::NoSignaturePresent.category(),
            FailureCategory::AuthenticationFailed
        );
        assert_eq!(
            SamlError::SerializationFailed("x".to_string()).category(),
            FailureCategory::Internal
        );
    }

    #[test]
    fn error_status_codes() {
        let err = SamlError::MissingField("Issuer".to_string());
        assert_eq!(err.status_code(), "urn:oasis:names:tc:SAML:2.0:status:Requester");

        let err = SamlError::SignatureInvalid("digest mismatch".to_string());
        assert_eq!(err.status_code(), "urn:oasis:names:tc:SAML:2.0:status:Requester");
        assert!(err.is_verification_failure());

        let err = SamlError::Config("bad level".to_string());
        assert_eq!(err.status_code(), "urn:oasis:names:tc:SAML:2.0:status:Responder");
    }

    #[test]
    fn crypto_verification_maps_to_signature_invalid() {
        let err: SamlError = SignatureError::Verification.into();
        assert!(matches!(err, SamlError::SignatureInvalid(_)));

        let err: SamlError = SignatureError::InvalidKey("short".to_string()).into();
        assert!(matches!(err, SamlError::Crypto(_)));
    }

    #[test]
    fn unsupported_method_message() {
        let err = SamlError::UnsupportedMethod {
            kind: MethodKind::Digest,
            uri: "http://www.w3.org/2001/04/xmlenc#sha256".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported digest method: http://www.w3.org/2001/04/xmlenc#sha256"
        );
    }
}
