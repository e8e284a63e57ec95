//! SAML Status types.
//!
//! Status information returned in SAML protocol responses. Both levels of
//! status code are closed enums: an inbound URI outside the schema set is
//! rejected instead of carried through as an opaque string.

use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};

const STATUS_PREFIX: &str = "urn:oasis:names:tc:SAML:2.0:status:";

/// SAML protocol status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// The status code.
    pub status_code: StatusCode,

    /// Optional status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl Status {
    /// Creates a status from a code.
    #[must_use]
    pub const fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            status_message: None,
        }
    }

    /// Creates a success status.
    #[must_use]
    pub const fn success() -> Self {
        Self::new(StatusCode::new(TopLevelStatusCode::Success))
    }

    /// Creates a requester error status.
    #[must_use]
    pub fn requester_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::new(TopLevelStatusCode::Requester)).with_message(message)
    }

    /// Creates a responder error status.
    #[must_use]
    pub fn responder_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::new(TopLevelStatusCode::Responder)).with_message(message)
    }

    /// Creates an authentication failed status.
    #[must_use]
    pub fn authn_failed(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::new(TopLevelStatusCode::Responder)
                .with_sub(SecondLevelStatusCode::AuthnFailed),
        )
        .with_message(message)
    }

    /// Returns true if this status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code.top == TopLevelStatusCode::Success
    }

    /// Sets the status message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::success()
    }
}

/// A top-level status code with an optional nested second-level code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode {
    /// The top-level code.
    pub top: TopLevelStatusCode,

    /// The nested, more specific code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<SecondLevelStatusCode>,
}

impl StatusCode {
    /// Creates a code without a second level.
    #[must_use]
    pub const fn new(top: TopLevelStatusCode) -> Self {
        Self { top, sub: None }
    }

    /// Sets the second-level code.
    #[must_use]
    pub const fn with_sub(mut self, sub: SecondLevelStatusCode) -> Self {
        self.sub = Some(sub);
        self
    }
}

/// Top-level status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopLevelStatusCode {
    /// The request succeeded.
    Success,
    /// The request could not be performed due to an error on the requester's part.
    Requester,
    /// The request could not be performed due to an error on the responder's part.
    Responder,
    /// The protocol version of the request was incorrect.
    VersionMismatch,
}

impl TopLevelStatusCode {
    /// Returns the URI for this code.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Success => "urn:oasis:names:tc:SAML:2.0:status:Success",
            Self::Requester => "urn:oasis:names:tc:SAML:2.0:status:Requester",
            Self::Responder => "urn:oasis:names:tc:SAML:2.0:status:Responder",
            Self::VersionMismatch => "urn:oasis:names:tc:SAML:2.0:status:VersionMismatch",
        }
    }

    /// Parses a code from its URI.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidEnum`] for a URI outside the set.
    pub fn parse(uri: &str) -> SamlResult<Self> {
        let code = match uri.strip_prefix(STATUS_PREFIX) {
            Some("Success") => Some(Self::Success),
            Some("Requester") => Some(Self::Requester),
            Some("Responder") => Some(Self::Responder),
            Some("VersionMismatch") => Some(Self::VersionMismatch),
            _ => None,
        };
        code.ok_or_else(|| SamlError::InvalidEnum {
            field: "StatusCode",
            value: uri.to_string(),
        })
    }
}

macro_rules! second_level_codes {
    ($($variant:ident),+ $(,)?) => {
        /// Second-level status codes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[allow(missing_docs)]
        pub enum SecondLevelStatusCode {
            $($variant),+
        }

        impl SecondLevelStatusCode {
            /// Every second-level code, in schema order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the URI for this code.
            #[must_use]
            pub const fn uri(&self) -> &'static str {
                match self {
                    $(Self::$variant => concat!(
                        "urn:oasis:names:tc:SAML:2.0:status:",
                        stringify!($variant)
                    )),+
                }
            }

            /// Parses a code from its URI.
            ///
            /// # Errors
            ///
            /// Returns [`SamlError::InvalidEnum`] for a URI outside the set.
            pub fn parse(uri: &str) -> SamlResult<Self> {
                let code = match uri.strip_prefix(STATUS_PREFIX) {
                    $(Some(stringify!($variant)) => Some(Self::$variant),)+
                    _ => None,
                };
                code.ok_or_else(|| SamlError::InvalidEnum {
                    field: "StatusCode",
                    value: uri.to_string(),
                })
            }
        }
    };
}

second_level_codes!(
    AuthnFailed,
    InvalidAttrNameOrValue,
    InvalidNameIDPolicy,
    NoAuthnContext,
    NoAvailableIDP,
    NoPassive,
    NoSupportedIDP,
    PartialLogout,
    ProxyCountExceeded,
    RequestDenied,
    RequestUnsupported,
    RequestVersionDeprecated,
    RequestVersionTooHigh,
    RequestVersionTooLow,
    ResourceNotRecognized,
    TooManyResponses,
    UnknownAttrProfile,
    UnknownPrincipal,
    UnsupportedBinding,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_success() {
        let status = Status::success();
        assert!(status.is_success());
        assert!(status.status_message.is_none());
        assert_eq!(
            status.status_code.top.uri(),
            "urn:oasis:names:tc:SAML:2.0:status:Success"
        );
    }

    #[test]
    fn status_authn_failed_is_nested() {
        let status = Status::authn_failed("Invalid credentials");
        assert!(!status.is_success());
        assert_eq!(status.status_code.top, TopLevelStatusCode::Responder);
        assert_eq!(status.status_code.sub, Some(SecondLevelStatusCode::AuthnFailed));
        assert_eq!(status.status_message.as_deref(), Some("Invalid credentials"));
    }

    #[test]
    fn second_level_uris_parse_back() {
        assert_eq!(SecondLevelStatusCode::ALL.len(), 19);
        for code in SecondLevelStatusCode::ALL {
            assert_eq!(SecondLevelStatusCode::parse(code.uri()).unwrap(), *code);
        }
        assert_eq!(
            SecondLevelStatusCode::InvalidNameIDPolicy.uri(),
            "urn:oasis:names:tc:SAML:2.0:status:InvalidNameIDPolicy"
        );
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert!(matches!(
            TopLevelStatusCode::parse("urn:oasis:names:tc:SAML:2.0:status:AuthnFailed"),
            Err(SamlError::InvalidEnum { field: "StatusCode", .. })
        ));
        assert!(SecondLevelStatusCode::parse("urn:example:status:Success").is_err());
        assert!(SecondLevelStatusCode::parse("urn:oasis:names:tc:SAML:2.0:status:Success").is_err());
    }
}
