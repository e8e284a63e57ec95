//! Subject identifiers and the policy an SP requests for them.

use serde::{Deserialize, Serialize};

use super::NameIdFormat;

/// `saml:NameID`: the subject identifier carried in an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// Format URI, omitted when unspecified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// The identifier itself.
    pub value: String,
}

impl NameId {
    /// Creates an identifier with no format.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            format: None,
            value: value.into(),
        }
    }

    /// Creates an identifier of a well-known format.
    #[must_use]
    pub fn with_format(format: NameIdFormat, value: impl Into<String>) -> Self {
        Self {
            format: Some(format.uri().to_string()),
            value: value.into(),
        }
    }

    /// Creates an email address identifier.
    #[must_use]
    pub fn email(email: impl Into<String>) -> Self {
        Self::with_format(NameIdFormat::Email, email)
    }

    /// Creates a transient identifier.
    #[must_use]
    pub fn transient(value: impl Into<String>) -> Self {
        Self::with_format(NameIdFormat::Transient, value)
    }
}

/// `samlp:NameIDPolicy`: constraints on the identifier the IdP returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIdPolicy {
    /// Requested format URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Requested SP name qualifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_name_qualifier: Option<String>,

    /// Whether the IdP may create a new identifier for the principal.
    #[serde(default)]
    pub allow_create: bool,
}

impl NameIdPolicy {
    /// Creates a policy requesting a well-known format.
    #[must_use]
    pub fn new(format: NameIdFormat, allow_create: bool) -> Self {
        Self {
            format: Some(format.uri().to_string()),
            sp_name_qualifier: None,
            allow_create,
        }
    }

    /// Sets the SP name qualifier.
    #[must_use]
    pub fn with_sp_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.sp_name_qualifier = Some(qualifier.into());
        self
    }

    /// Returns the format if it is one of the well-known URIs.
    #[must_use]
    pub fn parsed_format(&self) -> Option<NameIdFormat> {
        self.format.as_deref().and_then(NameIdFormat::from_uri)
    }
}
