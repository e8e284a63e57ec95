//! SAML AuthnRequest types.
//!
//! Authentication request message sent by a service provider to an identity provider.

use serde::{Deserialize, Serialize};

use super::{AuthnContextClass, Message, MessageBase, NameIdPolicy, ProtocolBinding};
use crate::error::{SamlError, SamlResult};

/// SAML Authentication Request.
///
/// An authentication request message sent from a service provider to an
/// identity provider requesting authentication of a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Base message fields.
    pub base: MessageBase,

    /// A human-readable name for the requester.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,

    /// Binding the response must be delivered over.
    pub protocol_binding: ProtocolBinding,

    /// The URL where the response should be sent.
    pub assertion_consumer_service_url: String,

    /// Name ID policy constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_policy: Option<NameIdPolicy>,

    /// Requested authentication context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_authn_context: Option<RequestedAuthnContext>,

    /// Whether the IdP must authenticate the user directly.
    #[serde(default)]
    pub force_authn: bool,

    /// Whether the IdP must not interact with the user.
    #[serde(default)]
    pub is_passive: bool,
}

impl AuthnRequest {
    /// Creates a new authentication request with a fresh ID.
    #[must_use]
    pub fn new(issuer: impl Into<String>, acs_url: impl Into<String>) -> Self {
        Self {
            base: MessageBase::new(issuer),
            provider_name: None,
            protocol_binding: ProtocolBinding::default(),
            assertion_consumer_service_url: acs_url.into(),
            name_id_policy: None,
            requested_authn_context: None,
            force_authn: false,
            is_passive: false,
        }
    }

    /// Replaces the generated ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.base.id = id.into();
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.base.destination = Some(url.into());
        self
    }

    /// Sets the consent URI.
    #[must_use]
    pub fn with_consent(mut self, consent: impl Into<String>) -> Self {
        self.base.consent = Some(consent.into());
        self
    }

    /// Sets the protocol binding for the response.
    #[must_use]
    pub const fn with_binding(mut self, binding: ProtocolBinding) -> Self {
        self.protocol_binding = binding;
        self
    }

    /// Sets the provider name.
    #[must_use]
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Sets the name ID policy.
    #[must_use]
    pub fn with_name_id_policy(mut self, policy: NameIdPolicy) -> Self {
        self.name_id_policy = Some(policy);
        self
    }

    /// Sets the requested authentication context.
    #[must_use]
    pub fn with_authn_context(mut self, context: RequestedAuthnContext) -> Self {
        self.requested_authn_context = Some(context);
        self
    }

    /// Sets force authentication.
    #[must_use]
    pub const fn force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }

    /// Sets passive authentication.
    #[must_use]
    pub const fn is_passive(mut self, passive: bool) -> Self {
        self.is_passive = passive;
        self
    }

    /// Validates the basic structure of this request.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SerializationFailed`] when a required field is
    /// empty.
    pub fn validate(&self) -> SamlResult<()> {
        self.base.validate()?;
        if self.assertion_consumer_service_url.is_empty() {
            return Err(SamlError::SerializationFailed(
                "AssertionConsumerServiceURL is required".to_string(),
            ));
        }
        Ok(())
    }
}

impl Message for AuthnRequest {
    fn base(&self) -> &MessageBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MessageBase {
        &mut self.base
    }
}

/// Requested authentication context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAuthnContext {
    /// Comparison method for the authentication context.
    #[serde(default)]
    pub comparison: AuthnContextComparison,

    /// Acceptable authentication context class reference.
    pub authn_context_class_ref: String,
}

impl RequestedAuthnContext {
    /// Creates a requested context from a comparison and a class reference URI.
    #[must_use]
    pub fn new(comparison: AuthnContextComparison, class_ref: impl Into<String>) -> Self {
        Self {
            comparison,
            authn_context_class_ref: class_ref.into(),
        }
    }

    /// Creates a context requiring exact match of a class reference.
    #[must_use]
    pub fn exact(class: AuthnContextClass) -> Self {
        Self::new(AuthnContextComparison::Exact, class.uri())
    }

    /// Sets the comparison method.
    #[must_use]
    pub const fn with_comparison(mut self, comparison: AuthnContextComparison) -> Self {
        self.comparison = comparison;
        self
    }
}

/// Authentication context comparison methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthnContextComparison {
    /// Exact match required.
    #[default]
    Exact,
    /// Match must be at least as strong.
    Minimum,
    /// Match must be at most as strong.
    Maximum,
    /// Match must be stronger than any listed context.
    Better,
}

impl AuthnContextComparison {
    /// Returns the string value for this comparison.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Better => "better",
        }
    }

    /// Parses a comparison attribute value.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidEnum`] for anything but the four schema values.
    pub fn parse(value: &str) -> SamlResult<Self> {
        match value {
            "exact" => Ok(Self::Exact),
            "minimum" => Ok(Self::Minimum),
            "maximum" => Ok(Self::Maximum),
            "better" => Ok(Self::Better),
            other => Err(SamlError::InvalidEnum {
                field: "Comparison",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authn_request_creation() {
        let request = AuthnRequest::new("https://sp.example.com", "https://sp.example.com/acs")
            .with_destination("https://idp.example.com/sso")
            .with_binding(ProtocolBinding::HttpRedirect)
            .force_authn(true);

        assert!(!request.id().is_empty());
        assert_eq!(request.version(), "2.0");
        assert_eq!(request.issuer(), "https://sp.example.com");
        assert_eq!(request.destination(), Some("https://idp.example.com/sso"));
        assert_eq!(request.assertion_consumer_service_url, "https://sp.example.com/acs");
        assert!(request.force_authn);
        assert_eq!(request.protocol_binding, ProtocolBinding::HttpRedirect);
    }

    #[test]
    fn authn_request_validation() {
        let request = AuthnRequest::new("https://sp.example.com", "https://sp.example.com/acs");
        assert!(request.validate().is_ok());

        let invalid = request.clone().with_id("");
        assert!(invalid.validate().is_err());

        let mut invalid = request;
        invalid.assertion_consumer_service_url.clear();
        assert!(matches!(invalid.validate(), Err(SamlError::SerializationFailed(_))));
    }

    #[test]
    fn requested_authn_context() {
        let context = RequestedAuthnContext::exact(AuthnContextClass::PasswordProtectedTransport)
            .with_comparison(AuthnContextComparison::Minimum);

        assert_eq!(context.comparison, AuthnContextComparison::Minimum);
        assert_eq!(
            context.authn_context_class_ref,
            "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport"
        );
    }

    #[test]
    fn comparison_parse_is_closed() {
        assert_eq!(AuthnContextComparison::parse("better").unwrap(), AuthnContextComparison::Better);
        assert!(matches!(
            AuthnContextComparison::parse("EXACT"),
            Err(SamlError::InvalidEnum { field: "Comparison", .. })
        ));
    }
}
