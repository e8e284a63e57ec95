//! SAML Response types.
//!
//! Response messages sent by an identity provider to a service provider.

use serde::{Deserialize, Serialize};

use super::{Assertion, Message, MessageBase, Status};
use crate::error::SamlResult;

/// SAML Response.
///
/// A response message sent from an identity provider to a service provider
/// containing authentication results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Base message fields.
    pub base: MessageBase,

    /// The ID of the request this response is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The status of the response.
    pub status: Status,

    /// The assertion, absent on failure responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion: Option<Assertion>,
}

impl Response {
    /// Creates a successful response with no assertion.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            base: MessageBase::new(issuer),
            in_response_to: None,
            status: Status::success(),
            assertion: None,
        }
    }

    /// Creates an error response to a request.
    #[must_use]
    pub fn error(issuer: impl Into<String>, in_response_to: impl Into<String>, status: Status) -> Self {
        Self::new(issuer)
            .with_in_response_to(in_response_to)
            .with_status(status)
    }

    /// Replaces the generated ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.base.id = id.into();
        self
    }

    /// Sets the request ID this response answers.
    #[must_use]
    pub fn with_in_response_to(mut self, id: impl Into<String>) -> Self {
        self.in_response_to = Some(id.into());
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

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Sets the assertion.
    #[must_use]
    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertion = Some(assertion);
        self
    }

    /// Returns the request ID this response answers.
    #[must_use]
    pub fn in_response_to(&self) -> Option<&str> {
        self.in_response_to.as_deref()
    }

    /// Returns true if the response indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Validates the basic structure of this response.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::SerializationFailed`] when a required
    /// field is empty.
    pub fn validate(&self) -> SamlResult<()> {
        self.base.validate()
    }
}

impl Message for Response {
    fn base(&self) -> &MessageBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MessageBase {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecondLevelStatusCode;

    #[test]
    fn response_creation() {
        let response = Response::new("https://idp.example.com")
            .with_in_response_to("_request123")
            .with_destination("https://sp.example.com/acs");

        assert!(response.id().starts_with('_'));
        assert_eq!(response.issuer(), "https://idp.example.com");
        assert_eq!(response.in_response_to(), Some("_request123"));
        assert!(response.is_success());
        assert!(response.assertion.is_none());
        assert!(response.validate().is_ok());
    }

    #[test]
    fn response_error() {
        let response = Response::error(
            "https://idp.example.com",
            "_request123",
            Status::authn_failed("Invalid credentials"),
        );

        assert!(!response.is_success());
        assert_eq!(
            response.status.status_code.sub,
            Some(SecondLevelStatusCode::AuthnFailed)
        );
    }
}
