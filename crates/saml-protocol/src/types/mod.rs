//! SAML 2.0 types and data structures.
//!
//! This module contains the message model: requests, responses, assertions,
//! and the closed enums their fields draw from.

mod assertion;
mod authn_request;
mod constants;
mod message;
mod name_id;
mod response;
mod status;

pub use assertion::*;
pub use authn_request::*;
pub use constants::*;
pub use message::*;
pub use name_id::*;
pub use response::*;
pub use status::*;

/// Every protocol message the pipeline carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolMessage {
    /// `samlp:AuthnRequest`.
    AuthnRequest(AuthnRequest),
    /// `samlp:Response`.
    Response(Response),
}

impl ProtocolMessage {
    /// Local name of the root element.
    #[must_use]
    pub const fn element_name(&self) -> &'static str {
        match self {
            Self::AuthnRequest(_) => "AuthnRequest",
            Self::Response(_) => "Response",
        }
    }

    /// Returns the message as its base-field view.
    #[must_use]
    pub fn as_message(&self) -> &dyn Message {
        match self {
            Self::AuthnRequest(request) => request,
            Self::Response(response) => response,
        }
    }
}

impl From<AuthnRequest> for ProtocolMessage {
    fn from(request: AuthnRequest) -> Self {
        Self::AuthnRequest(request)
    }
}

impl From<Response> for ProtocolMessage {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}
