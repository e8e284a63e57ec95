//! Fields shared by every SAML protocol message.
//!
//! `AuthnRequest` and `Response` both hold a [`MessageBase`] by value and
//! expose it through the [`Message`] trait.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::SAML_VERSION;
use crate::error::{SamlError, SamlResult};

/// Base fields of a protocol message (`RequestAbstractType` /
/// `StatusResponseType`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBase {
    /// Unique, unguessable identifier; correlates requests and responses.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this message was issued, at second precision.
    pub issue_instant: DateTime<Utc>,

    /// Entity ID of the issuer.
    pub issuer: String,

    /// URI the message is addressed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Consent obtained from the principal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent: Option<String>,
}

impl MessageBase {
    /// Creates base fields with a fresh random ID and the current time.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: saml_crypto::generate_message_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now().trunc_subsecs(0),
            issuer: issuer.into(),
            destination: None,
            consent: None,
        }
    }

    /// Checks the fields every serialized message must carry.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SerializationFailed`] when the ID or issuer is
    /// empty or the version is not "2.0".
    pub fn validate(&self) -> SamlResult<()> {
        if self.id.is_empty() {
            return Err(SamlError::SerializationFailed("ID is required".to_string()));
        }
        if self.version != SAML_VERSION {
            return Err(SamlError::SerializationFailed(format!(
                "Unsupported SAML version: {}",
                self.version
            )));
        }
        if self.issuer.is_empty() {
            return Err(SamlError::SerializationFailed("Issuer is required".to_string()));
        }
        Ok(())
    }
}

/// Accessors over the base fields of a protocol message.
pub trait Message {
    /// Returns the base fields.
    fn base(&self) -> &MessageBase;

    /// Returns the base fields mutably.
    fn base_mut(&mut self) -> &mut MessageBase;

    /// Returns the message ID.
    fn id(&self) -> &str {
        &self.base().id
    }

    /// Returns the protocol version.
    fn version(&self) -> &str {
        &self.base().version
    }

    /// Returns the issue instant.
    fn issue_instant(&self) -> DateTime<Utc> {
        self.base().issue_instant
    }

    /// Returns the issuer entity ID.
    fn issuer(&self) -> &str {
        &self.base().issuer
    }

    /// Returns the destination, if any.
    fn destination(&self) -> Option<&str> {
        self.base().destination.as_deref()
    }

    /// Returns the consent URI, if any.
    fn consent(&self) -> Option<&str> {
        self.base().consent.as_deref()
    }
}
