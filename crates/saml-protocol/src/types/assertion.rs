//! SAML Assertion types.
//!
//! Assertions contain statements about a subject made by an issuer.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthnContextClass, NameId, CM_BEARER, SAML_VERSION};
use crate::error::{SamlError, SamlResult};

/// Lifetime of a default [`Conditions`] window.
pub const DEFAULT_VALIDITY_MINUTES: i64 = 11;

/// SAML Assertion.
///
/// A package of information that supplies one or more statements made
/// by a SAML authority (the issuer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this assertion.
    pub issuer: String,

    /// The subject of this assertion.
    pub subject: Subject,

    /// Conditions that must be evaluated for the assertion to be valid.
    pub conditions: Conditions,

    /// Authentication statement describing how the subject authenticated.
    pub authn_statement: AuthnStatement,

    /// Attributes about the subject, in document order.
    #[serde(default)]
    pub attribute_statement: Vec<Attribute>,
}

impl Assertion {
    /// Creates a new assertion issued now.
    ///
    /// The conditions window starts at the issue instant.
    #[must_use]
    pub fn new(issuer: impl Into<String>, subject: Subject) -> Self {
        let now = Utc::now().trunc_subsecs(0);
        Self {
            id: saml_crypto::generate_message_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: now,
            issuer: issuer.into(),
            subject,
            conditions: Conditions::new(now),
            authn_statement: AuthnStatement::new(now, AuthnContextClass::Unspecified),
            attribute_statement: Vec::new(),
        }
    }

    /// Replaces the generated ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the conditions.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Sets the authentication statement.
    #[must_use]
    pub fn with_authn_statement(mut self, statement: AuthnStatement) -> Self {
        self.authn_statement = statement;
        self
    }

    /// Appends an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attribute_statement.push(attribute);
        self
    }

    /// Appends an attribute in place.
    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attribute_statement.push(attribute);
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attribute_statement.iter().find(|a| a.name == name)
    }

    /// Validates the assertion for the given audience at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidEnum`] for a version other than "2.0" and
    /// [`SamlError::InvalidField`] when `now` is outside the window or the
    /// audience is not listed.
    pub fn validate(&self, audience: &str, now: DateTime<Utc>) -> SamlResult<()> {
        if self.version != SAML_VERSION {
            return Err(SamlError::InvalidEnum {
                field: "Version",
                value: self.version.clone(),
            });
        }
        self.conditions.check(now, Duration::zero())?;
        if !self.conditions.allows_audience(audience) {
            return Err(SamlError::InvalidField {
                field: "Audience",
                reason: format!("{audience} is not an intended audience"),
            });
        }
        Ok(())
    }
}

/// Subject of an assertion.
///
/// Identifies the principal that is the subject of all statements in the assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// The name identifier of the subject.
    pub name_id: NameId,

    /// How the relying party may confirm the subject.
    pub subject_confirmation: SubjectConfirmation,
}

impl Subject {
    /// Creates a subject.
    #[must_use]
    pub fn new(name_id: NameId, subject_confirmation: SubjectConfirmation) -> Self {
        Self {
            name_id,
            subject_confirmation,
        }
    }
}

/// `saml:SubjectConfirmation` with its `SubjectConfirmationData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    /// Confirmation method URI; bearer unless set.
    pub method: String,

    /// ID of the request this confirmation answers.
    pub in_response_to: String,

    /// URL the assertion may be delivered to.
    pub recipient: String,

    /// Time at or after which the subject can no longer be confirmed.
    pub not_on_or_after: DateTime<Utc>,
}

impl SubjectConfirmation {
    /// Creates a bearer confirmation for the given request.
    #[must_use]
    pub fn bearer(
        in_response_to: impl Into<String>,
        recipient: impl Into<String>,
        not_on_or_after: DateTime<Utc>,
    ) -> Self {
        Self {
            method: CM_BEARER.to_string(),
            in_response_to: in_response_to.into(),
            recipient: recipient.into(),
            not_on_or_after: not_on_or_after.trunc_subsecs(0),
        }
    }
}

/// Conditions for assertion validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// Time before which the assertion is not valid.
    pub not_before: DateTime<Utc>,

    /// Time at or after which the assertion is not valid.
    pub not_on_or_after: DateTime<Utc>,

    /// Audience restrictions; each restriction lists acceptable audiences.
    #[serde(default)]
    pub audience_restrictions: Vec<AudienceRestriction>,
}

impl Conditions {
    /// Creates conditions valid for eleven minutes from `not_before`.
    #[must_use]
    pub fn new(not_before: DateTime<Utc>) -> Self {
        let not_before = not_before.trunc_subsecs(0);
        Self {
            not_before,
            not_on_or_after: not_before + Duration::minutes(DEFAULT_VALIDITY_MINUTES),
            audience_restrictions: Vec::new(),
        }
    }

    /// Moves the start of the window, keeping the default length.
    pub fn set_not_before(&mut self, not_before: DateTime<Utc>) {
        let not_before = not_before.trunc_subsecs(0);
        self.not_before = not_before;
        self.not_on_or_after = not_before + Duration::minutes(DEFAULT_VALIDITY_MINUTES);
    }

    /// Overrides the window length.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidField`] when `minutes` is not positive.
    pub fn with_validity(mut self, minutes: i64) -> SamlResult<Self> {
        if minutes <= 0 {
            return Err(SamlError::InvalidField {
                field: "NotOnOrAfter",
                reason: format!("validity must be positive, got {minutes} minutes"),
            });
        }
        self.not_on_or_after = self.not_before + Duration::minutes(minutes);
        Ok(self)
    }

    /// Adds an audience restriction with a single audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience_restrictions.push(AudienceRestriction {
            audiences: vec![audience.into()],
        });
        self
    }

    /// Adds an audience to the first restriction, creating it if needed.
    pub fn add_audience(&mut self, audience: impl Into<String>) {
        match self.audience_restrictions.first_mut() {
            Some(restriction) => restriction.audiences.push(audience.into()),
            None => self.audience_restrictions.push(AudienceRestriction {
                audiences: vec![audience.into()],
            }),
        }
    }

    /// Checks that `now` lies within the window, widened by `skew` on both ends.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidField`] naming the violated bound.
    pub fn check(&self, now: DateTime<Utc>, skew: Duration) -> SamlResult<()> {
        if now + skew < self.not_before {
            return Err(SamlError::InvalidField {
                field: "NotBefore",
                reason: "assertion not yet valid".to_string(),
            });
        }
        if now - skew >= self.not_on_or_after {
            return Err(SamlError::InvalidField {
                field: "NotOnOrAfter",
                reason: "assertion has expired".to_string(),
            });
        }
        Ok(())
    }

    /// Returns true if every restriction lists `audience`.
    #[must_use]
    pub fn allows_audience(&self, audience: &str) -> bool {
        self.audience_restrictions
            .iter()
            .all(|r| r.audiences.iter().any(|a| a == audience))
    }
}

/// Audience restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceRestriction {
    /// List of valid audiences.
    pub audiences: Vec<String>,
}

/// Authentication statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnStatement {
    /// When the subject authenticated.
    pub authn_instant: DateTime<Utc>,

    /// Session index at the IdP.
    pub session_index: String,

    /// `AuthnContext/AuthnContextClassRef`.
    pub authn_context_class_ref: String,
}

impl AuthnStatement {
    /// Creates a statement for the given instant and context class.
    #[must_use]
    pub fn new(authn_instant: DateTime<Utc>, class: AuthnContextClass) -> Self {
        Self {
            authn_instant: authn_instant.trunc_subsecs(0),
            session_index: String::new(),
            authn_context_class_ref: class.uri().to_string(),
        }
    }

    /// Sets the session index.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_index = index.into();
        self
    }
}

/// A namespaced XML attribute carried on an `saml:Attribute` element.
///
/// Profiles such as X.500 use these to add encoding hints
/// (`x500:Encoding="LDAP"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraAttribute {
    /// Prefix the attribute is written with.
    pub prefix: String,

    /// Namespace URI the prefix is bound to.
    pub namespace: String,

    /// Local name.
    pub name: String,

    /// Attribute value.
    pub value: String,
}

/// One `saml:AttributeValue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    /// `xsi:type`, e.g. `xs:string`.
    #[serde(rename = "type")]
    pub value_type: String,

    /// Text content.
    pub value: String,
}

impl AttributeValue {
    /// Creates an `xs:string` value.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value_type: "xs:string".to_string(),
            value: value.into(),
        }
    }
}

/// SAML Attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,

    /// Friendly name for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,

    /// Extra namespaced attributes, in document order.
    #[serde(default)]
    pub extra_attributes: Vec<ExtraAttribute>,

    /// Values, in document order.
    #[serde(default)]
    pub values: Vec<AttributeValue>,
}

impl Attribute {
    /// Creates an attribute with no values.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            friendly_name: None,
            extra_attributes: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Creates an attribute with a single string value.
    #[must_use]
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name).with_value(AttributeValue::string(value))
    }

    /// Creates an attribute with multiple string values.
    #[must_use]
    pub fn multi(name: impl Into<String>, values: Vec<String>) -> Self {
        let mut attribute = Self::new(name);
        attribute.values = values.into_iter().map(AttributeValue::string).collect();
        attribute
    }

    /// Sets the friendly name.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Appends a value.
    #[must_use]
    pub fn with_value(mut self, value: AttributeValue) -> Self {
        self.values.push(value);
        self
    }

    /// Adds an extra namespaced attribute.
    #[must_use]
    pub fn with_extra_attribute(mut self, attr: ExtraAttribute) -> Self {
        self.extra_attributes.push(attr);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subject() -> Subject {
        Subject::new(
            NameId::email("user@example.com"),
            SubjectConfirmation::bearer("_req", "https://sp.example.com/acs", Utc::now()),
        )
    }

    #[test]
    fn assertion_creation() {
        let assertion = Assertion::new("https://idp.example.com", subject())
            .with_conditions(Conditions::new(Utc::now()).with_audience("https://sp.example.com"))
            .with_attribute(Attribute::single("email", "user@example.com"));

        assert!(assertion.id.starts_with('_'));
        assert_eq!(assertion.issuer, "https://idp.example.com");
        assert_eq!(assertion.subject.subject_confirmation.method, CM_BEARER);
        assert_eq!(assertion.attribute("email").map(|a| a.values.len()), Some(1));
    }

    #[test]
    fn default_window_is_eleven_minutes() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let conditions = Conditions::new(start);
        assert_eq!(conditions.not_on_or_after - conditions.not_before, Duration::minutes(11));

        let mut moved = conditions.clone();
        moved.set_not_before(start + Duration::hours(1));
        assert_eq!(
            moved.not_on_or_after,
            Utc.with_ymd_and_hms(2024, 1, 1, 13, 11, 0).unwrap()
        );
    }

    #[test]
    fn with_validity_rejects_empty_window() {
        let conditions = Conditions::new(Utc::now());
        assert!(conditions.clone().with_validity(0).is_err());
        assert!(conditions.clone().with_validity(-5).is_err());
        let widened = conditions.with_validity(60).unwrap();
        assert_eq!(widened.not_on_or_after - widened.not_before, Duration::minutes(60));
    }

    #[test]
    fn conditions_check_bounds() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let conditions = Conditions::new(start);
        let skew = Duration::seconds(30);

        assert!(conditions.check(start, Duration::zero()).is_ok());
        assert!(conditions.check(start - Duration::seconds(10), skew).is_ok());
        assert!(conditions.check(start - Duration::seconds(60), skew).is_err());
        assert!(conditions
            .check(start + Duration::minutes(11), Duration::zero())
            .is_err());
    }

    #[test]
    fn assertion_validation() {
        let start = Utc::now();
        let assertion = Assertion::new("https://idp.example.com", subject())
            .with_conditions(Conditions::new(start).with_audience("https://sp.example.com"));
        let at = assertion.conditions.not_before;

        assert!(assertion.validate("https://sp.example.com", at).is_ok());
        assert!(assertion.validate("https://other.example.com", at).is_err());
    }

    #[test]
    fn attribute_builders() {
        let attribute = Attribute::multi("roles", vec!["admin".to_string(), "user".to_string()])
            .with_friendly_name("Roles")
            .with_extra_attribute(ExtraAttribute {
                prefix: "x500".to_string(),
                namespace: "urn:oasis:names:tc:SAML:2.0:profiles:attribute:X500".to_string(),
                name: "Encoding".to_string(),
                value: "LDAP".to_string(),
            });

        assert_eq!(attribute.values.len(), 2);
        assert_eq!(attribute.values[1].value_type, "xs:string");
        assert_eq!(attribute.extra_attributes[0].name, "Encoding");
    }
}
