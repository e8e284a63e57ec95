//! Populator: XML tree to message model.
//!
//! Lookups go through a [`QueryContext`] with `saml`, `samlp` and `ds`
//! registered, so the prefixes a sender chose do not matter. Enumerated
//! fields are closed: an unknown binding, comparison or status code is an
//! error, never a default.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

use crate::error::{SamlError, SamlResult};
use crate::types::{
    Assertion, Attribute, AttributeValue, AudienceRestriction, AuthnContextComparison,
    AuthnRequest, AuthnStatement, Conditions, ExtraAttribute, MessageBase, NameId, NameIdPolicy,
    ProtocolBinding, ProtocolMessage, RequestedAuthnContext, Response, SecondLevelStatusCode,
    Status, StatusCode, Subject, SubjectConfirmation, TopLevelStatusCode, CM_BEARER, SAML, SAMLP,
    SAML_VERSION, TIME_FORMAT, XSI,
};
use crate::xml::{self, Document, Element, QueryContext};

/// `xsi:type` assumed for an `AttributeValue` that does not declare one.
const DEFAULT_VALUE_TYPE: &str = "xs:string";

/// Parses and populates an `AuthnRequest`.
///
/// The document is not verified; use the codec with verification enabled
/// for anything received from a remote party.
///
/// # Errors
///
/// Returns [`SamlError::DecodeFailed`] for malformed XML,
/// [`SamlError::UnexpectedMessage`] for another root element, and the
/// populator errors otherwise.
pub fn parse_authn_request(xml: &str) -> SamlResult<AuthnRequest> {
    match parse_message(xml)? {
        ProtocolMessage::AuthnRequest(request) => Ok(request),
        other => Err(unexpected("AuthnRequest", other.element_name())),
    }
}

/// Parses and populates a `Response`.
///
/// # Errors
///
/// See [`parse_authn_request`].
pub fn parse_response(xml: &str) -> SamlResult<Response> {
    match parse_message(xml)? {
        ProtocolMessage::Response(response) => Ok(response),
        other => Err(unexpected("Response", other.element_name())),
    }
}

/// Parses and populates whichever protocol message `xml` holds.
///
/// # Errors
///
/// See [`parse_authn_request`].
pub fn parse_message(xml: &str) -> SamlResult<ProtocolMessage> {
    populate(&xml::parse(xml)?)
}

/// Populates a message from a parsed document.
///
/// # Errors
///
/// - [`SamlError::UnexpectedMessage`] if the root is not a protocol message
/// - [`SamlError::MissingField`] for an absent required field
/// - [`SamlError::InvalidEnum`] for a value outside a closed set
/// - [`SamlError::InvalidField`] for an unparseable timestamp or boolean
pub fn populate(doc: &Document) -> SamlResult<ProtocolMessage> {
    let root = &doc.root;
    let populator = Populator::new();
    let message = if root.is(SAMLP.uri, "AuthnRequest") {
        ProtocolMessage::AuthnRequest(populator.authn_request(root)?)
    } else if root.is(SAMLP.uri, "Response") {
        ProtocolMessage::Response(populator.response(root)?)
    } else {
        return Err(unexpected("AuthnRequest or Response", &root.qname()));
    };
    tracing::trace!(kind = message.element_name(), "message populated");
    Ok(message)
}

fn unexpected(expected: &'static str, actual: &str) -> SamlError {
    SamlError::UnexpectedMessage {
        expected,
        actual: actual.to_string(),
    }
}

/// Parses an xs:dateTime.
///
/// The emitted form has no zone and no fraction; a `Z` or numeric offset and
/// fractional seconds are accepted on input. The result is truncated to
/// whole seconds.
///
/// # Errors
///
/// Returns [`SamlError::InvalidField`] naming `field`.
pub fn parse_instant(value: &str, field: &'static str) -> SamlResult<DateTime<Utc>> {
    let value = value.trim();
    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, &format!("{TIME_FORMAT}%.f")).map(|dt| dt.and_utc())
        })
        .map_err(|e| SamlError::InvalidField {
            field,
            reason: format!("{value:?} is not an xs:dateTime: {e}"),
        })?;
    Ok(parsed.trunc_subsecs(0))
}

fn parse_bool(value: &str, field: &'static str) -> SamlResult<bool> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(SamlError::InvalidField {
            field,
            reason: format!("{other:?} is not an xs:boolean"),
        }),
    }
}

struct Populator {
    ctx: QueryContext,
}

impl Populator {
    fn new() -> Self {
        Self {
            ctx: QueryContext::new(),
        }
    }

    /// Reads a value of a whitespace-collapsed type (ID, anyURI, boolean,
    /// dateTime, enumeration), trimmed.
    fn token(&self, from: &Element, path: &str) -> SamlResult<Option<String>> {
        Ok(self
            .ctx
            .value(from, path)?
            .map(|v| v.trim().to_string()))
    }

    /// Reads free text verbatim. A present but empty value is `Some("")`.
    fn text(&self, from: &Element, path: &str) -> SamlResult<Option<String>> {
        self.ctx.value(from, path)
    }

    fn required(&self, from: &Element, path: &str, field: &'static str) -> SamlResult<String> {
        self.token(from, path)?
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SamlError::MissingField(field.to_string()))
    }

    fn required_text(&self, from: &Element, path: &str, field: &'static str) -> SamlResult<String> {
        self.text(from, path)?
            .ok_or_else(|| SamlError::MissingField(field.to_string()))
    }

    fn required_element<'a>(
        &self,
        from: &'a Element,
        path: &str,
        field: &'static str,
    ) -> SamlResult<&'a Element> {
        self.ctx
            .element(from, path)?
            .ok_or_else(|| SamlError::MissingField(field.to_string()))
    }

    fn instant(&self, from: &Element, path: &str, field: &'static str) -> SamlResult<DateTime<Utc>> {
        parse_instant(&self.required(from, path, field)?, field)
    }

    fn flag(&self, from: &Element, path: &str, field: &'static str) -> SamlResult<bool> {
        self.token(from, path)?
            .map_or(Ok(false), |v| parse_bool(&v, field))
    }

    fn version(&self, from: &Element) -> SamlResult<String> {
        let version = self.required(from, "@Version", "Version")?;
        if version != SAML_VERSION {
            return Err(SamlError::InvalidEnum {
                field: "Version",
                value: version,
            });
        }
        Ok(version)
    }

    fn base(&self, root: &Element) -> SamlResult<MessageBase> {
        Ok(MessageBase {
            id: self.required(root, "@ID", "ID")?,
            version: self.version(root)?,
            issue_instant: self.instant(root, "@IssueInstant", "IssueInstant")?,
            issuer: self.required(root, "saml:Issuer", "Issuer")?,
            destination: self.token(root, "@Destination")?,
            consent: self.token(root, "@Consent")?,
        })
    }

    fn authn_request(&self, root: &Element) -> SamlResult<AuthnRequest> {
        let binding = self.required(root, "@ProtocolBinding", "ProtocolBinding")?;
        Ok(AuthnRequest {
            base: self.base(root)?,
            provider_name: self.text(root, "@ProviderName")?,
            protocol_binding: ProtocolBinding::parse(&binding)?,
            assertion_consumer_service_url: self.required(
                root,
                "@AssertionConsumerServiceURL",
                "AssertionConsumerServiceURL",
            )?,
            name_id_policy: self
                .ctx
                .element(root, "samlp:NameIDPolicy")?
                .map(|el| self.name_id_policy(el))
                .transpose()?,
            requested_authn_context: self
                .ctx
                .element(root, "samlp:RequestedAuthnContext")?
                .map(|el| self.requested_authn_context(el))
                .transpose()?,
            force_authn: self.flag(root, "@ForceAuthn", "ForceAuthn")?,
            is_passive: self.flag(root, "@IsPassive", "IsPassive")?,
        })
    }

    fn name_id_policy(&self, el: &Element) -> SamlResult<NameIdPolicy> {
        Ok(NameIdPolicy {
            format: self.token(el, "@Format")?,
            sp_name_qualifier: self.text(el, "@SPNameQualifier")?,
            allow_create: self.flag(el, "@AllowCreate", "AllowCreate")?,
        })
    }

    fn requested_authn_context(&self, el: &Element) -> SamlResult<RequestedAuthnContext> {
        let comparison = self
            .token(el, "@Comparison")?
            .map_or(Ok(AuthnContextComparison::Exact), |c| {
                AuthnContextComparison::parse(&c)
            })?;
        Ok(RequestedAuthnContext {
            comparison,
            authn_context_class_ref: self.required(
                el,
                "saml:AuthnContextClassRef",
                "AuthnContextClassRef",
            )?,
        })
    }

    fn response(&self, root: &Element) -> SamlResult<Response> {
        Ok(Response {
            base: self.base(root)?,
            in_response_to: self.token(root, "@InResponseTo")?,
            status: self.status(self.required_element(root, "samlp:Status", "Status")?)?,
            assertion: self
                .ctx
                .element(root, "saml:Assertion")?
                .map(|el| self.assertion(el))
                .transpose()?,
        })
    }

    fn status(&self, el: &Element) -> SamlResult<Status> {
        let code = self.required_element(el, "samlp:StatusCode", "StatusCode")?;
        let top = TopLevelStatusCode::parse(&self.required(code, "@Value", "StatusCode")?)?;
        let sub = self
            .token(code, "samlp:StatusCode/@Value")?
            .map(|v| SecondLevelStatusCode::parse(&v))
            .transpose()?;
        Ok(Status {
            status_code: StatusCode { top, sub },
            status_message: self.text(el, "samlp:StatusMessage")?,
        })
    }

    fn assertion(&self, el: &Element) -> SamlResult<Assertion> {
        let attribute_statement = self
            .ctx
            .elements(el, "saml:AttributeStatement/saml:Attribute")?
            .into_iter()
            .map(|a| self.attribute(a))
            .collect::<SamlResult<Vec<_>>>()?;
        Ok(Assertion {
            id: self.required(el, "@ID", "Assertion ID")?,
            version: self.version(el)?,
            issue_instant: self.instant(el, "@IssueInstant", "IssueInstant")?,
            issuer: self.required(el, "saml:Issuer", "Issuer")?,
            subject: self.subject(self.required_element(el, "saml:Subject", "Subject")?)?,
            conditions: self.conditions(self.required_element(el, "saml:Conditions", "Conditions")?)?,
            authn_statement: self.authn_statement(self.required_element(
                el,
                "saml:AuthnStatement",
                "AuthnStatement",
            )?)?,
            attribute_statement,
        })
    }

    fn subject(&self, el: &Element) -> SamlResult<Subject> {
        let name_id = NameId {
            format: self.token(el, "saml:NameID/@Format")?,
            value: self.required_text(el, "saml:NameID", "NameID")?,
        };
        let confirmation =
            self.required_element(el, "saml:SubjectConfirmation", "SubjectConfirmation")?;
        let data = self.required_element(
            confirmation,
            "saml:SubjectConfirmationData",
            "SubjectConfirmationData",
        )?;
        Ok(Subject {
            name_id,
            subject_confirmation: SubjectConfirmation {
                method: self
                    .token(confirmation, "@Method")?
                    .unwrap_or_else(|| CM_BEARER.to_string()),
                in_response_to: self.token(data, "@InResponseTo")?.unwrap_or_default(),
                recipient: self.token(data, "@Recipient")?.unwrap_or_default(),
                not_on_or_after: self.instant(data, "@NotOnOrAfter", "NotOnOrAfter")?,
            },
        })
    }

    fn conditions(&self, el: &Element) -> SamlResult<Conditions> {
        let audience_restrictions = self
            .ctx
            .elements(el, "saml:AudienceRestriction")?
            .into_iter()
            .map(|restriction| {
                let audiences = self
                    .ctx
                    .elements(restriction, "saml:Audience")?
                    .into_iter()
                    .map(|a| a.text().trim().to_string())
                    .collect();
                Ok(AudienceRestriction { audiences })
            })
            .collect::<SamlResult<Vec<_>>>()?;
        let not_before = self.instant(el, "@NotBefore", "NotBefore")?;
        let not_on_or_after = self.instant(el, "@NotOnOrAfter", "NotOnOrAfter")?;
        if not_on_or_after <= not_before {
            return Err(SamlError::InvalidField {
                field: "NotOnOrAfter",
                reason: format!("{not_on_or_after} is not after NotBefore {not_before}"),
            });
        }
        Ok(Conditions {
            not_before,
            not_on_or_after,
            audience_restrictions,
        })
    }

    fn authn_statement(&self, el: &Element) -> SamlResult<AuthnStatement> {
        Ok(AuthnStatement {
            authn_instant: self.instant(el, "@AuthnInstant", "AuthnInstant")?,
            session_index: self.text(el, "@SessionIndex")?.unwrap_or_default(),
            authn_context_class_ref: self.required(
                el,
                "saml:AuthnContext/saml:AuthnContextClassRef",
                "AuthnContextClassRef",
            )?,
        })
    }

    fn attribute(&self, el: &Element) -> SamlResult<Attribute> {
        let extra_attributes = el
            .attributes
            .iter()
            .filter_map(|a| match (&a.prefix, &a.namespace) {
                (Some(prefix), Some(namespace)) => Some(ExtraAttribute {
                    prefix: prefix.clone(),
                    namespace: namespace.clone(),
                    name: a.name.clone(),
                    value: a.value.clone(),
                }),
                _ => None,
            })
            .collect();
        let values = el
            .elements()
            .filter(|v| v.is(SAML.uri, "AttributeValue"))
            .map(|v| AttributeValue {
                value_type: v
                    .attribute_ns(XSI.uri, "type")
                    .unwrap_or(DEFAULT_VALUE_TYPE)
                    .to_string(),
                value: v.text(),
            })
            .collect();
        let name = self
            .text(el, "@Name")?
            .filter(|n| !n.is_empty())
            .ok_or_else(|| SamlError::MissingField("Attribute Name".to_string()))?;
        Ok(Attribute {
            name,
            friendly_name: self.text(el, "@FriendlyName")?,
            extra_attributes,
            values,
        })
    }
}
