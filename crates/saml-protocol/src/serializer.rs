//! Canonical serializer: message model to XML.
//!
//! Element and attribute order follows the SAML schema. Namespaces are
//! declared where first needed: the protocol root binds `samlp` and `saml`,
//! an embedded assertion adds `xs` and `xsi`, and a stand-alone assertion
//! binds all three itself.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::types::{
    Assertion, Attribute, AuthnRequest, AuthnStatement, Conditions, MessageBase, NameId,
    NameIdPolicy, ProtocolMessage, RequestedAuthnContext, Response, Status, Subject,
    SubjectConfirmation, ExtraAttribute, Namespace, SAML, SAMLP, TIME_FORMAT, XS, XSI,
};
use crate::xml::{self, Document, Element};

/// Formats a timestamp the way every emitted xs:dateTime is written.
#[must_use]
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.format(TIME_FORMAT).to_string()
}

/// Serializes a protocol message to XML text.
///
/// # Errors
///
/// Returns [`SamlError::SerializationFailed`] if a required field is empty.
pub fn serialize(message: &ProtocolMessage) -> SamlResult<String> {
    to_document(message).map(|doc| xml::to_string(&doc))
}

/// Builds the document tree for a protocol message.
///
/// # Errors
///
/// Returns [`SamlError::SerializationFailed`] if a required field is empty.
pub fn to_document(message: &ProtocolMessage) -> SamlResult<Document> {
    let root = match message {
        ProtocolMessage::AuthnRequest(request) => authn_request_element(request)?,
        ProtocolMessage::Response(response) => response_element(response)?,
    };
    Ok(Document::new(root))
}

/// Serializes a stand-alone assertion.
///
/// # Errors
///
/// Returns [`SamlError::SerializationFailed`] if a required field is empty.
pub fn serialize_assertion(assertion: &Assertion) -> SamlResult<String> {
    let mut root = assertion_element(assertion, &[SAML])?;
    root.namespaces.insert(
        0,
        xml::NamespaceDecl {
            prefix: Some(SAML.prefix.to_string()),
            uri: SAML.uri.to_string(),
        },
    );
    Ok(xml::element_to_string(&root))
}

fn message_element(name: &str, base: &MessageBase) -> Element {
    let mut root = Element::new(SAMLP, name)
        .with_namespace(SAMLP)
        .with_namespace(SAML)
        .with_attribute("ID", base.id.as_str())
        .with_attribute("Version", base.version.as_str())
        .with_attribute("IssueInstant", format_instant(&base.issue_instant));
    if let Some(destination) = &base.destination {
        root.set_attribute("Destination", destination.as_str());
    }
    if let Some(consent) = &base.consent {
        root.set_attribute("Consent", consent.as_str());
    }
    root
}

fn issuer_element(issuer: &str) -> Element {
    Element::new(SAML, "Issuer").with_text(issuer)
}

fn authn_request_element(request: &AuthnRequest) -> SamlResult<Element> {
    request.validate()?;
    let mut root = message_element("AuthnRequest", &request.base);
    if request.force_authn {
        root.set_attribute("ForceAuthn", "true");
    }
    if request.is_passive {
        root.set_attribute("IsPassive", "true");
    }
    if let Some(name) = &request.provider_name {
        root.set_attribute("ProviderName", name.as_str());
    }
    root.set_attribute("ProtocolBinding", request.protocol_binding.uri());
    root.set_attribute(
        "AssertionConsumerServiceURL",
        request.assertion_consumer_service_url.as_str(),
    );

    root.push(issuer_element(&request.base.issuer));
    if let Some(policy) = &request.name_id_policy {
        root.push(name_id_policy_element(policy));
    }
    if let Some(context) = &request.requested_authn_context {
        root.push(requested_authn_context_element(context));
    }
    Ok(root)
}

fn name_id_policy_element(policy: &NameIdPolicy) -> Element {
    let mut el = Element::new(SAMLP, "NameIDPolicy");
    if let Some(format) = &policy.format {
        el.set_attribute("Format", format.as_str());
    }
    if let Some(qualifier) = &policy.sp_name_qualifier {
        el.set_attribute("SPNameQualifier", qualifier.as_str());
    }
    el.set_attribute("AllowCreate", bool_str(policy.allow_create));
    el
}

fn requested_authn_context_element(context: &RequestedAuthnContext) -> Element {
    Element::new(SAMLP, "RequestedAuthnContext")
        .with_attribute("Comparison", context.comparison.as_str())
        .with_child(
            Element::new(SAML, "AuthnContextClassRef")
                .with_text(context.authn_context_class_ref.as_str()),
        )
}

fn response_element(response: &Response) -> SamlResult<Element> {
    response.validate()?;
    let mut root = message_element("Response", &response.base);
    if let Some(in_response_to) = &response.in_response_to {
        root.set_attribute("InResponseTo", in_response_to.as_str());
    }
    root.push(issuer_element(&response.base.issuer));
    root.push(status_element(&response.status));
    if let Some(assertion) = &response.assertion {
        root.push(assertion_element(assertion, &[SAMLP, SAML])?);
    }
    Ok(root)
}

fn status_element(status: &Status) -> Element {
    let mut code = Element::new(SAMLP, "StatusCode")
        .with_attribute("Value", status.status_code.top.uri());
    if let Some(sub) = status.status_code.sub {
        code.push(Element::new(SAMLP, "StatusCode").with_attribute("Value", sub.uri()));
    }
    let mut el = Element::new(SAMLP, "Status").with_child(code);
    if let Some(message) = &status.status_message {
        el.push(Element::new(SAMLP, "StatusMessage").with_text(message.as_str()));
    }
    el
}

/// Builds an assertion that relies on an inherited `saml` binding.
///
/// `inherited` lists the bindings in scope at the point of insertion.
fn assertion_element(assertion: &Assertion, inherited: &[Namespace]) -> SamlResult<Element> {
    if assertion.id.is_empty() {
        return Err(SamlError::SerializationFailed(
            "Assertion ID is required".to_string(),
        ));
    }
    if assertion.issuer.is_empty() {
        return Err(SamlError::SerializationFailed(
            "Assertion Issuer is required".to_string(),
        ));
    }

    let mut el = Element::new(SAML, "Assertion")
        .with_namespace(XS)
        .with_namespace(XSI)
        .with_attribute("ID", assertion.id.as_str())
        .with_attribute("Version", assertion.version.as_str())
        .with_attribute("IssueInstant", format_instant(&assertion.issue_instant));

    el.push(issuer_element(&assertion.issuer));
    el.push(subject_element(&assertion.subject));
    el.push(conditions_element(&assertion.conditions)?);
    el.push(authn_statement_element(&assertion.authn_statement));

    if !assertion.attribute_statement.is_empty() {
        let scope: Vec<Namespace> = inherited.iter().copied().chain([XS, XSI]).collect();
        let mut statement = Element::new(SAML, "AttributeStatement");
        for attribute in &assertion.attribute_statement {
            statement.push(attribute_element(attribute, &scope)?);
        }
        el.push(statement);
    }
    Ok(el)
}

fn name_id_element(name_id: &NameId) -> Element {
    let mut el = Element::new(SAML, "NameID");
    if let Some(format) = &name_id.format {
        el.set_attribute("Format", format.as_str());
    }
    el.with_text(name_id.value.as_str())
}

fn subject_element(subject: &Subject) -> Element {
    Element::new(SAML, "Subject")
        .with_child(name_id_element(&subject.name_id))
        .with_child(subject_confirmation_element(&subject.subject_confirmation))
}

fn subject_confirmation_element(confirmation: &SubjectConfirmation) -> Element {
    let data = Element::new(SAML, "SubjectConfirmationData")
        .with_attribute("InResponseTo", confirmation.in_response_to.as_str())
        .with_attribute("Recipient", confirmation.recipient.as_str())
        .with_attribute("NotOnOrAfter", format_instant(&confirmation.not_on_or_after));
    Element::new(SAML, "SubjectConfirmation")
        .with_attribute("Method", confirmation.method.as_str())
        .with_child(data)
}

fn conditions_element(conditions: &Conditions) -> SamlResult<Element> {
    if conditions.not_on_or_after <= conditions.not_before {
        return Err(SamlError::SerializationFailed(format!(
            "Conditions NotOnOrAfter {} is not after NotBefore {}",
            format_instant(&conditions.not_on_or_after),
            format_instant(&conditions.not_before),
        )));
    }
    let mut el = Element::new(SAML, "Conditions")
        .with_attribute("NotBefore", format_instant(&conditions.not_before))
        .with_attribute("NotOnOrAfter", format_instant(&conditions.not_on_or_after));
    for restriction in &conditions.audience_restrictions {
        let mut ar = Element::new(SAML, "AudienceRestriction");
        for audience in &restriction.audiences {
            ar.push(Element::new(SAML, "Audience").with_text(audience.as_str()));
        }
        el.push(ar);
    }
    Ok(el)
}

fn authn_statement_element(statement: &AuthnStatement) -> Element {
    let context = Element::new(SAML, "AuthnContext").with_child(
        Element::new(SAML, "AuthnContextClassRef")
            .with_text(statement.authn_context_class_ref.as_str()),
    );
    Element::new(SAML, "AuthnStatement")
        .with_attribute("AuthnInstant", format_instant(&statement.authn_instant))
        .with_attribute("SessionIndex", statement.session_index.as_str())
        .with_child(context)
}

fn attribute_element(attribute: &Attribute, scope: &[Namespace]) -> SamlResult<Element> {
    if attribute.name.is_empty() {
        return Err(SamlError::SerializationFailed(
            "Attribute Name is required".to_string(),
        ));
    }
    let mut el = Element::new(SAML, "Attribute");
    for extra in &attribute.extra_attributes {
        check_extra_attribute(extra)?;
        if let Some(bound) = scope.iter().find(|ns| ns.prefix == extra.prefix) {
            if bound.uri != extra.namespace {
                return Err(rebound(&extra.prefix, bound.uri, &extra.namespace));
            }
        } else if let Some(decl) = el
            .namespaces
            .iter()
            .find(|d| d.prefix.as_deref() == Some(extra.prefix.as_str()))
        {
            if decl.uri != extra.namespace {
                return Err(rebound(&extra.prefix, &decl.uri, &extra.namespace));
            }
        } else {
            el.namespaces.push(xml::NamespaceDecl {
                prefix: Some(extra.prefix.clone()),
                uri: extra.namespace.clone(),
            });
        }
        if el.attribute_ns(&extra.namespace, &extra.name).is_some() {
            return Err(SamlError::SerializationFailed(format!(
                "duplicate Attribute extension {}:{}",
                extra.prefix, extra.name
            )));
        }
        el.push_prefixed_attribute(&extra.prefix, &extra.namespace, &extra.name, extra.value.as_str());
    }
    el.set_attribute("Name", attribute.name.as_str());
    if let Some(friendly) = &attribute.friendly_name {
        el.set_attribute("FriendlyName", friendly.as_str());
    }
    for value in &attribute.values {
        let mut v = Element::new(SAML, "AttributeValue");
        v.push_prefixed_attribute(XSI.prefix, XSI.uri, "type", value.value_type.as_str());
        el.push(v.with_text(value.value.as_str()));
    }
    Ok(el)
}

/// Checks that an extension attribute can be written as `prefix:name`
/// under its own `xmlns:prefix` declaration.
fn check_extra_attribute(extra: &ExtraAttribute) -> SamlResult<()> {
    if !is_ncname(&extra.prefix) {
        return Err(SamlError::SerializationFailed(format!(
            "invalid Attribute extension prefix {:?}",
            extra.prefix
        )));
    }
    if extra.prefix.eq_ignore_ascii_case("xml") || extra.prefix.eq_ignore_ascii_case("xmlns") {
        return Err(SamlError::SerializationFailed(format!(
            "reserved Attribute extension prefix {:?}",
            extra.prefix
        )));
    }
    if !is_ncname(&extra.name) {
        return Err(SamlError::SerializationFailed(format!(
            "invalid Attribute extension name {:?}",
            extra.name
        )));
    }
    if extra.namespace.is_empty() {
        return Err(SamlError::SerializationFailed(format!(
            "Attribute extension prefix {:?} has no namespace",
            extra.prefix
        )));
    }
    Ok(())
}

fn rebound(prefix: &str, bound: &str, requested: &str) -> SamlError {
    SamlError::SerializationFailed(format!(
        "prefix {prefix:?} is bound to {bound}, cannot rebind it to {requested}"
    ))
}

/// Approximates the XML NCName production.
fn is_ncname(value: &str) -> bool {
    let mut chars = value.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

const fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
