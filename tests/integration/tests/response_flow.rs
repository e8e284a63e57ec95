//! Responses over the POST envelope, from a request to a validated assertion.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use saml_protocol::{
    Assertion, Attribute, AuthnContextClass, AuthnStatement, Conditions, Message, NameId,
    ProtocolBinding, Response, SamlError, Status, Subject, SubjectConfirmation,
    DEFAULT_VALIDITY_MINUTES,
};

use crate::common::{unwrap_post, TestEnv, IDP_ENTITY, SP_ACS, SP_ENTITY};

fn assertion_for(request_id: &str) -> Assertion {
    let now = Utc::now();
    let subject = Subject::new(
        NameId::email("alice@example.com"),
        SubjectConfirmation::bearer(request_id, SP_ACS, now + Duration::minutes(5)),
    );
    Assertion::new(IDP_ENTITY, subject)
        .with_conditions(Conditions::new(now).with_audience(SP_ENTITY))
        .with_authn_statement(
            AuthnStatement::new(now, AuthnContextClass::PasswordProtectedTransport)
                .with_session_index("_session"),
        )
        .with_attribute(Attribute::single("mail", "alice@example.com"))
        .with_attribute(Attribute::multi(
            "groups",
            vec!["admins".to_string(), "staff".to_string()],
        ))
}

#[test]
fn request_to_assertion() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    // The SP sends a request; the IdP decodes it and answers over POST.
    let request = saml_protocol::AuthnRequest::new(SP_ENTITY, SP_ACS)
        .with_binding(ProtocolBinding::HttpPost);
    let received = env
        .codec
        .decode_authn_request(&env.codec.encode(&request.into(), None)?, false)?;

    let response = Response::new(IDP_ENTITY)
        .with_in_response_to(received.id())
        .with_destination(received.assertion_consumer_service_url.clone())
        .with_assertion(assertion_for(received.id()));
    let encoded = env.codec.encode_post(&response.clone().into(), Some(&env.signer))?;

    let decoded = env.codec.decode_response(&encoded, true)?;
    assert_eq!(decoded, response);
    assert_eq!(decoded.in_response_to(), Some(received.id()));

    let assertion = decoded.assertion.expect("assertion");
    assertion.validate(SP_ENTITY, Utc::now())?;
    assert_eq!(assertion.attribute("groups").map(|a| a.values.len()), Some(2));
    assert_eq!(assertion.subject.subject_confirmation.recipient, SP_ACS);
    Ok(())
}

#[test]
fn error_response_has_no_assertion() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let response = Response::error(
        IDP_ENTITY,
        "_request",
        Status::requester_error("unknown service provider"),
    );

    let encoded = env.codec.encode_post(&response.clone().into(), None)?;
    let xml = unwrap_post(&encoded)?;
    assert!(!xml.contains("Assertion"));
    assert!(xml.contains("urn:oasis:names:tc:SAML:2.0:status:Requester"));

    let decoded = env.codec.decode_response(&encoded, false)?;
    assert!(!decoded.is_success());
    assert!(decoded.assertion.is_none());
    assert_eq!(decoded, response);
    Ok(())
}

#[test]
fn assertion_validation_bounds() -> anyhow::Result<()> {
    let assertion = assertion_for("_request");
    let start = assertion.conditions.not_before;

    assert!(assertion.validate(SP_ENTITY, start).is_ok());
    assert!(matches!(
        assertion.validate(SP_ENTITY, start - Duration::seconds(1)),
        Err(SamlError::InvalidField { .. })
    ));
    assert!(matches!(
        assertion.validate(SP_ENTITY, assertion.conditions.not_on_or_after),
        Err(SamlError::InvalidField { .. })
    ));
    assert!(matches!(
        assertion.validate("https://other.example.com", start),
        Err(SamlError::InvalidField { field: "Audience", .. })
    ));
    Ok(())
}

#[test]
fn request_posted_where_response_expected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = saml_protocol::AuthnRequest::new(SP_ENTITY, SP_ACS);
    let encoded = env.codec.encode_post(&request.into(), None)?;

    let err = env.codec.decode_response(&encoded, false).unwrap_err();
    assert!(matches!(
        err,
        SamlError::UnexpectedMessage { expected: "Response", .. }
    ));
    Ok(())
}

proptest! {
    #[test]
    fn default_conditions_span_eleven_minutes(offset in -1_000_000_000i64..1_000_000_000i64) {
        let start = Utc::now() + Duration::seconds(offset);
        let conditions = Conditions::new(start);
        prop_assert_eq!(
            conditions.not_on_or_after - conditions.not_before,
            Duration::minutes(DEFAULT_VALIDITY_MINUTES)
        );
        prop_assert_eq!(DEFAULT_VALIDITY_MINUTES, 11);
    }

    #[test]
    fn moved_window_keeps_its_length(offset in 0i64..86_400) {
        let mut conditions = Conditions::new(Utc::now());
        conditions.set_not_before(conditions.not_before + Duration::seconds(offset));
        prop_assert_eq!(
            conditions.not_on_or_after - conditions.not_before,
            Duration::minutes(11)
        );
    }
}
