//! AuthnRequest over the redirect envelope.

use std::sync::Arc;
use std::thread;

use chrono::{TimeZone, Utc};
use saml_protocol::{
    parser, AuthnRequest, FailureCategory, Message, NameIdFormat, NameIdPolicy, ProtocolBinding, ProtocolMessage,
    SamlError,
};

use crate::common::{deflate, inflate, TestEnv, SP_ACS, SP_ENTITY};

const GOOGLE_REQUEST: &str = "fVLJTsMwEL0j8Q+W79mK2KwmVQEhKrFENHDg5iQTx8Wxg8dp4e9xUxBwoDfr+fkt45nO3jtF1mBRGp3SJIwpAV2ZWmqR0qfiOjijs+zwYIq8Uz2bD67Vj/A2ADriX2pk40VKB6uZ4SiRad4BMlex5fzulk3CmPXWOFMZRcniKqWm4bxswPuZUpVi1b42r7wRUgkhoF+Jtu51X5qWkufvWJNtrAXiAAuNjmvnoTg5CeIkiE+L+IhNzll8/EJJ/uV0IfWuwb5Y5Y6E7KYo8iB/WBajwFrWYO89O6XCGKEgrEy3tc85olx7uOEKgZI5IljnA14ajUMHdgl2LSt4erxNaetcjyyKNptN+CMT8UiEbb09h6s+4hXSbBwtG9vZXzPdn51/e9PsP/Vp9Es4+/rAba/FVW6UrD7IXCmzubTAnS/l7OA7XRvbcfe/dxImIyLroBmpbNDYQyUbCTUlUbZz/bspfn8+AQ==";

fn foo_provider_request() -> AuthnRequest {
    AuthnRequest::new(SP_ENTITY, "http://sp.example.com/acs")
        .with_id("809707f0030a5d00620c9d9df97f627afe9dcc24")
        .with_provider_name("FooProvider")
        .with_binding(ProtocolBinding::HttpPost)
        .with_name_id_policy(NameIdPolicy::new(NameIdFormat::Email, true))
}

#[test]
fn unsigned_request_round_trip() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = foo_provider_request();

    let encoded = env.codec.encode(&request.clone().into(), None)?;
    let decoded = env.codec.decode_authn_request(&encoded, false)?;

    assert_eq!(decoded.id(), "809707f0030a5d00620c9d9df97f627afe9dcc24");
    assert_eq!(decoded.provider_name.as_deref(), Some("FooProvider"));
    assert_eq!(decoded.protocol_binding, ProtocolBinding::HttpPost);
    assert_eq!(decoded.assertion_consumer_service_url, "http://sp.example.com/acs");
    let policy = decoded.name_id_policy.as_ref().expect("name id policy");
    assert_eq!(policy.parsed_format(), Some(NameIdFormat::Email));
    assert!(policy.allow_create);
    assert_eq!(decoded, request);
    Ok(())
}

#[test]
fn decodes_third_party_request() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = env.codec.decode_authn_request(GOOGLE_REQUEST, false)?;

    assert_eq!(request.id(), "ofaabfeionoblbgjhkfkafgilgggepjghdpnpboh");
    assert_eq!(request.issue_instant(), Utc.with_ymd_and_hms(2016, 1, 7, 3, 29, 5).unwrap());
    assert_eq!(request.issuer(), "google.com/a/g.hde.co.jp");
    assert_eq!(request.protocol_binding, ProtocolBinding::HttpPost);
    assert_eq!(request.provider_name.as_deref(), Some("google.com"));
    assert!(!request.is_passive);
    assert_eq!(
        request.assertion_consumer_service_url,
        "https://www.google.com/a/g.hde.co.jp/acs"
    );
    let policy = request.name_id_policy.expect("name id policy");
    assert!(policy.allow_create);
    assert_eq!(policy.parsed_format(), Some(NameIdFormat::Unspecified));
    Ok(())
}

#[test]
fn third_party_request_fails_verification() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let err = env.codec.decode_authn_request(GOOGLE_REQUEST, true).unwrap_err();
    assert!(matches!(err, SamlError::NoSignaturePresent));
    Ok(())
}

#[test]
fn signed_request_round_trip() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = AuthnRequest::new(SP_ENTITY, SP_ACS)
        .with_destination("https://idp.example.com/sso")
        .with_name_id_policy(NameIdPolicy::new(NameIdFormat::Transient, true));

    let encoded = env.codec.encode(&request.clone().into(), Some(&env.signer))?;
    let xml = inflate(&encoded)?;
    assert!(xml.contains("<ds:Signature"));
    assert!(xml.contains(&format!(r##"URI="#{}""##, request.id())));

    let decoded = env.codec.decode_authn_request(&encoded, true)?;
    assert_eq!(decoded, request);
    Ok(())
}

#[test]
fn tampered_request_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = AuthnRequest::new(SP_ENTITY, SP_ACS);
    let encoded = env.codec.encode(&request.into(), Some(&env.signer))?;

    let tampered = inflate(&encoded)?.replace(SP_ACS, "https://evil.example.com/acs");
    let err = env.codec.decode(&deflate(&tampered)?, true).unwrap_err();
    assert!(matches!(err, SamlError::SignatureInvalid(_)));
    assert_eq!(err.category(), FailureCategory::AuthenticationFailed);

    // Without verification the edit goes unnoticed.
    let decoded = env.codec.decode_authn_request(&deflate(&tampered)?, false)?;
    assert_eq!(decoded.assertion_consumer_service_url, "https://evil.example.com/acs");
    Ok(())
}

#[test]
fn unknown_binding_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let encoded = env.codec.encode(&foo_provider_request().into(), None)?;
    let xml = inflate(&encoded)?.replace(
        ProtocolBinding::HttpPost.uri(),
        "urn:oasis:names:tc:SAML:2.0:bindings:PAOS",
    );

    let err = env.codec.decode(&deflate(&xml)?, false).unwrap_err();
    assert!(matches!(err, SamlError::InvalidEnum { field: "ProtocolBinding", .. }));
    Ok(())
}

#[test]
fn codec_limits_apply_to_inflated_size() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut request = foo_provider_request();
    request.provider_name = Some("x".repeat(4096));
    let encoded = env.codec.encode(&request.into(), None)?;

    let strict = env.codec.clone().with_limits(128 * 1024, 1024);
    assert!(encoded.len() < 1024);
    assert!(matches!(strict.decode(&encoded, false), Err(SamlError::DecodeFailed(_))));
    Ok(())
}

#[test]
fn pool_is_shared_across_threads() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let codec = Arc::new(env.codec);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let codec = Arc::clone(&codec);
            thread::spawn(move || -> Result<(), SamlError> {
                for _ in 0..16 {
                    let request = AuthnRequest::new(format!("https://sp{i}.example.com"), SP_ACS);
                    let encoded = codec.encode(&request.clone().into(), None)?;
                    assert_eq!(codec.decode_authn_request(&encoded, false)?, request);
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked")?;
    }
    assert!(codec.pool().idle() <= codec.pool().capacity());
    Ok(())
}

#[test]
fn codec_and_parser_agree() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = foo_provider_request();
    let encoded = env.codec.encode(&request.clone().into(), None)?;

    let parsed = parser::parse_message(&inflate(&encoded)?)?;
    assert_eq!(parsed, ProtocolMessage::AuthnRequest(request));
    Ok(())
}
