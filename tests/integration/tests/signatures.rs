//! Signature placement, trust and algorithm whitelisting through the codec.

use proptest::prelude::*;
use saml_protocol::error::MethodKind;
use saml_protocol::signature::{
    algorithms, prepare_signature_template, SignatureVerifier, XmlSigner,
};
use saml_protocol::{xml, Response, SamlError, DS, SAMLP};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::common::{unwrap_post, TestEnv, IDP_ENTITY, OTHER_KEY, SP_CERT};

fn response() -> Response {
    Response::new(IDP_ENTITY)
        .with_in_response_to("_request")
        .with_destination("https://sp.example.com/acs")
}

#[test]
fn trusted_certificate_accepts_its_key() -> anyhow::Result<()> {
    let env = TestEnv::new()?.with_verifier(SignatureVerifier::from_pem(&[SP_CERT])?);
    let encoded = env.codec.encode_post(&response().into(), Some(&env.signer))?;
    assert!(env.codec.decode_response(&encoded, true).is_ok());
    Ok(())
}

#[test]
fn trusted_certificate_rejects_other_key() -> anyhow::Result<()> {
    let env = TestEnv::new()?.with_verifier(SignatureVerifier::from_pem(&[SP_CERT])?);
    let intruder = XmlSigner::from_pem(OTHER_KEY, None)?;
    let encoded = env.codec.encode_post(&response().into(), Some(&intruder))?;

    let err = env.codec.decode_response(&encoded, true).unwrap_err();
    assert!(matches!(err, SamlError::SignatureInvalid(_)));
    Ok(())
}

#[test]
fn embedded_key_is_used_without_trust_list() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let intruder = XmlSigner::from_pem(OTHER_KEY, None)?;
    let encoded = env.codec.encode_post(&response().into(), Some(&intruder))?;

    let xml = unwrap_post(&encoded)?;
    assert!(xml.contains("<ds:RSAKeyValue>"));
    assert!(!xml.contains("<ds:X509Data>"));
    assert!(env.codec.decode_response(&encoded, true).is_ok());
    Ok(())
}

#[test]
fn signature_below_the_root_does_not_count() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let encoded = env.codec.encode_post(&response().into(), Some(&env.signer))?;

    let mut doc = xml::parse(&unwrap_post(&encoded)?)?;
    let (_, signature) = doc
        .root
        .take_child(|e| e.is(DS.uri, "Signature"))
        .expect("signature on root");
    doc.root
        .child_mut(SAMLP.uri, "Status")
        .expect("status")
        .children
        .push(xml::Node::Element(signature));
    let moved = STANDARD.encode(xml::to_string(&doc));

    let err = env.codec.decode_response(&moved, true).unwrap_err();
    assert!(matches!(err, SamlError::NoSignaturePresent));
    Ok(())
}

#[test]
fn duplicate_root_signatures_are_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let encoded = env.codec.encode_post(&response().into(), Some(&env.signer))?;

    let mut doc = xml::parse(&unwrap_post(&encoded)?)?;
    let signature = doc
        .root
        .child(DS.uri, "Signature")
        .cloned()
        .expect("signature on root");
    doc.root.push(signature);
    let doubled = STANDARD.encode(xml::to_string(&doc));

    let err = env.codec.decode_response(&doubled, true).unwrap_err();
    assert!(matches!(err, SamlError::SignatureInvalid(_)));
    Ok(())
}

#[test]
fn tampered_post_payload_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let encoded = env.codec.encode_post(&response().into(), Some(&env.signer))?;
    let tampered = unwrap_post(&encoded)?.replace("_request", "_forged");

    let err = env
        .codec
        .decode_response(&STANDARD.encode(tampered), true)
        .unwrap_err();
    assert!(matches!(err, SamlError::SignatureInvalid(_)));
    Ok(())
}

#[test]
fn dsa_templates_cannot_sign_with_rsa_keys() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let template = prepare_signature_template(
        algorithms::EXC_C14N,
        algorithms::DSA_SHA1,
        algorithms::SHA1,
        algorithms::ENVELOPED,
    )?;
    let signer = env.signer.clone().with_template(template);

    let err = env
        .codec
        .encode_post(&response().into(), Some(&signer))
        .unwrap_err();
    assert!(matches!(err, SamlError::UnsupportedKeyType(_)));
    Ok(())
}

proptest! {
    #[test]
    fn only_whitelisted_digests_are_accepted(uri in "[a-z:/#.0-9-]{1,60}") {
        let result = prepare_signature_template(
            algorithms::EXC_C14N,
            algorithms::RSA_SHA1,
            &uri,
            algorithms::ENVELOPED,
        );
        if uri == algorithms::SHA1 {
            prop_assert!(result.is_ok());
        } else {
            let is_unsupported_digest = matches!(
                result,
                Err(SamlError::UnsupportedMethod { kind: MethodKind::Digest, .. })
            );
            prop_assert!(is_unsupported_digest);
        }
    }

    #[test]
    fn only_exclusive_c14n_is_accepted(uri in "http://www\\.w3\\.org/[a-zA-Z0-9/#.-]{1,40}") {
        let result = prepare_signature_template(
            &uri,
            algorithms::RSA_SHA1,
            algorithms::SHA1,
            algorithms::ENVELOPED,
        );
        prop_assert_eq!(result.is_ok(), uri == algorithms::EXC_C14N);
    }
}
