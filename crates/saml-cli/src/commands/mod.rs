//! Command implementations.

pub mod config;
pub mod decode;
pub mod request;
pub mod response;

pub use config::run_config;
pub use decode::run_decode;
pub use request::run_request;
pub use response::run_response;

use std::path::Path;

use saml_crypto::SigningKey;
use saml_protocol::bindings::TransportCodec;
use saml_protocol::signature::XmlSigner;
use saml_protocol::ProtocolMessage;

use crate::cli::{Envelope, SigningArgs};
use crate::CliConfig;

fn read_file(path: &Path) -> crate::CliResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        crate::CliError::InvalidArgument(format!("cannot read {}: {e}", path.display()))
    })
}

/// Builds a signer from the signing options, if a key was given.
fn load_signer(args: &SigningArgs, config: &CliConfig) -> crate::CliResult<Option<XmlSigner>> {
    let Some(key_path) = &args.sign_key else {
        return Ok(None);
    };
    let mut key = SigningKey::from_pem(&read_file(key_path)?)?;
    if let Some(cert_path) = &args.sign_cert {
        key = key.with_certificate_pem(&read_file(cert_path)?)?;
    }
    tracing::debug!(key_id = key.key_id(), x509 = key.has_x509(), "signing key loaded");
    Ok(Some(
        XmlSigner::new(key).with_template(config.saml.signature.template()),
    ))
}

/// Encodes with the codec built from configuration.
fn encode(
    message: &ProtocolMessage,
    envelope: Envelope,
    signer: Option<&XmlSigner>,
    config: &CliConfig,
) -> crate::CliResult<String> {
    let codec = TransportCodec::from_config(&config.saml.codec)?;
    let encoded = match envelope {
        Envelope::Redirect => codec.encode(message, signer)?,
        Envelope::Post => codec.encode_post(message, signer)?,
    };
    Ok(encoded)
}
