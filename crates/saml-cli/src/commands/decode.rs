//! Payload decoding.

use std::io::Read;

use saml_crypto::VerifyingKey;
use saml_protocol::bindings::TransportCodec;
use saml_protocol::signature::SignatureVerifier;
use saml_protocol::ProtocolMessage;

use super::read_file;
use crate::cli::{DecodeArgs, Envelope};
use crate::config::OutputFormat;
use crate::output::{output_single, success, warning};
use crate::CliConfig;

/// Runs the decode command.
pub fn run_decode(args: DecodeArgs, config: &CliConfig, format: OutputFormat) -> crate::CliResult<()> {
    let payload = if args.payload == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        args.payload.clone()
    };

    let message = decode(&payload, &args, config)?;
    if args.verify {
        success(&format!("{} signature verified", message.element_name()));
    } else {
        warning("signature not verified; do not trust these fields");
    }
    match &message {
        ProtocolMessage::AuthnRequest(request) => output_single(request, format),
        ProtocolMessage::Response(response) => output_single(response, format),
    }
}

/// Decodes `payload` as the arguments describe.
pub fn decode(payload: &str, args: &DecodeArgs, config: &CliConfig) -> crate::CliResult<ProtocolMessage> {
    let trusted = args
        .trusted_certs
        .iter()
        .map(|path| -> crate::CliResult<VerifyingKey> {
            Ok(VerifyingKey::from_certificate_pem(&read_file(path)?)?)
        })
        .collect::<crate::CliResult<Vec<_>>>()?;
    let codec = TransportCodec::from_config(&config.saml.codec)?
        .with_verifier(SignatureVerifier::new().with_trusted_keys(trusted));

    let message = match args.envelope {
        Envelope::Redirect => codec.decode(payload.trim(), args.verify)?,
        Envelope::Post => codec.decode_post(payload.trim(), args.verify)?,
    };
    Ok(message)
}
