//! AuthnRequest commands.

use saml_protocol::bindings::SAML_REQUEST_PARAM;
use saml_protocol::{AuthnRequest, NameIdPolicy};

use super::{encode, load_signer};
use crate::cli::{RequestCommand, RequestEncodeArgs};
use crate::config::OutputFormat;
use crate::output::payload;
use crate::CliConfig;

/// Runs a request command.
pub fn run_request(cmd: RequestCommand, config: &CliConfig, format: OutputFormat) -> crate::CliResult<()> {
    match cmd {
        RequestCommand::Encode(args) => encode_request(args, config, format),
    }
}

/// Builds the AuthnRequest described by the arguments.
pub fn build_request(args: &RequestEncodeArgs) -> AuthnRequest {
    let mut request = AuthnRequest::new(args.issuer.as_str(), args.acs_url.as_str())
        .with_binding(args.binding.into())
        .force_authn(args.force_authn)
        .is_passive(args.passive);
    if let Some(destination) = &args.destination {
        request = request.with_destination(destination.as_str());
    }
    if let Some(name) = &args.provider_name {
        request = request.with_provider_name(name.as_str());
    }
    if let Some(format) = args.name_id_format {
        request = request.with_name_id_policy(NameIdPolicy::new(format.into(), args.allow_create));
    }
    request
}

fn encode_request(args: RequestEncodeArgs, config: &CliConfig, format: OutputFormat) -> crate::CliResult<()> {
    let request = build_request(&args);
    let signer = load_signer(&args.signing, config)?;
    tracing::info!(id = %request.base.id, signed = signer.is_some(), "encoding AuthnRequest");
    let encoded = encode(&request.into(), args.envelope, signer.as_ref(), config)?;
    payload(SAML_REQUEST_PARAM, &encoded, format)
}
