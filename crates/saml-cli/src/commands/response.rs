//! Response commands.

use saml_protocol::bindings::SAML_RESPONSE_PARAM;
use saml_protocol::{
    Assertion, Attribute, Conditions, NameId, Response, Status, StatusCode, Subject,
    SubjectConfirmation,
};

use super::{encode, load_signer};
use crate::cli::{ResponseCommand, ResponseEncodeArgs};
use crate::config::OutputFormat;
use crate::output::payload;
use crate::CliConfig;

/// Runs a response command.
pub fn run_response(cmd: ResponseCommand, config: &CliConfig, format: OutputFormat) -> crate::CliResult<()> {
    match cmd {
        ResponseCommand::Encode(args) => encode_response(args, config, format),
    }
}

/// Builds the Response described by the arguments.
pub fn build_response(args: &ResponseEncodeArgs) -> crate::CliResult<Response> {
    let mut status = Status::new(StatusCode::new(args.status.into()));
    if let Some(message) = &args.status_message {
        status = status.with_message(message.as_str());
    }
    let mut response = Response::new(args.issuer.as_str()).with_status(status);
    if let Some(id) = &args.in_response_to {
        response = response.with_in_response_to(id.as_str());
    }
    if let Some(destination) = &args.destination {
        response = response.with_destination(destination.as_str());
    }

    if let Some(name_id) = &args.name_id {
        let issued = response.base.issue_instant;
        let mut conditions = Conditions::new(issued);
        if let Some(audience) = &args.audience {
            conditions.add_audience(audience.as_str());
        }
        let confirmation = SubjectConfirmation::bearer(
            args.in_response_to.clone().unwrap_or_default(),
            args.destination.clone().unwrap_or_default(),
            conditions.not_on_or_after,
        );
        let mut assertion = Assertion::new(
            args.issuer.as_str(),
            Subject::new(NameId::new(name_id.as_str()), confirmation),
        )
        .with_conditions(conditions);
        for pair in &args.attributes {
            let (name, value) = pair.split_once('=').ok_or_else(|| {
                crate::CliError::InvalidArgument(format!("attribute {pair:?} is not NAME=VALUE"))
            })?;
            assertion.add_attribute(Attribute::single(name, value));
        }
        response = response.with_assertion(assertion);
    }
    Ok(response)
}

fn encode_response(args: ResponseEncodeArgs, config: &CliConfig, format: OutputFormat) -> crate::CliResult<()> {
    let response = build_response(&args)?;
    let signer = load_signer(&args.signing, config)?;
    tracing::info!(
        id = %response.base.id,
        assertion = response.assertion.is_some(),
        signed = signer.is_some(),
        "encoding Response"
    );
    let encoded = encode(&response.into(), args.envelope, signer.as_ref(), config)?;
    payload(SAML_RESPONSE_PARAM, &encoded, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, Command};

    fn args(extra: &[&str]) -> ResponseEncodeArgs {
        let mut argv = vec![
            "samlctl",
            "response",
            "encode",
            "--issuer",
            "https://idp.example.com",
            "--in-response-to",
            "_req",
            "--destination",
            "https://sp.example.com/acs",
        ];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Response(ResponseCommand::Encode(args)) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn status_only_response_has_no_assertion() {
        let response = build_response(&args(&["--status", "requester"])).unwrap();
        assert!(response.assertion.is_none());
        assert!(!response.is_success());
    }

    #[test]
    fn assertion_follows_request() {
        let response = build_response(&args(&[
            "--name-id",
            "alice@example.com",
            "--audience",
            "https://sp.example.com",
            "--attribute",
            "mail=alice@example.com",
        ]))
        .unwrap();
        let assertion = response.assertion.unwrap();
        let confirmation = &assertion.subject.subject_confirmation;
        assert_eq!(confirmation.in_response_to, "_req");
        assert_eq!(confirmation.recipient, "https://sp.example.com/acs");
        assert!(assertion.conditions.allows_audience("https://sp.example.com"));
        assert_eq!(assertion.attribute("mail").unwrap().values[0].value, "alice@example.com");
    }

    #[test]
    fn malformed_attribute() {
        let result = build_response(&args(&["--name-id", "alice", "--attribute", "novalue"]));
        assert!(matches!(result, Err(crate::CliError::InvalidArgument(_))));
    }
}
