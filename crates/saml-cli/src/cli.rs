//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use saml_protocol::{NameIdFormat, ProtocolBinding, TopLevelStatusCode};

use crate::config::OutputFormat;

/// samlctl - build, encode, decode and verify SAML protocol messages.
#[derive(Debug, Parser)]
#[command(name = "samlctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Pipeline configuration file (TOML).
    #[arg(short, long, env = "SAMLCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// AuthnRequest commands.
    #[command(subcommand)]
    Request(RequestCommand),

    /// Response commands.
    #[command(subcommand)]
    Response(ResponseCommand),

    /// Decode a transport payload and print the message.
    Decode(DecodeArgs),

    /// Configuration management.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Envelope selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Envelope {
    /// Raw DEFLATE then base64 (HTTP-Redirect).
    #[default]
    Redirect,
    /// Base64 only (HTTP-POST).
    Post,
}

/// Signing key options shared by the encode commands.
#[derive(Debug, Args)]
pub struct SigningArgs {
    /// PEM private key to sign with.
    #[arg(long)]
    pub sign_key: Option<PathBuf>,

    /// PEM certificate published in the signature's KeyInfo.
    #[arg(long, requires = "sign_key")]
    pub sign_cert: Option<PathBuf>,
}

/// AuthnRequest commands.
#[derive(Debug, Subcommand)]
pub enum RequestCommand {
    /// Build and encode an AuthnRequest.
    Encode(RequestEncodeArgs),
}

/// Arguments for `request encode`.
#[derive(Debug, Args)]
pub struct RequestEncodeArgs {
    /// Service provider entity ID.
    #[arg(long)]
    pub issuer: String,

    /// Assertion consumer service URL.
    #[arg(long)]
    pub acs_url: String,

    /// Identity provider SSO URL.
    #[arg(long)]
    pub destination: Option<String>,

    /// Human-readable service provider name.
    #[arg(long)]
    pub provider_name: Option<String>,

    /// Binding the response should be delivered over.
    #[arg(long, value_enum, default_value = "post")]
    pub binding: BindingArg,

    /// Requested NameID format.
    #[arg(long, value_enum)]
    pub name_id_format: Option<NameIdFormatArg>,

    /// Allow the identity provider to create a new identifier.
    #[arg(long, requires = "name_id_format")]
    pub allow_create: bool,

    /// Request passive authentication.
    #[arg(long)]
    pub passive: bool,

    /// Force re-authentication.
    #[arg(long)]
    pub force_authn: bool,

    /// Transport envelope.
    #[arg(long, value_enum, default_value = "redirect")]
    pub envelope: Envelope,

    /// Signing key options.
    #[command(flatten)]
    pub signing: SigningArgs,
}

/// Response commands.
#[derive(Debug, Subcommand)]
pub enum ResponseCommand {
    /// Build and encode a Response, optionally carrying an assertion.
    Encode(ResponseEncodeArgs),
}

/// Arguments for `response encode`.
#[derive(Debug, Args)]
pub struct ResponseEncodeArgs {
    /// Identity provider entity ID.
    #[arg(long)]
    pub issuer: String,

    /// ID of the request being answered.
    #[arg(long)]
    pub in_response_to: Option<String>,

    /// Service provider ACS URL.
    #[arg(long)]
    pub destination: Option<String>,

    /// Top-level status.
    #[arg(long, value_enum, default_value = "success")]
    pub status: StatusArg,

    /// Status message.
    #[arg(long)]
    pub status_message: Option<String>,

    /// Subject NameID; adds an assertion when given.
    #[arg(long)]
    pub name_id: Option<String>,

    /// Audience of the assertion.
    #[arg(long, requires = "name_id")]
    pub audience: Option<String>,

    /// Single-valued attributes as NAME=VALUE.
    #[arg(long = "attribute", requires = "name_id")]
    pub attributes: Vec<String>,

    /// Transport envelope.
    #[arg(long, value_enum, default_value = "post")]
    pub envelope: Envelope,

    /// Signing key options.
    #[command(flatten)]
    pub signing: SigningArgs,
}

/// Arguments for `decode`.
#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Encoded payload; `-` reads standard input.
    pub payload: String,

    /// Transport envelope.
    #[arg(long, value_enum, default_value = "redirect")]
    pub envelope: Envelope,

    /// Verify the root signature before reading the message.
    #[arg(long)]
    pub verify: bool,

    /// Trust only keys from these PEM certificates.
    #[arg(long = "trusted-cert", requires = "verify")]
    pub trusted_certs: Vec<PathBuf>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration.
    Show,

    /// Print the default configuration.
    Defaults,
}

/// Response binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BindingArg {
    /// HTTP-POST.
    Post,
    /// HTTP-Redirect.
    Redirect,
}

impl From<BindingArg> for ProtocolBinding {
    fn from(arg: BindingArg) -> Self {
        match arg {
            BindingArg::Post => Self::HttpPost,
            BindingArg::Redirect => Self::HttpRedirect,
        }
    }
}

/// NameID format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NameIdFormatArg {
    /// Unspecified.
    Unspecified,
    /// Email address.
    Email,
    /// Persistent identifier.
    Persistent,
    /// Transient identifier.
    Transient,
}

impl From<NameIdFormatArg> for NameIdFormat {
    fn from(arg: NameIdFormatArg) -> Self {
        match arg {
            NameIdFormatArg::Unspecified => Self::Unspecified,
            NameIdFormatArg::Email => Self::Email,
            NameIdFormatArg::Persistent => Self::Persistent,
            NameIdFormatArg::Transient => Self::Transient,
        }
    }
}

/// Top-level status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Success.
    Success,
    /// The requester made an error.
    Requester,
    /// The responder failed.
    Responder,
}

impl From<StatusArg> for TopLevelStatusCode {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Success => Self::Success,
            StatusArg::Requester => Self::Requester,
            StatusArg::Responder => Self::Responder,
        }
    }
}
