//! # samlctl
//!
//! Encode, decode and verify SAML protocol messages.

#![forbid(unsafe_code)]

use clap::Parser;
use saml_cli::{
    cli::{Cli, Command},
    commands::{run_config, run_decode, run_request, run_response},
    config::CliConfig,
    output::error,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error(&format!("Failed to load configuration: {e}"));
            std::process::exit(1);
        }
    };
    let format = cli.output.unwrap_or(config.output_format);

    let result = match cli.command {
        Command::Request(cmd) => run_request(cmd, &config, format),
        Command::Response(cmd) => run_response(cmd, &config, format),
        Command::Decode(args) => run_decode(args, &config, format),
        Command::Config(cmd) => run_config(cmd, &config),
    };

    if let Err(e) = result {
        match &e {
            saml_cli::CliError::Saml(err) => {
                tracing::debug!(error = %err, "command failed");
                error(&format!("{e} ({:?})", err.category()));
            }
            _ => error(&e.to_string()),
        }
        std::process::exit(1);
    }
}
