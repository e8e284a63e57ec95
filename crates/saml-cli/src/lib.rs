//! # saml-cli
//!
//! Command-line front end for the SAML message pipeline:
//! - Build and encode AuthnRequests and Responses, optionally signed
//! - Decode redirect and POST payloads, optionally verifying the signature
//! - Inspect the effective pipeline configuration

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
