//! CLI error types.

use saml_crypto::SignatureError;
use saml_protocol::SamlError;
use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Pipeline error.
    #[error(transparent)]
    Saml(#[from] SamlError),

    /// Key or certificate could not be loaded.
    #[error("key error: {0}")]
    Key(#[from] SignatureError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
