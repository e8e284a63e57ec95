//! CLI configuration.

use std::path::{Path, PathBuf};

use saml_protocol::SamlConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration: the pipeline settings plus presentation options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Output format.
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Pipeline settings.
    #[serde(default, flatten)]
    pub saml: SamlConfig,
}

impl CliConfig {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// A missing file at the default location yields the defaults; an
    /// explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> crate::CliResult<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            crate::CliError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates TOML.
    pub fn from_toml(content: &str) -> crate::CliResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| crate::CliError::Config(format!("failed to parse config: {e}")))?;
        config.saml.validate()?;
        Ok(config)
    }

    /// Renders as TOML.
    pub fn to_toml(&self) -> crate::CliResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::CliError::Config(format!("failed to serialize config: {e}")))
    }

    /// `samlctl.toml` in the working directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from("samlctl.toml")
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Table,
    /// JSON format.
    Json,
    /// Quiet (payload only).
    Quiet,
}
