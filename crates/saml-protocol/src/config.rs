//! Pipeline configuration.
//!
//! Loaded from TOML by callers; every field has a default so a partial file
//! is enough.

use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};
use crate::signature::SignatureTemplate;

/// Main configuration structure for the message pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamlConfig {
    /// Transport codec configuration.
    pub codec: CodecConfig,
    /// Signature configuration.
    pub signature: SignatureConfig,
}

/// Transport codec configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// DEFLATE level, 0-9.
    pub compression_level: u32,
    /// Maximum number of idle encoders kept in the pool.
    pub pool_capacity: usize,
    /// Largest accepted base64 payload, in bytes.
    pub max_encoded_size: usize,
    /// Largest accepted inflated XML document, in bytes.
    pub max_inflated_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
            pool_capacity: 16,
            max_encoded_size: 128 * 1024,
            max_inflated_size: 64 * 1024,
        }
    }
}

/// Key material attached to produced signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Attach `ds:KeyValue`.
    pub include_key_value: bool,
    /// Attach `ds:X509Data` when the key has a certificate.
    pub include_x509: bool,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            include_key_value: true,
            include_x509: true,
        }
    }
}

impl SignatureConfig {
    /// Returns the default template with these key material settings.
    #[must_use]
    pub fn template(&self) -> SignatureTemplate {
        SignatureTemplate::default()
            .with_key_value(self.include_key_value)
            .with_x509(self.include_x509)
    }
}

impl SamlConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] naming the first invalid setting.
    pub fn validate(&self) -> SamlResult<()> {
        let codec = &self.codec;
        if codec.compression_level > 9 {
            return Err(SamlError::Config(format!(
                "codec.compression_level must be 0-9, got {}",
                codec.compression_level
            )));
        }
        if codec.max_encoded_size == 0 || codec.max_inflated_size == 0 {
            return Err(SamlError::Config("codec size limits must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: SamlConfig = toml::from_str(
            r#"
            [codec]
            compression_level = 9
            "#,
        )
        .unwrap();
        assert_eq!(config.codec.compression_level, 9);
        assert_eq!(config.codec.max_inflated_size, 64 * 1024);
        assert!(config.signature.include_key_value);
        config.validate().unwrap();
    }

    #[test]
    fn out_of_range_level() {
        let mut config = SamlConfig::default();
        config.codec.compression_level = 12;
        assert!(matches!(config.validate(), Err(SamlError::Config(_))));
    }

    #[test]
    fn template_follows_settings() {
        let config = SignatureConfig {
            include_key_value: false,
            include_x509: true,
        };
        let template = config.template();
        assert!(!template.include_key_value);
        assert!(template.include_x509);
    }
}
