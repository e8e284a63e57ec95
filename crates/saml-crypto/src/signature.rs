//! Digital signature errors.
//!
//! The signing and verification operations themselves live on
//! [`SigningKey`](crate::SigningKey) and [`VerifyingKey`](crate::VerifyingKey).

use thiserror::Error;

/// Error type for key handling and signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Invalid key format or unusable key.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Invalid or mismatched X.509 certificate.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification failed.
    #[error("signature verification failed")]
    Verification,

    /// The key type cannot produce the requested signature.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_error_verification_is_generic() {
        let error = SignatureError::Verification;
        // Don't leak information about why verification failed
        assert_eq!(error.to_string(), "signature verification failed");
    }
}
