//! Signing and verification keys.
//!
//! Keys are RSA only. The XML-DSig profile also names DSA-SHA1, but DSA keys
//! cannot be loaded here; callers asking for a DSA signature get
//! [`SignatureError::UnsupportedKeyType`] from the protocol layer.
//!
//! ## Accepted encodings
//!
//! - Private keys: PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`), PEM or DER
//! - Public keys: `SubjectPublicKeyInfo` PEM, X.509 certificates, or the raw
//!   modulus/exponent pair carried by an XML-DSig `RSAKeyValue`

use base64::Engine;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::signature::SignatureError;

/// Minimum modulus size accepted for signing keys.
pub const MIN_SIGNING_KEY_BITS: usize = 2048;

/// Minimum modulus size accepted when verifying third-party signatures.
pub const MIN_VERIFYING_KEY_BITS: usize = 1024;

/// Key algorithm families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum KeyType {
    /// RSA key pair.
    Rsa,
}

impl KeyType {
    /// Returns the algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
        }
    }
}

/// RSA private key used to produce XML signatures.
///
/// Optionally carries the X.509 certificate for the key, which is then
/// published in the signature's `KeyInfo/X509Data`.
#[derive(Clone)]
pub struct SigningKey {
    key: RsaPrivateKey,
    certificate_der: Option<Vec<u8>>,
    key_id: String,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("has_x509", &self.certificate_der.is_some())
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Loads a private key from PEM, accepting PKCS#1 and PKCS#8 labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is neither a `PRIVATE KEY` nor an
    /// `RSA PRIVATE KEY` document or the key is too small.
    pub fn from_pem(pem: &str) -> Result<Self, SignatureError> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem).or_else(|pkcs8| {
            RsaPrivateKey::from_pkcs1_pem(pem).map_err(|pkcs1| {
                SignatureError::InvalidKey(format!(
                    "Invalid RSA private key PEM: PKCS#8: {pkcs8}; PKCS#1: {pkcs1}"
                ))
            })
        })?;
        Self::from_private_key(key)
    }

    /// Loads a private key from DER, trying PKCS#8 first and then PKCS#1.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are neither encoding or the key is too
    /// small.
    pub fn from_der(der: &[u8]) -> Result<Self, SignatureError> {
        let key = RsaPrivateKey::from_pkcs8_der(der)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(der))
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA DER key: {e}")))?;
        Self::from_private_key(key)
    }

    fn from_private_key(key: RsaPrivateKey) -> Result<Self, SignatureError> {
        let bits = key.size() * 8;
        if bits < MIN_SIGNING_KEY_BITS {
            return Err(SignatureError::InvalidKey(format!(
                "RSA key size {bits} bits is below the minimum of {MIN_SIGNING_KEY_BITS} bits"
            )));
        }
        let key_id = generate_key_id(&key.n().to_bytes_be());
        Ok(Self {
            key,
            certificate_der: None,
            key_id,
        })
    }

    /// Attaches the PEM encoded X.509 certificate for this key.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed or certifies a
    /// different public key.
    pub fn with_certificate_pem(self, pem: &str) -> Result<Self, SignatureError> {
        self.with_certificate_der(decode_certificate_pem(pem)?)
    }

    /// Attaches the DER encoded X.509 certificate for this key.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed or certifies a
    /// different public key.
    pub fn with_certificate_der(mut self, der: Vec<u8>) -> Result<Self, SignatureError> {
        let certified = VerifyingKey::from_certificate_der(&der)?;
        if certified.key != self.key.to_public_key() {
            return Err(SignatureError::InvalidCertificate(
                "certificate does not match the private key".to_string(),
            ));
        }
        self.certificate_der = Some(der);
        Ok(self)
    }

    /// Returns the key type.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        KeyType::Rsa
    }

    /// Returns the key ID derived from the public modulus.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns true if an X.509 certificate is attached.
    #[must_use]
    pub const fn has_x509(&self) -> bool {
        self.certificate_der.is_some()
    }

    /// Returns the attached certificate in DER form.
    #[must_use]
    pub fn certificate_der(&self) -> Option<&[u8]> {
        self.certificate_der.as_deref()
    }

    /// Returns the public half of this key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            key: self.key.to_public_key(),
            key_id: self.key_id.clone(),
        }
    }

    /// Signs data with RSA PKCS#1 v1.5 over SHA-1.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSA operation fails.
    pub fn sign_sha1(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let signer = pkcs1v15::SigningKey::<Sha1>::new(self.key.clone());
        let signature = signer
            .try_sign(data)
            .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;
        Ok(signature.to_vec())
    }
}

/// RSA public key used to check XML signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyingKey {
    key: RsaPublicKey,
    key_id: String,
}

impl VerifyingKey {
    /// Builds a key from the big-endian modulus and exponent of an
    /// `RSAKeyValue`.
    ///
    /// # Errors
    ///
    /// Returns an error if the components do not form a usable RSA key.
    pub fn from_components(modulus: &[u8], exponent: &[u8]) -> Result<Self, SignatureError> {
        let key = RsaPublicKey::new(BigUint::from_bytes_be(modulus), BigUint::from_bytes_be(exponent))
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA key value: {e}")))?;
        Self::from_public_key(key)
    }

    /// Extracts the public key from a DER encoded X.509 certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed or does not hold
    /// an RSA key.
    pub fn from_certificate_der(der: &[u8]) -> Result<Self, SignatureError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| SignatureError::InvalidCertificate(format!("Failed to parse certificate: {e}")))?;
        let spki = cert.public_key().raw;
        let key = RsaPublicKey::from_public_key_der(spki)
            .map_err(|e| SignatureError::InvalidCertificate(format!("certificate key is not RSA: {e}")))?;
        Self::from_public_key(key)
    }

    /// Extracts the public key from a PEM encoded X.509 certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if no certificate block is present or it cannot be
    /// parsed.
    pub fn from_certificate_pem(pem: &str) -> Result<Self, SignatureError> {
        Self::from_certificate_der(&decode_certificate_pem(pem)?)
    }

    /// Loads a `SubjectPublicKeyInfo` PEM (`PUBLIC KEY`).
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a `PUBLIC KEY` document or the
    /// key is not RSA.
    pub fn from_public_key_pem(pem: &str) -> Result<Self, SignatureError> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA public key PEM: {e}")))?;
        Self::from_public_key(key)
    }

    fn from_public_key(key: RsaPublicKey) -> Result<Self, SignatureError> {
        let bits = key.size() * 8;
        if bits < MIN_VERIFYING_KEY_BITS {
            return Err(SignatureError::InvalidKey(format!(
                "RSA key size {bits} bits is below the minimum of {MIN_VERIFYING_KEY_BITS} bits"
            )));
        }
        let key_id = generate_key_id(&key.n().to_bytes_be());
        Ok(Self { key, key_id })
    }

    /// Returns the key ID derived from the public modulus.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the big-endian modulus.
    #[must_use]
    pub fn modulus(&self) -> Vec<u8> {
        self.key.n().to_bytes_be()
    }

    /// Returns the big-endian public exponent.
    #[must_use]
    pub fn exponent(&self) -> Vec<u8> {
        self.key.e().to_bytes_be()
    }

    /// Verifies an RSA PKCS#1 v1.5 SHA-1 signature.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Verification`] if the signature does not
    /// match. The error carries no detail on purpose.
    pub fn verify_sha1(&self, data: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        let verifier = pkcs1v15::VerifyingKey::<Sha1>::new(self.key.clone());
        let signature =
            pkcs1v15::Signature::try_from(signature).map_err(|_| SignatureError::Verification)?;
        verifier
            .verify(data, &signature)
            .map_err(|_| SignatureError::Verification)
    }
}

/// Decodes the first PEM block of `pem`, which must be a `CERTIFICATE`.
fn decode_certificate_pem(pem: &str) -> Result<Vec<u8>, SignatureError> {
    let (_, block) = parse_x509_pem(pem.as_bytes())
        .map_err(|e| SignatureError::InvalidCertificate(format!("Invalid certificate PEM: {e}")))?;
    if block.label != "CERTIFICATE" {
        return Err(SignatureError::InvalidCertificate(format!(
            "expected a CERTIFICATE PEM block, found {}",
            block.label
        )));
    }
    Ok(block.contents)
}

/// Generates a key ID from the public modulus.
fn generate_key_id(modulus: &[u8]) -> String {
    let hash = crate::sha1(modulus);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&hash[..8])
}
