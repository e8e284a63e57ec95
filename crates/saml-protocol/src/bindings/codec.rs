//! Transport codec.
//!
//! Redirect envelope: `base64(raw-deflate(xml))`, standard alphabet, padded,
//! no zlib header. The POST envelope is the same without compression.
//! Decoding verifies the signature before the populator reads a single
//! field, and hands the populator the very tree that was verified.

use std::io::Read;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::read::DeflateDecoder;

use super::CompressorPool;
use crate::config::CodecConfig;
use crate::error::{SamlError, SamlResult};
use crate::parser;
use crate::serializer;
use crate::signature::{SignatureVerifier, XmlSigner};
use crate::types::{AuthnRequest, ProtocolMessage, Response};
use crate::xml;

/// Encoder and decoder for the redirect and POST envelopes.
#[derive(Debug, Clone)]
pub struct TransportCodec {
    pool: Arc<CompressorPool>,
    verifier: SignatureVerifier,
    max_encoded_size: usize,
    max_inflated_size: usize,
}

/// The default codec verifies against whatever key a message embeds, so a
/// passing check proves the payload is intact but not who signed it. Pin the
/// sender with [`TransportCodec::with_verifier`].
impl Default for TransportCodec {
    fn default() -> Self {
        let config = CodecConfig::default();
        Self {
            pool: Arc::new(CompressorPool::default()),
            verifier: SignatureVerifier::new(),
            max_encoded_size: config.max_encoded_size,
            max_inflated_size: config.max_inflated_size,
        }
    }
}

impl TransportCodec {
    /// Creates a codec around a shared pool.
    #[must_use]
    pub fn new(pool: Arc<CompressorPool>) -> Self {
        Self {
            pool,
            ..Self::default()
        }
    }

    /// Creates a codec and its pool from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] for an invalid compression level.
    pub fn from_config(config: &CodecConfig) -> SamlResult<Self> {
        let pool = CompressorPool::new(config.pool_capacity, config.compression_level)?;
        Ok(Self::new(Arc::new(pool)).with_limits(config.max_encoded_size, config.max_inflated_size))
    }

    /// Sets the largest accepted encoded and inflated sizes, in bytes.
    #[must_use]
    pub const fn with_limits(mut self, max_encoded_size: usize, max_inflated_size: usize) -> Self {
        self.max_encoded_size = max_encoded_size;
        self.max_inflated_size = max_inflated_size;
        self
    }

    /// Sets the verifier used when decoding with `verify` set.
    #[must_use]
    pub fn with_verifier(mut self, verifier: SignatureVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Returns the shared compressor pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<CompressorPool> {
        &self.pool
    }

    /// Serializes, optionally signs, deflates and base64-encodes a message.
    ///
    /// The signature references the message ID.
    ///
    /// # Errors
    ///
    /// Returns the serializer's and signer's errors.
    pub fn encode(&self, message: &ProtocolMessage, signer: Option<&XmlSigner>) -> SamlResult<String> {
        let xml = Self::to_xml(message, signer)?;
        let deflated = self.pool.compress(xml.as_bytes())?;
        let encoded = STANDARD.encode(&deflated);
        tracing::debug!(
            kind = message.element_name(),
            signed = signer.is_some(),
            xml_bytes = xml.len(),
            deflated_bytes = deflated.len(),
            encoded_bytes = encoded.len(),
            "encoded redirect payload"
        );
        Ok(encoded)
    }

    /// Like [`TransportCodec::encode`] without compression.
    ///
    /// # Errors
    ///
    /// Returns the serializer's and signer's errors.
    pub fn encode_post(&self, message: &ProtocolMessage, signer: Option<&XmlSigner>) -> SamlResult<String> {
        let xml = Self::to_xml(message, signer)?;
        let encoded = STANDARD.encode(xml.as_bytes());
        tracing::debug!(
            kind = message.element_name(),
            signed = signer.is_some(),
            xml_bytes = xml.len(),
            encoded_bytes = encoded.len(),
            "encoded post payload"
        );
        Ok(encoded)
    }

    /// Decodes a redirect payload.
    ///
    /// With `verify` set the root signature must validate before anything
    /// is populated. Production call sites must set it.
    ///
    /// Verification uses the configured [`SignatureVerifier`]. Without one
    /// pinned through
    /// `with_verifier(SignatureVerifier::from_pem(&[sender_certificate])?)`
    /// the key embedded in the message is trusted, which proves integrity
    /// but not origin: anyone can sign with their own key and pass.
    ///
    /// # Errors
    ///
    /// - [`SamlError::DecodeFailed`] for bad base64, a corrupt stream, a
    ///   size limit or malformed XML
    /// - [`SamlError::EmptyPayload`] when nothing is left after inflating
    /// - [`SamlError::SignatureInvalid`] or [`SamlError::NoSignaturePresent`]
    /// - the populator's errors
    pub fn decode(&self, encoded: &str, verify: bool) -> SamlResult<ProtocolMessage> {
        let compressed = self.decode_base64(encoded)?;
        let mut inflated = Vec::new();
        let limit = u64::try_from(self.max_inflated_size).unwrap_or(u64::MAX);
        DeflateDecoder::new(compressed.as_slice())
            .take(limit.saturating_add(1))
            .read_to_end(&mut inflated)
            .map_err(|e| SamlError::DecodeFailed(format!("inflate failed: {e}")))?;
        tracing::debug!(
            encoded_bytes = encoded.len(),
            deflated_bytes = compressed.len(),
            xml_bytes = inflated.len(),
            "inflated redirect payload"
        );
        self.finish(inflated, verify)
    }

    /// Decodes a POST payload; see [`TransportCodec::decode`].
    ///
    /// # Errors
    ///
    /// Same as [`TransportCodec::decode`].
    pub fn decode_post(&self, encoded: &str, verify: bool) -> SamlResult<ProtocolMessage> {
        let raw = self.decode_base64(encoded)?;
        tracing::debug!(
            encoded_bytes = encoded.len(),
            xml_bytes = raw.len(),
            "decoded post payload"
        );
        self.finish(raw, verify)
    }

    /// Decodes a redirect payload that must hold an `AuthnRequest`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnexpectedMessage`] for a `Response`, otherwise
    /// the errors of [`TransportCodec::decode`].
    pub fn decode_authn_request(&self, encoded: &str, verify: bool) -> SamlResult<AuthnRequest> {
        match self.decode(encoded, verify)? {
            ProtocolMessage::AuthnRequest(request) => Ok(request),
            other => Err(SamlError::UnexpectedMessage {
                expected: "AuthnRequest",
                actual: other.element_name().to_string(),
            }),
        }
    }

    /// Decodes a POST payload that must hold a `Response`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnexpectedMessage`] for an `AuthnRequest`,
    /// otherwise the errors of [`TransportCodec::decode_post`].
    pub fn decode_response(&self, encoded: &str, verify: bool) -> SamlResult<Response> {
        match self.decode_post(encoded, verify)? {
            ProtocolMessage::Response(response) => Ok(response),
            other => Err(SamlError::UnexpectedMessage {
                expected: "Response",
                actual: other.element_name().to_string(),
            }),
        }
    }

    fn to_xml(message: &ProtocolMessage, signer: Option<&XmlSigner>) -> SamlResult<String> {
        let mut doc = serializer::to_document(message)?;
        if let Some(signer) = signer {
            signer.sign_element(&mut doc.root, message.as_message().id())?;
        }
        Ok(xml::to_string(&doc))
    }

    fn decode_base64(&self, encoded: &str) -> SamlResult<Vec<u8>> {
        if encoded.len() > self.max_encoded_size {
            return Err(SamlError::DecodeFailed(format!(
                "encoded payload exceeds {} bytes",
                self.max_encoded_size
            )));
        }
        // Form posts commonly wrap base64 across lines.
        let compact: String = encoded.split_ascii_whitespace().collect();
        let raw = STANDARD.decode(compact)?;
        if raw.is_empty() {
            return Err(SamlError::EmptyPayload);
        }
        Ok(raw)
    }

    fn finish(&self, raw: Vec<u8>, verify: bool) -> SamlResult<ProtocolMessage> {
        if raw.is_empty() {
            return Err(SamlError::EmptyPayload);
        }
        if raw.len() > self.max_inflated_size {
            return Err(SamlError::DecodeFailed(format!(
                "decoded document exceeds {} bytes",
                self.max_inflated_size
            )));
        }
        let text = String::from_utf8(raw)
            .map_err(|e| SamlError::DecodeFailed(format!("payload is not UTF-8: {e}")))?;

        let mut doc = xml::parse(&text)?;
        if verify {
            doc = self.verifier.verify_document(doc)?;
        } else {
            tracing::debug!("signature verification skipped by caller");
        }
        parser::populate(&doc)
    }
}
