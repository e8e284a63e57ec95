//! Common test utilities and fixtures.

use std::io::{Read, Write};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};
use saml_protocol::bindings::{CompressorPool, TransportCodec};
use saml_protocol::signature::{SignatureVerifier, XmlSigner};

pub const SP_KEY: &str = include_str!("../../../crates/saml-crypto/testdata/sp-key.pem");
pub const SP_CERT: &str = include_str!("../../../crates/saml-crypto/testdata/sp-cert.pem");
pub const OTHER_KEY: &str = include_str!("../../../crates/saml-crypto/testdata/other-key.pem");

pub const SP_ENTITY: &str = "https://sp.example.com";
pub const SP_ACS: &str = "https://sp.example.com/acs";
pub const IDP_ENTITY: &str = "https://idp.example.com";

/// Codec plus signing material shared by a test.
pub struct TestEnv {
    /// Codec under test.
    pub codec: TransportCodec,
    /// Signer holding the SP key and certificate.
    pub signer: XmlSigner,
}

impl TestEnv {
    /// Creates an environment with a small pool.
    pub fn new() -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("saml_protocol=debug")
            .with_test_writer()
            .try_init();

        let pool = Arc::new(CompressorPool::new(4, 6)?);
        Ok(Self {
            codec: TransportCodec::new(pool),
            signer: XmlSigner::from_pem(SP_KEY, Some(SP_CERT))?,
        })
    }

    /// Swaps the codec's verifier.
    pub fn with_verifier(mut self, verifier: SignatureVerifier) -> Self {
        self.codec = self.codec.with_verifier(verifier);
        self
    }
}

/// Decodes a redirect payload to its XML text.
pub fn inflate(encoded: &str) -> anyhow::Result<String> {
    let compressed = STANDARD.decode(encoded)?;
    let mut xml = String::new();
    DeflateDecoder::new(compressed.as_slice()).read_to_string(&mut xml)?;
    Ok(xml)
}

/// Encodes XML text as a redirect payload without going through the codec.
pub fn deflate(xml: &str) -> anyhow::Result<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes())?;
    Ok(STANDARD.encode(encoder.finish()?))
}

/// Decodes a POST payload to its XML text.
pub fn unwrap_post(encoded: &str) -> anyhow::Result<String> {
    Ok(String::from_utf8(STANDARD.decode(encoded)?)?)
}
