//! SAML 2.0 Web Browser SSO message pipeline.
//!
//! This crate covers the AuthnRequest/Response cycle end to end:
//!
//! - **Message model** - typed requests, responses and assertions
//! - **Canonical serializer** - schema-ordered XML with fixed namespace placement
//! - **Signature adapter** - whitelisted enveloped XML-DSig signing and verification
//! - **Transport codec** - redirect and POST envelopes with verify-before-parse decoding
//! - **Populator** - XML back into the model with closed enums
//!
//! # Architecture
//!
//! - [`types`] - message model
//! - [`serializer`] - model to XML
//! - [`xml`] - owned tree, reader, writer, canonicalization, path queries
//! - [`signature`] - signing and verification behind [`signature::XmlSecEngine`]
//! - [`bindings`] - transport codec and compressor pool
//! - [`parser`] - XML to model
//! - [`config`] - TOML-loadable settings
//! - [`error`] - error types
//!
//! # Example
//!
//! ```rust,ignore
//! use saml_protocol::{bindings::TransportCodec, signature::XmlSigner, AuthnRequest};
//!
//! let codec = TransportCodec::default();
//! let signer = XmlSigner::from_pem(KEY_PEM, Some(CERT_PEM))?;
//! let request = AuthnRequest::new("https://sp.example.com", "https://sp.example.com/acs");
//! let encoded = codec.encode(&request.into(), Some(&signer))?;
//! let received = codec.decode_authn_request(&encoded, true)?;
//! ```
//!
//! # Standards
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)
//! - [Exclusive XML Canonicalization](https://www.w3.org/TR/xml-exc-c14n/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod config;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod signature;
pub mod types;
pub mod xml;

pub use config::SamlConfig;
pub use error::{FailureCategory, SamlError, SamlResult};
pub use types::*;
