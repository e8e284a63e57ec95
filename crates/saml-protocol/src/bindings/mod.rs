//! Transport bindings.
//!
//! - **HTTP-Redirect** - raw DEFLATE then base64
//! - **HTTP-POST** - base64 only
//!
//! Both envelopes go through [`TransportCodec`], which shares one
//! [`CompressorPool`] across clones and threads.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use saml_protocol::bindings::{CompressorPool, TransportCodec};
//!
//! let codec = TransportCodec::new(Arc::new(CompressorPool::new(16, 6)?));
//! let encoded = codec.encode(&request.into(), Some(&signer))?;
//! let request = codec.decode_authn_request(&encoded, true)?;
//! ```

mod codec;
mod pool;

pub use codec::*;
pub use pool::*;

/// Form or query parameter carrying a request.
pub const SAML_REQUEST_PARAM: &str = "SAMLRequest";

/// Form or query parameter carrying a response.
pub const SAML_RESPONSE_PARAM: &str = "SAMLResponse";
