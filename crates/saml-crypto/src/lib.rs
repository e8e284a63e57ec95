//! # saml-crypto
//!
//! Key material and signature primitives for SAML XML-DSig.
//!
//! The SAML baseline profile fixes the digital-signature algorithms to
//! RSA-SHA1 (and DSA-SHA1) with SHA-1 digests. These are legacy algorithms
//! kept for wire compatibility with third-party SAML endpoints; nothing in
//! this crate should be reused for new protocols.
//!
//! ## Contents
//!
//! - [`keys`] - RSA signing and verification keys, PEM/DER/X.509 loading
//! - [`hash`] - SHA-1 digests used by XML-DSig references
//! - [`signature`] - RSA PKCS#1 v1.5 SHA-1 signing and the error type
//! - [`random`] - unguessable protocol message identifiers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod hash;
pub mod keys;
pub mod random;
pub mod signature;

pub use hash::{sha1, sha1_base64};
pub use keys::{KeyType, SigningKey, VerifyingKey};
pub use random::generate_message_id;
pub use signature::SignatureError;
