//! End-to-end tests for the SAML message pipeline.
//!
//! Messages travel the full path: model, serializer, signer, transport
//! codec, verifier and populator.

mod common;
mod redirect_binding;
mod response_flow;
mod signatures;
