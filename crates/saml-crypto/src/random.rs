//! Cryptographically secure identifiers for protocol messages.
//!
//! SAML correlates a `Response` with its `AuthnRequest` through the request
//! `ID`, so identifiers must be unguessable. They are also `xs:ID` values and
//! therefore must be valid NCNames, which rules out a leading digit.

use rand::Rng;

/// Number of random bytes behind a message identifier (160 bits).
pub const MESSAGE_ID_BYTES: usize = 20;

/// Generates a cryptographically secure random byte array.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a message identifier: an underscore followed by 40 lowercase
/// hex characters.
#[must_use]
pub fn generate_message_id() -> String {
    let mut id = String::with_capacity(1 + MESSAGE_ID_BYTES * 2);
    id.push('_');
    for byte in random_bytes(MESSAGE_ID_BYTES) {
        id.push(char::from(HEX[usize::from(byte >> 4)]));
        id.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    id
}

const HEX: &[u8; 16] = b"0123456789abcdef";
