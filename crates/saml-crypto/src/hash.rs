//! Hash functions for XML-DSig references.
//!
//! SHA-1 is the only digest accepted by the SAML baseline profile handled
//! here. It is not collision resistant and must not be used outside of
//! protocol compatibility.

use base64::Engine;
use sha1::{Digest, Sha1};

/// Computes the SHA-1 digest of the input data.
#[must_use]
pub fn sha1(data: &[u8]) -> Vec<u8> {
    Sha1::digest(data).to_vec()
}

/// Computes the SHA-1 digest and returns it base64 encoded, as it appears in
/// a `DigestValue` element.
#[must_use]
pub fn sha1_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(sha1(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sha1_produces_correct_length() {
        assert_eq!(sha1(b"test").len(), 20);
    }

    #[test]
    fn sha1_known_answer() {
        // FIPS 180-1 appendix A
        assert_eq!(sha1_base64(b"abc"), "qZk+NkcGgWq6PiVxeFDCbJzQ2J0=");
    }

    #[test]
    fn different_inputs_produce_different_hashes() {
        assert_ne!(sha1(b"hello"), sha1(b"world"));
    }

    proptest! {
        #[test]
        fn digest_value_is_always_28_chars(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let encoded = sha1_base64(&data);
            prop_assert_eq!(encoded.len(), 28);
            prop_assert!(encoded.ends_with('='));
        }
    }
}
