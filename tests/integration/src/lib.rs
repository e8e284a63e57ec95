//! End-to-end tests for the SAML message pipeline live under `tests/`.
