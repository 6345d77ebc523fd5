// Path: crates/crypto/src/error.rs
//! Local error types for the `revid-crypto` crate.

// Re-export the canonical error types from the types crate.
pub use revid_types::error::{AccumulatorError, CryptoError};
