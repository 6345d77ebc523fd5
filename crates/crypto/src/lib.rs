// Path: crates/crypto/src/lib.rs
//! # REVID Crypto Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free code. Panics are disallowed in non-test code to promote
//! robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! # REVID Cryptography
//!
//! The RSA accumulator engine (hash-to-prime, add, trapdoor removal,
//! witness math) plus hashing and device-signature verification.

pub mod accumulator;
pub mod algorithms;
pub mod error;
pub mod sign;
