// Path: crates/crypto/src/algorithms/hash/mod.rs
//! Cryptographic hash functions.
//!
//! SHA-256 is used for device identity and hash-to-prime; Keccak-256 is the
//! contract-side hash used for root chaining and operation domains.

use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

/// SHA-256 of `data`.
pub fn sha256<T: AsRef<[u8]>>(data: T) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hasher.finalize().into()
}

/// Keccak-256 of `data` (the Ethereum-style Keccak, not NIST SHA-3).
pub fn keccak256<T: AsRef<[u8]>>(data: T) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut out = [0u8; 32];
    keccak.update(data.as_ref());
    keccak.finalize(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_vector() {
        // FIPS 180-4 "abc" test vector.
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_keccak256_vector() {
        // Ethereum's canonical empty-input digest.
        assert_eq!(
            hex::encode(keccak256([])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_digests_differ() {
        assert_ne!(sha256(b"revid"), keccak256(b"revid"));
    }
}
