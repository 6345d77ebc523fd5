// Path: crates/crypto/src/sign/rsa_pkcs1/mod.rs
//! RSA PKCS#1 v1.5 signatures over SHA-256, via the `rsa` crate.
//!
//! Legacy fleet hardware frequently ships RSA-2048 keys; the gateway only
//! ever verifies with them.

use rsa::pkcs1v15;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::signature::Verifier as _;
use rsa::RsaPublicKey;
use sha2::Sha256;

use revid_api::crypto::{SerializableKey, Signature, VerifyingKey};

use crate::error::CryptoError;

/// RSA public key, verifying PKCS#1 v1.5 signatures over SHA-256.
#[derive(Clone)]
pub struct RsaPkcs1PublicKey {
    raw: RsaPublicKey,
    verifier: pkcs1v15::VerifyingKey<Sha256>,
}

/// A PKCS#1 v1.5 signature (raw big-endian bytes, modulus width).
pub struct RsaPkcs1Signature(pkcs1v15::Signature);

impl RsaPkcs1PublicKey {
    fn from_raw(raw: RsaPublicKey) -> Self {
        let verifier = pkcs1v15::VerifyingKey::<Sha256>::new(raw.clone());
        Self { raw, verifier }
    }

    /// Parses a PEM-encoded SubjectPublicKeyInfo document.
    pub fn from_public_key_pem(pem: &str) -> Result<Self, CryptoError> {
        RsaPublicKey::from_public_key_pem(pem)
            .map(Self::from_raw)
            .map_err(|e| CryptoError::InvalidKey(format!("Failed to parse RSA PEM: {e}")))
    }
}

impl VerifyingKey for RsaPkcs1PublicKey {
    type Signature = RsaPkcs1Signature;

    fn verify(&self, message: &[u8], signature: &Self::Signature) -> Result<(), CryptoError> {
        self.verifier
            .verify(message, &signature.0)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl SerializableKey for RsaPkcs1PublicKey {
    fn to_bytes(&self) -> Vec<u8> {
        self.raw
            .to_public_key_der()
            .map(|doc| doc.into_vec())
            .unwrap_or_default()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        RsaPublicKey::from_public_key_der(bytes)
            .map(Self::from_raw)
            .map_err(|e| CryptoError::InvalidKey(format!("Failed to parse RSA SPKI: {e}")))
    }
}

impl SerializableKey for RsaPkcs1Signature {
    fn to_bytes(&self) -> Vec<u8> {
        use rsa::signature::SignatureEncoding as _;
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        pkcs1v15::Signature::try_from(bytes)
            .map(Self)
            .map_err(|e| CryptoError::InvalidSignature(format!("Failed to parse signature: {e}")))
    }
}

impl Signature for RsaPkcs1Signature {}

#[cfg(test)]
mod tests;
