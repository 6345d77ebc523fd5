// Path: crates/crypto/src/sign/eddsa/mod.rs
//! Ed25519 signatures over `ed25519-dalek`.

use ed25519_dalek::pkcs8::{DecodePublicKey, EncodePublicKey};
use pkcs8::LineEnding;
use ed25519_dalek::Signer as _;
use rand::rngs::OsRng;

use revid_api::crypto::{SerializableKey, Signature, SigningKey, SigningKeyPair, VerifyingKey};

use crate::error::CryptoError;

/// Ed25519 key pair. Device keys are generated on the device; the gateway
/// only ever verifies, so this type exists for tooling and tests.
#[derive(Clone)]
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

/// Ed25519 public key.
#[derive(Clone)]
pub struct Ed25519PublicKey(ed25519_dalek::VerifyingKey);

/// Ed25519 private key.
#[derive(Clone)]
pub struct Ed25519PrivateKey(ed25519_dalek::SigningKey);

/// Ed25519 signature.
pub struct Ed25519Signature(ed25519_dalek::Signature);

impl Ed25519KeyPair {
    /// Generates a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut OsRng),
        }
    }

    /// The public key as a PEM-encoded SubjectPublicKeyInfo document.
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        self.signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::OperationFailed(e.to_string()))
    }
}

impl SigningKeyPair for Ed25519KeyPair {
    type PublicKey = Ed25519PublicKey;
    type PrivateKey = Ed25519PrivateKey;
    type Signature = Ed25519Signature;

    fn public_key(&self) -> Self::PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key())
    }

    fn private_key(&self) -> Self::PrivateKey {
        Ed25519PrivateKey(self.signing_key.clone())
    }

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        Ok(Ed25519Signature(self.signing_key.sign(message)))
    }
}

impl Ed25519PublicKey {
    /// Parses a PEM-encoded SubjectPublicKeyInfo document.
    pub fn from_public_key_pem(pem: &str) -> Result<Self, CryptoError> {
        ed25519_dalek::VerifyingKey::from_public_key_pem(pem)
            .map(Self)
            .map_err(|e| CryptoError::InvalidKey(format!("Failed to parse Ed25519 PEM: {e}")))
    }
}

impl VerifyingKey for Ed25519PublicKey {
    type Signature = Ed25519Signature;

    fn verify(&self, message: &[u8], signature: &Self::Signature) -> Result<(), CryptoError> {
        self.0
            .verify_strict(message, &signature.0)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl SerializableKey for Ed25519PublicKey {
    fn to_bytes(&self) -> Vec<u8> {
        // Canonical form: the SPKI DER document, not the raw 32 bytes, so
        // device-id derivation is uniform across key types.
        self.0
            .to_public_key_der()
            .map(|doc| doc.into_vec())
            .unwrap_or_default()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        ed25519_dalek::VerifyingKey::from_public_key_der(bytes)
            .map(Self)
            .map_err(|e| CryptoError::InvalidKey(format!("Failed to parse Ed25519 SPKI: {e}")))
    }
}

impl SigningKey for Ed25519PrivateKey {
    type Signature = Ed25519Signature;

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        Ok(Ed25519Signature(self.0.sign(message)))
    }
}

impl SerializableKey for Ed25519PrivateKey {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let seed: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey("Invalid private key length: expected 32 bytes".to_string())
        })?;
        Ok(Self(ed25519_dalek::SigningKey::from_bytes(&seed)))
    }
}

impl SerializableKey for Ed25519Signature {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        ed25519_dalek::Signature::from_slice(bytes)
            .map(Self)
            .map_err(|e| CryptoError::InvalidSignature(format!("Failed to parse signature: {e}")))
    }
}

impl Signature for Ed25519Signature {}

#[cfg(test)]
mod tests;
