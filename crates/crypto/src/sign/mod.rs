// Path: crates/crypto/src/sign/mod.rs
//! Device signature schemes and canonical key handling.
//!
//! Devices enroll with a public key in SubjectPublicKeyInfo form (PEM at the
//! API boundary, DER in the registry). The DER encoding is the canonical
//! serialization: the device id is the SHA-256 hash of it, so the same key
//! always derives the same identity regardless of PEM formatting.

pub mod eddsa;
pub mod rsa_pkcs1;

use revid_types::app::{DeviceId, KeyType};

use crate::algorithms::hash::sha256;
use crate::error::CryptoError;
use crate::sign::eddsa::Ed25519PublicKey;
use crate::sign::rsa_pkcs1::RsaPkcs1PublicKey;
use revid_api::crypto::{SerializableKey, VerifyingKey as _};

/// A device's verification key, dispatching over the supported schemes.
#[derive(Clone)]
pub enum DevicePublicKey {
    /// EdDSA over curve25519.
    Ed25519(Ed25519PublicKey),
    /// RSA with PKCS#1 v1.5 padding over SHA-256.
    Rsa(RsaPkcs1PublicKey),
}

impl DevicePublicKey {
    /// Parses a PEM-encoded SubjectPublicKeyInfo of the given scheme.
    pub fn from_pem(pem: &str, key_type: KeyType) -> Result<Self, CryptoError> {
        match key_type {
            KeyType::Ed25519 => Ed25519PublicKey::from_public_key_pem(pem).map(Self::Ed25519),
            KeyType::RsaPkcs1Sha256 => {
                RsaPkcs1PublicKey::from_public_key_pem(pem).map(Self::Rsa)
            }
        }
    }

    /// Parses the canonical DER form, as stored in the registry.
    pub fn from_spki_der(der: &[u8], key_type: KeyType) -> Result<Self, CryptoError> {
        match key_type {
            KeyType::Ed25519 => Ed25519PublicKey::from_bytes(der).map(Self::Ed25519),
            KeyType::RsaPkcs1Sha256 => RsaPkcs1PublicKey::from_bytes(der).map(Self::Rsa),
        }
    }

    /// The canonical SubjectPublicKeyInfo DER serialization.
    pub fn to_spki_der(&self) -> Vec<u8> {
        match self {
            Self::Ed25519(key) => key.to_bytes(),
            Self::Rsa(key) => key.to_bytes(),
        }
    }

    /// Which scheme this key belongs to.
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Ed25519(_) => KeyType::Ed25519,
            Self::Rsa(_) => KeyType::RsaPkcs1Sha256,
        }
    }

    /// Verifies a raw signature over `message` under this key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        match self {
            Self::Ed25519(key) => {
                let sig = eddsa::Ed25519Signature::from_bytes(signature)?;
                key.verify(message, &sig)
            }
            Self::Rsa(key) => {
                let sig = rsa_pkcs1::RsaPkcs1Signature::from_bytes(signature)?;
                key.verify(message, &sig)
            }
        }
    }

    /// Derives the device id: SHA-256 of the canonical SPKI DER.
    pub fn device_id(&self) -> DeviceId {
        DeviceId(sha256(self.to_spki_der()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::eddsa::Ed25519KeyPair;
    use revid_api::crypto::{SerializableKey, SigningKeyPair};

    #[test]
    fn test_device_id_is_stable_across_pem_and_der() {
        let keypair = Ed25519KeyPair::generate();
        let pem = keypair.public_key_pem().unwrap();

        let from_pem = DevicePublicKey::from_pem(&pem, KeyType::Ed25519).unwrap();
        let from_der =
            DevicePublicKey::from_spki_der(&from_pem.to_spki_der(), KeyType::Ed25519).unwrap();
        assert_eq!(from_pem.device_id(), from_der.device_id());
    }

    #[test]
    fn test_dispatch_verifies_ed25519() {
        let keypair = Ed25519KeyPair::generate();
        let message = b"challenge-nonce-bytes";
        let sig = keypair.sign(message).unwrap();

        let pem = keypair.public_key_pem().unwrap();
        let key = DevicePublicKey::from_pem(&pem, KeyType::Ed25519).unwrap();
        assert!(key.verify(message, &sig.to_bytes()).is_ok());
        assert!(key.verify(b"different message", &sig.to_bytes()).is_err());
    }

    #[test]
    fn test_wrong_scheme_is_rejected() {
        let keypair = Ed25519KeyPair::generate();
        let pem = keypair.public_key_pem().unwrap();
        assert!(DevicePublicKey::from_pem(&pem, KeyType::RsaPkcs1Sha256).is_err());
    }
}
