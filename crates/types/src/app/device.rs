// Path: crates/types/src/app/device.rs

//! Defines the canonical `DeviceId` and the device registry record.
//!
//! This module is the source of truth for device identity: a `DeviceId` is
//! the SHA-256 hash of the device's canonical public-key serialization
//! (SubjectPublicKeyInfo DER), derived once at enrollment and stable for the
//! lifetime of the device.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::{DEVICE_ID_BYTES, NONCE_BYTES};

/// A unique, stable identifier for an enrolled device, derived from the hash
/// of its public key. Represented as a 32-byte array.
#[derive(
    Encode, Decode, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash,
)]
pub struct DeviceId(pub [u8; DEVICE_ID_BYTES]);

impl AsRef<[u8]> for DeviceId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DEVICE_ID_BYTES]> for DeviceId {
    fn from(hash: [u8; DEVICE_ID_BYTES]) -> Self {
        Self(hash)
    }
}

impl core::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl DeviceId {
    /// Parses a device id from a hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, crate::error::CodecError> {
        let bytes = crate::codec::decode_hex_loose(s)?;
        let arr: [u8; DEVICE_ID_BYTES] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| crate::error::CodecError::BadLength {
                expected: DEVICE_ID_BYTES,
                got: b.len(),
            })?;
        Ok(Self(arr))
    }
}

/// The signature scheme a device key uses.
///
/// The gateway supports the two schemes common on constrained hardware:
/// EdDSA over curve25519 and RSA PKCS#1 v1.5 over SHA-256.
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Hash,
)]
pub enum KeyType {
    /// Ed25519 (EdDSA over curve25519).
    #[serde(rename = "ed25519")]
    Ed25519,
    /// RSA with PKCS#1 v1.5 padding over SHA-256.
    #[serde(rename = "rsa")]
    RsaPkcs1Sha256,
}

/// The lifecycle status of an enrolled device.
///
/// The `Active -> Revoked` transition is terminal; a revoked device can never
/// become active again (its prime is no longer a factor of the accumulator).
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeviceStatus {
    /// Enrolled and accumulated; may authenticate.
    Active,
    /// Removed from the accumulator; authentication is permanently denied.
    Revoked,
}

/// An outstanding authentication challenge for a device.
///
/// At most one challenge exists per device; issuing a new one overwrites any
/// prior challenge. The nonce is single-use and invalidated before the rest
/// of the proof is checked.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Debug)]
pub struct AuthChallenge {
    /// The random challenge bytes the device must sign.
    pub nonce: [u8; NONCE_BYTES],
    /// Unix timestamp (seconds) after which the challenge is void.
    pub expires_at: u64,
}

/// One enrolled identity, as held in the device registry.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug)]
pub struct DeviceRecord {
    /// The device's stable identifier.
    pub device_id: DeviceId,
    /// Canonical public-key serialization (SubjectPublicKeyInfo DER).
    pub public_key: Vec<u8>,
    /// The signature scheme of `public_key`.
    pub key_type: KeyType,
    /// The device's accumulator prime, as a decimal string.
    ///
    /// Stored as text rather than raw limbs so the registry stays
    /// inspectable and independent of any particular bigint representation.
    pub prime: String,
    /// Current lifecycle status.
    pub status: DeviceStatus,
    /// The latest membership witness (256-byte big-endian), meaningful only
    /// while the device is `Active`. Cleared on revocation.
    pub witness: Vec<u8>,
    /// The outstanding challenge, if the device is mid-handshake.
    pub challenge: Option<AuthChallenge>,
}

impl DeviceRecord {
    /// Returns true if the device may authenticate.
    pub fn is_active(&self) -> bool {
        self.status == DeviceStatus::Active
    }
}
