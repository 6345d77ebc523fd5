// Path: crates/types/src/app/commitment.rs

//! The on-chain commitment state and the operations that mutate it.

use parity_scale_codec::{Decode, Encode};

use crate::app::DeviceId;
use crate::error::CodecError;
use crate::ACCUMULATOR_BYTES;

/// A fixed-width, big-endian encoding of one accumulator element.
///
/// This is the only representation that crosses the chain and storage
/// boundaries. Values must be strictly less than the modulus `N`; the
/// engine enforces that on decode.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq)]
pub struct RootBytes(pub [u8; ACCUMULATOR_BYTES]);

impl RootBytes {
    /// The zero element. Never a valid accumulator value; used as a
    /// placeholder before genesis initialization.
    pub const ZERO: Self = Self([0u8; ACCUMULATOR_BYTES]);

    /// Hex encoding without a `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses from hex (with or without `0x`), requiring exactly 256 bytes.
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let bytes = crate::codec::decode_hex_loose(s)?;
        Self::from_slice(&bytes)
    }

    /// Builds from a byte slice, requiring exactly 256 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        let arr: [u8; ACCUMULATOR_BYTES] =
            bytes
                .try_into()
                .map_err(|_| CodecError::BadLength {
                    expected: ACCUMULATOR_BYTES,
                    got: bytes.len(),
                })?;
        Ok(Self(arr))
    }
}

impl AsRef<[u8]> for RootBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for RootBytes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // The full 512-hex-char dump drowns logs; show both ends.
        let h = hex::encode(self.0);
        write!(f, "RootBytes({}..{})", &h[..8], &h[h.len() - 8..])
    }
}

/// The latest committed accumulator state, mirrored between the contract and
/// the gateway's metadata store.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CommitmentState {
    /// The accumulator element, fixed-width big-endian.
    pub root: RootBytes,
    /// Keccak-256 of `root`'s 256-byte encoding; the chain-link token.
    pub root_hash: [u8; 32],
    /// Monotonic count of committed mutations, starting at 1 at genesis.
    pub version: u64,
    /// Block height of the last successful mutation.
    pub last_update_block: u64,
}

/// The kind of a proposed contract mutation.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Debug)]
pub enum OperationKind {
    /// Replace the accumulator without touching device statuses.
    Update,
    /// Fold one device into the accumulator and mark it active.
    Register,
    /// Remove one device from the accumulator and mark it revoked.
    Revoke,
    /// Register a batch of devices under a single mutation.
    BatchRegister,
    /// Revoke a batch of devices under a single mutation.
    BatchRevoke,
}

/// One proposed mutation, prepared off-chain and submitted through the
/// multi-sig authority. Ephemeral: exists only between proposal and
/// confirmation.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug)]
pub struct Operation {
    /// Replay guard. Must be non-zero and never used before.
    pub operation_id: [u8; 32],
    /// Linearization guard: must equal the contract's current root hash at
    /// execution time.
    pub parent_hash: [u8; 32],
    /// The post-mutation accumulator, precomputed by the gateway.
    pub new_root: RootBytes,
    /// What this mutation does.
    pub kind: OperationKind,
    /// The devices touched: empty for `Update`, exactly one for
    /// `Register`/`Revoke`, 1..=50 for the batch kinds.
    pub device_ids: Vec<DeviceId>,
}

/// Receipt for a submitted mutation transaction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TxReceipt {
    /// Transaction hash as reported by the chain.
    pub tx_hash: [u8; 32],
    /// Block in which the mutation was included.
    pub block_number: u64,
}
