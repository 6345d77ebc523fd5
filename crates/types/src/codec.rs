// Path: crates/types/src/codec.rs

//! Defines the canonical, deterministic binary codec for persisted state,
//! plus the hex helpers used at the wire boundary.
//!
//! This module provides simple wrappers around `parity-scale-codec` (SCALE).
//! By centralizing the codec logic here in the base `types` crate, we ensure
//! that the registry, the metadata store, and the contract's domain-separated
//! operation hashes all use the exact same serialization format.

use parity_scale_codec::{Decode, DecodeAll, Encode};

use crate::error::CodecError;

/// Encodes a value into a deterministic, canonical byte representation.
///
/// Used for all data written to the device registry or included in an
/// operation hash for replay protection.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from its canonical byte representation.
///
/// Fails fast on any decoding error, including trailing bytes; malformed
/// stored data must never be silently accepted.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, CodecError> {
    T::decode_all(&mut &*b).map_err(|e| CodecError::Canonical(e.to_string()))
}

/// Decodes a hex string, tolerating an optional `0x`/`0X` prefix and
/// mixed case. The API boundary accepts both forms; internal code emits
/// unprefixed lowercase only.
pub fn decode_hex_loose(s: &str) -> Result<Vec<u8>, CodecError> {
    let trimmed = s.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(stripped).map_err(|e| CodecError::BadHex(e.to_string()))
}

/// Decodes a hex string into a fixed-width array.
pub fn decode_hex_fixed<const WIDTH: usize>(s: &str) -> Result<[u8; WIDTH], CodecError> {
    let bytes = decode_hex_loose(s)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| CodecError::BadLength {
            expected: WIDTH,
            got: b.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parity_scale_codec::{Decode, Encode};

    #[derive(Encode, Decode, Debug, PartialEq, Eq)]
    struct TestStruct {
        id: u32,
        name: String,
        tags: Vec<u8>,
    }

    #[test]
    fn test_canonical_codec_roundtrip() {
        let original = TestStruct {
            id: 42,
            name: "sensor-ab12".to_string(),
            tags: vec![1, 2, 3],
        };
        let encoded = to_bytes_canonical(&original);
        assert!(!encoded.is_empty());
        let decoded = from_bytes_canonical::<TestStruct>(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_canonical_decode_rejects_truncation() {
        let original = TestStruct {
            id: 99,
            name: "sensor-cd34".to_string(),
            tags: vec![10, 20, 30],
        };
        let mut encoded = to_bytes_canonical(&original);
        encoded.pop();
        assert!(from_bytes_canonical::<TestStruct>(&encoded).is_err());
    }

    #[test]
    fn test_canonical_decode_rejects_trailing_bytes() {
        let mut encoded = to_bytes_canonical(&7u32);
        encoded.push(0xff);
        assert!(from_bytes_canonical::<u32>(&encoded).is_err());
    }

    #[test]
    fn test_hex_loose_accepts_prefixes() {
        assert_eq!(decode_hex_loose("0xdeadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode_hex_loose("DEADBEEF").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode_hex_loose("deadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(decode_hex_loose("0xg").is_err());
    }

    #[test]
    fn test_hex_fixed_enforces_width() {
        let arr = decode_hex_fixed::<4>("0xdeadbeef").unwrap();
        assert_eq!(arr, [0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(
            decode_hex_fixed::<8>("deadbeef"),
            Err(CodecError::BadLength { expected: 8, got: 4 })
        ));
    }
}
