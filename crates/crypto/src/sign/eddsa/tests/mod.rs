// Path: crates/crypto/src/sign/eddsa/tests/mod.rs
use super::*;

#[test]
fn test_sign_and_verify() {
    let keypair = Ed25519KeyPair::generate();
    let message = b"challenge nonce";

    let signature = keypair.sign(message).unwrap();
    let public_key = keypair.public_key();
    assert!(public_key.verify(message, &signature).is_ok());
}

#[test]
fn test_spki_serialization_roundtrip() {
    let keypair = Ed25519KeyPair::generate();
    let public_bytes = keypair.public_key().to_bytes();
    // SPKI DER for Ed25519 is 44 bytes: 12-byte header + 32-byte key.
    assert_eq!(public_bytes.len(), 44);

    let restored = Ed25519PublicKey::from_bytes(&public_bytes).unwrap();
    assert_eq!(restored.to_bytes(), public_bytes);
}

#[test]
fn test_pem_parsing_matches_der() {
    let keypair = Ed25519KeyPair::generate();
    let pem = keypair.public_key_pem().unwrap();
    let from_pem = Ed25519PublicKey::from_public_key_pem(&pem).unwrap();
    assert_eq!(from_pem.to_bytes(), keypair.public_key().to_bytes());
}

#[test]
fn test_wrong_key_fails() {
    let keypair1 = Ed25519KeyPair::generate();
    let keypair2 = Ed25519KeyPair::generate();
    let message = b"challenge nonce";

    let signature = keypair1.sign(message).unwrap();
    assert!(keypair2.public_key().verify(message, &signature).is_err());
}

#[test]
fn test_tampered_message_fails() {
    let keypair = Ed25519KeyPair::generate();
    let signature = keypair.sign(b"original").unwrap();
    let public_key = keypair.public_key();
    assert!(public_key.verify(b"original", &signature).is_ok());
    assert!(public_key.verify(b"tampered", &signature).is_err());
}

#[test]
fn test_signature_roundtrip() {
    let keypair = Ed25519KeyPair::generate();
    let signature = keypair.sign(b"msg").unwrap();
    let bytes = signature.to_bytes();
    assert_eq!(bytes.len(), 64);
    let restored = Ed25519Signature::from_bytes(&bytes).unwrap();
    assert!(keypair.public_key().verify(b"msg", &restored).is_ok());
}
