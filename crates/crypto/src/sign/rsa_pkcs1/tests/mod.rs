// Path: crates/crypto/src/sign/rsa_pkcs1/tests/mod.rs
use super::*;
use rand::rngs::OsRng;
use rsa::pkcs8::LineEnding;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;

fn test_key() -> RsaPrivateKey {
    // 2048 bits matches fleet hardware but makes the suite crawl; 1024 is
    // plenty for exercising the padding and digest plumbing.
    RsaPrivateKey::new(&mut OsRng, 1024).unwrap()
}

#[test]
fn test_sign_and_verify() {
    let private_key = test_key();
    let signing_key = pkcs1v15::SigningKey::<Sha256>::new(private_key.clone());
    let message = b"challenge nonce";
    let signature = signing_key.sign(message);

    let public = RsaPkcs1PublicKey::from_raw(RsaPublicKey::from(&private_key));
    let parsed = RsaPkcs1Signature::from_bytes(&signature.to_bytes()).unwrap();
    assert!(public.verify(message, &parsed).is_ok());
    assert!(public.verify(b"other message", &parsed).is_err());
}

#[test]
fn test_pem_and_der_roundtrip() {
    let private_key = test_key();
    let public_raw = RsaPublicKey::from(&private_key);
    let pem = public_raw.to_public_key_pem(LineEnding::LF).unwrap();

    let from_pem = RsaPkcs1PublicKey::from_public_key_pem(&pem).unwrap();
    let der = from_pem.to_bytes();
    let from_der = RsaPkcs1PublicKey::from_bytes(&der).unwrap();
    assert_eq!(from_der.to_bytes(), der);
}

#[test]
fn test_garbage_key_rejected() {
    assert!(RsaPkcs1PublicKey::from_public_key_pem("not a pem").is_err());
    assert!(RsaPkcs1PublicKey::from_bytes(&[0u8; 16]).is_err());
}
