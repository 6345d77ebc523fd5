// Path: crates/gateway/src/tests/mod.rs
use super::*;
use async_trait::async_trait;
use num_bigint::BigUint;
use std::sync::atomic::{AtomicBool, Ordering};

use revid_api::crypto::{SerializableKey, SigningKeyPair};
use revid_chain::InProcessChain;
use revid_contract::{CommitmentContract, MultisigAuthority, MultisigManager};
use revid_crypto::accumulator::parse_prime;
use revid_crypto::sign::eddsa::Ed25519KeyPair;
use revid_storage::MemoryDeviceStore;
use revid_types::app::{DeviceId, KeyType, OperationKind};
use revid_types::error::{
    AccumulatorError, AuthError, ChainClientError, DeviceError, GatewayError,
};

const AUTHORITY: [u8; 20] = [0xaa; 20];

fn toy_params() -> RsaParams {
    RsaParams::new(BigUint::from(209u32), BigUint::from(4u32)).unwrap()
}

fn toy_contract(params: &RsaParams) -> CommitmentContract {
    let manager = MultisigManager::new(
        MultisigAuthority {
            address: AUTHORITY,
            owners: vec![[1; 20], [2; 20], [3; 20]],
            threshold: 2,
        },
        [0xee; 20],
        31_337,
        [0xcc; 20],
    )
    .unwrap();
    let genesis = params.encode_element(&BigUint::from(4u32)).unwrap();
    CommitmentContract::new(genesis, manager, 0).unwrap()
}

async fn gateway_with_ttl(ttl: u64) -> (IdentityGateway, Arc<InProcessChain>) {
    let params = toy_params();
    let chain = Arc::new(InProcessChain::new(toy_contract(&params), AUTHORITY));
    let store = Arc::new(MemoryDeviceStore::new());
    let gateway = IdentityGateway::new(
        params,
        Trapdoor::new(BigUint::from(90u32)).unwrap(),
        store.clone(),
        store,
        chain.clone(),
        GatewayConfig {
            nonce_ttl_seconds: ttl,
        },
    )
    .await
    .unwrap();
    (gateway, chain)
}

async fn gateway() -> (IdentityGateway, Arc<InProcessChain>) {
    gateway_with_ttl(300).await
}

async fn enroll_one(gateway: &IdentityGateway) -> (Ed25519KeyPair, EnrollmentOutcome) {
    let keypair = Ed25519KeyPair::generate();
    let pem = keypair.public_key_pem().unwrap();
    let outcome = gateway.enroll(&pem, KeyType::Ed25519).await.unwrap();
    (keypair, outcome)
}

/// Invariant sweep: every active device's stored witness verifies against
/// the snapshot root.
async fn assert_all_witnesses_valid(gateway: &IdentityGateway) {
    let snapshot = gateway.snapshot().await;
    let root = gateway.params().decode_element(&snapshot.root).unwrap();
    let active = gateway
        .devices
        .list_by_status(revid_types::app::DeviceStatus::Active)
        .await
        .unwrap();
    for record in active {
        let prime = parse_prime(&record.prime).unwrap();
        let witness = BigUint::from_bytes_be(&record.witness);
        assert!(
            gateway.params().verify(&witness, &prime, &root),
            "witness for {} does not verify",
            record.device_id
        );
    }
}

async fn run_auth(
    gateway: &IdentityGateway,
    keypair: &Ed25519KeyPair,
    device_id: DeviceId,
    prime: &str,
    witness_hex: &str,
) -> Result<AuthOutcome> {
    let challenge = gateway.start_auth(&device_id).await?;
    let nonce = hex::decode(&challenge.nonce_hex).unwrap();
    let signature = keypair.sign(&nonce).unwrap().to_bytes();
    gateway
        .verify_auth(VerifyRequest {
            device_id,
            prime: prime.to_string(),
            witness_hex: witness_hex.to_string(),
            signature,
            nonce,
            claimed_pubkey_pem: None,
        })
        .await
}

#[tokio::test]
async fn test_enrollment_produces_valid_membership() {
    let (gateway, _chain) = gateway().await;

    let (_k1, first) = enroll_one(&gateway).await;
    let (_k2, second) = enroll_one(&gateway).await;
    let (_k3, third) = enroll_one(&gateway).await;

    assert_eq!(first.version, 2);
    assert_eq!(second.version, 3);
    assert_eq!(third.version, 4);
    assert_eq!(gateway.active_device_count().await.unwrap(), 3);
    assert_all_witnesses_valid(&gateway).await;

    // The last enrollee's returned witness is current as-is; earlier
    // enrollees' returned witnesses predate later mutations and live on in
    // the registry, refreshed.
    let snapshot = gateway.snapshot().await;
    let root = gateway.params().decode_element(&snapshot.root).unwrap();
    let w3 = BigUint::from_bytes_be(&hex::decode(&third.witness_hex).unwrap());
    let p3 = parse_prime(&third.prime).unwrap();
    assert!(gateway.params().verify(&w3, &p3, &root));
}

#[tokio::test]
async fn test_duplicate_enrollment_conflicts() {
    let (gateway, _chain) = gateway().await;
    let keypair = Ed25519KeyPair::generate();
    let pem = keypair.public_key_pem().unwrap();

    gateway.enroll(&pem, KeyType::Ed25519).await.unwrap();
    let err = gateway.enroll(&pem, KeyType::Ed25519).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Device(DeviceError::AlreadyEnrolled(_))
    ));
}

#[tokio::test]
async fn test_batch_enrollment_single_mutation() {
    let (gateway, chain) = gateway().await;
    let keypairs: Vec<Ed25519KeyPair> = (0..3).map(|_| Ed25519KeyPair::generate()).collect();
    let requests: Vec<(String, KeyType)> = keypairs
        .iter()
        .map(|k| (k.public_key_pem().unwrap(), KeyType::Ed25519))
        .collect();

    let outcomes = gateway.enroll_batch(&requests).await.unwrap();
    assert_eq!(outcomes.len(), 3);
    // One mutation for the whole batch.
    assert_eq!(gateway.snapshot().await.version, 2);
    assert_all_witnesses_valid(&gateway).await;

    let events = chain.events_in_range(0, u64::MAX).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, OperationKind::BatchRegister);
    assert_eq!(events[0].device_ids.len(), 3);
}

#[tokio::test]
async fn test_authentication_happy_path() {
    let (gateway, _chain) = gateway().await;
    let (keypair, outcome) = enroll_one(&gateway).await;

    let result = run_auth(
        &gateway,
        &keypair,
        outcome.device_id,
        &outcome.prime,
        &outcome.witness_hex,
    )
    .await
    .unwrap();
    assert!(result.ok);
    assert!(result.new_witness_hex.is_none());
}

#[tokio::test]
async fn test_nonce_is_single_use() {
    let (gateway, _chain) = gateway().await;
    let (keypair, outcome) = enroll_one(&gateway).await;

    let challenge = gateway.start_auth(&outcome.device_id).await.unwrap();
    let nonce = hex::decode(&challenge.nonce_hex).unwrap();
    let signature = keypair.sign(&nonce).unwrap().to_bytes();
    let request = VerifyRequest {
        device_id: outcome.device_id,
        prime: outcome.prime.clone(),
        witness_hex: outcome.witness_hex.clone(),
        signature,
        nonce,
        claimed_pubkey_pem: None,
    };

    let first = gateway.verify_auth(request.clone()).await.unwrap();
    assert!(first.ok);

    // Same nonce again: the challenge was consumed.
    let err = gateway.verify_auth(request).await.unwrap_err();
    assert!(matches!(err, GatewayError::Auth(AuthError::NoChallenge)));
}

#[tokio::test]
async fn test_expired_nonce_rejected() {
    let (gateway, _chain) = gateway_with_ttl(0).await;
    let (keypair, outcome) = enroll_one(&gateway).await;

    let err = run_auth(
        &gateway,
        &keypair,
        outcome.device_id,
        &outcome.prime,
        &outcome.witness_hex,
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Auth(AuthError::ChallengeExpired)
    ));
}

#[tokio::test]
async fn test_mismatched_nonce_keeps_challenge() {
    let (gateway, _chain) = gateway().await;
    let (keypair, outcome) = enroll_one(&gateway).await;

    gateway.start_auth(&outcome.device_id).await.unwrap();
    let wrong_nonce = vec![0u8; 16];
    let signature = keypair.sign(&wrong_nonce).unwrap().to_bytes();
    let err = gateway
        .verify_auth(VerifyRequest {
            device_id: outcome.device_id,
            prime: outcome.prime.clone(),
            witness_hex: outcome.witness_hex.clone(),
            signature,
            nonce: wrong_nonce,
            claimed_pubkey_pem: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Auth(AuthError::NonceMismatch)));

    // The outstanding challenge survives a guessed nonce.
    let record = gateway.devices.get(&outcome.device_id).await.unwrap().unwrap();
    assert!(record.challenge.is_some());
}

#[tokio::test]
async fn test_wrong_prime_rejected() {
    let (gateway, _chain) = gateway().await;
    let (keypair, outcome) = enroll_one(&gateway).await;

    let err = run_auth(
        &gateway,
        &keypair,
        outcome.device_id,
        "999999999999999999999999937",
        &outcome.witness_hex,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GatewayError::Auth(AuthError::PrimeMismatch)));
}

#[tokio::test]
async fn test_wrong_signer_rejected() {
    let (gateway, _chain) = gateway().await;
    let (_keypair, outcome) = enroll_one(&gateway).await;
    let impostor = Ed25519KeyPair::generate();

    let err = run_auth(
        &gateway,
        &impostor,
        outcome.device_id,
        &outcome.prime,
        &outcome.witness_hex,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GatewayError::Crypto(_)));
}

#[tokio::test]
async fn test_stale_witness_refreshed_after_revocation() {
    let (gateway, _chain) = gateway().await;
    let (_keypair_a, outcome_a) = enroll_one(&gateway).await;
    let (keypair_b, outcome_b) = enroll_one(&gateway).await;

    // B's witness as returned at enrollment is current right now.
    let survivor_witness = {
        let record = gateway.devices.get(&outcome_b.device_id).await.unwrap().unwrap();
        hex::encode(&record.witness)
    };

    gateway.revoke(&outcome_a.device_id).await.unwrap();

    // B presents its pre-revocation witness: stale, not invalid.
    let result = run_auth(
        &gateway,
        &keypair_b,
        outcome_b.device_id,
        &outcome_b.prime,
        &survivor_witness,
    )
    .await
    .unwrap();
    assert!(result.ok);
    let refreshed = result.new_witness_hex.expect("stale witness must be refreshed");

    // The refreshed witness is current.
    let snapshot = gateway.snapshot().await;
    let root = gateway.params().decode_element(&snapshot.root).unwrap();
    let w = BigUint::from_bytes_be(&hex::decode(&refreshed).unwrap());
    let p = parse_prime(&outcome_b.prime).unwrap();
    assert!(gateway.params().verify(&w, &p, &root));

    // A garbage witness is a crypto failure, not a stale one.
    let err = run_auth(
        &gateway,
        &keypair_b,
        outcome_b.device_id,
        &outcome_b.prime,
        "00",
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Accumulator(AccumulatorError::WitnessMismatch)
    ));

    // The revoked device can no longer even start a handshake.
    let err = gateway.start_auth(&outcome_a.device_id).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Device(DeviceError::NotActive(_))
    ));
}

#[tokio::test]
async fn test_revocation_is_terminal() {
    let (gateway, _chain) = gateway().await;
    let (_keypair, outcome) = enroll_one(&gateway).await;

    gateway.revoke(&outcome.device_id).await.unwrap();
    let record = gateway.devices.get(&outcome.device_id).await.unwrap().unwrap();
    assert_eq!(record.status, revid_types::app::DeviceStatus::Revoked);
    assert!(record.witness.is_empty());
    assert!(record.challenge.is_none());

    let err = gateway.revoke(&outcome.device_id).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Device(DeviceError::AlreadyRevoked(_))
    ));

    let err = gateway.revoke(&DeviceId([0x42; 32])).await.unwrap_err();
    assert!(matches!(err, GatewayError::Device(DeviceError::NotFound(_))));
}

#[tokio::test]
async fn test_batch_revocation_refreshes_survivors() {
    let (gateway, _chain) = gateway().await;
    let mut enrolled = Vec::new();
    for _ in 0..4 {
        enrolled.push(enroll_one(&gateway).await);
    }

    let doomed: Vec<DeviceId> = enrolled[..2].iter().map(|(_, o)| o.device_id).collect();
    let outcome = gateway.revoke_batch(&doomed).await.unwrap();
    // Four enrollments plus one batch revocation.
    assert_eq!(outcome.version, 6);
    assert_eq!(gateway.active_device_count().await.unwrap(), 2);
    assert_all_witnesses_valid(&gateway).await;
}

#[tokio::test]
async fn test_update_accumulator_and_ingest_dedup() {
    let (gateway, _chain) = gateway().await;
    let (_keypair, _outcome) = enroll_one(&gateway).await;

    // Everything the gateway committed itself is already reflected.
    assert_eq!(gateway.ingest_once().await.unwrap(), 0);

    let new_root = gateway
        .params()
        .encode_element(&BigUint::from(16u32))
        .unwrap();
    let (committed, _block, _tx) = gateway.update_accumulator(new_root, None).await.unwrap();
    assert_eq!(committed, new_root);
    assert_eq!(gateway.snapshot().await.version, 3);
    assert_eq!(gateway.ingest_once().await.unwrap(), 0);
}

#[tokio::test]
async fn test_ingest_applies_external_mutation() {
    let (gateway, chain) = gateway().await;
    let (keypair, outcome) = enroll_one(&gateway).await;

    // Another operator updates the accumulator behind our back.
    let state = chain.current_state().await.unwrap();
    let external_root = gateway
        .params()
        .encode_element(&BigUint::from(16u32))
        .unwrap();
    chain
        .submit(&revid_types::app::Operation {
            operation_id: [0x5f; 32],
            parent_hash: state.root_hash,
            new_root: external_root,
            kind: OperationKind::Update,
            device_ids: vec![],
        })
        .await
        .unwrap();

    assert_eq!(gateway.ingest_once().await.unwrap(), 1);
    let snapshot = gateway.snapshot().await;
    assert_eq!(snapshot.version, 3);
    assert_eq!(snapshot.root, external_root);

    // The device's stored witness is now one root behind; authentication
    // still succeeds and hands back a refreshed witness.
    let record = gateway.devices.get(&outcome.device_id).await.unwrap().unwrap();
    let stored = hex::encode(&record.witness);
    let result = run_auth(&gateway, &keypair, outcome.device_id, &outcome.prime, &stored)
        .await
        .unwrap();
    assert!(result.ok);
    assert!(result.new_witness_hex.is_some());
}

/// Chain wrapper that loses the parent-hash race exactly once.
struct RacyChain {
    inner: Arc<InProcessChain>,
    tripped: AtomicBool,
}

#[async_trait]
impl revid_api::chain::CommitmentChainClient for RacyChain {
    async fn current_state(
        &self,
    ) -> std::result::Result<revid_types::app::CommitmentState, ChainClientError> {
        self.inner.current_state().await
    }

    async fn submit(
        &self,
        operation: &Operation,
    ) -> std::result::Result<revid_types::app::TxReceipt, ChainClientError> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(ChainClientError::Reverted(
                "CONTRACT_PARENT_HASH_MISMATCH: injected race".to_string(),
            ));
        }
        self.inner.submit(operation).await
    }

    async fn events_in_range(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> std::result::Result<Vec<revid_types::app::CommitmentEvent>, ChainClientError> {
        self.inner.events_in_range(from_block, to_block).await
    }

    async fn confirmed_head(&self) -> std::result::Result<u64, ChainClientError> {
        self.inner.confirmed_head().await
    }
}

#[tokio::test]
async fn test_lost_parent_race_is_retried() {
    let params = toy_params();
    let inner = Arc::new(InProcessChain::new(toy_contract(&params), AUTHORITY));
    let chain = Arc::new(RacyChain {
        inner,
        tripped: AtomicBool::new(false),
    });
    let store = Arc::new(MemoryDeviceStore::new());
    let gateway = IdentityGateway::new(
        params,
        Trapdoor::new(BigUint::from(90u32)).unwrap(),
        store.clone(),
        store,
        chain,
        GatewayConfig {
            nonce_ttl_seconds: 300,
        },
    )
    .await
    .unwrap();

    // The first submission is rejected with a stale parent; the gateway
    // rebuilds and the retry lands.
    let keypair = Ed25519KeyPair::generate();
    let outcome = gateway
        .enroll(&keypair.public_key_pem().unwrap(), KeyType::Ed25519)
        .await
        .unwrap();
    assert_eq!(outcome.version, 2);
    assert_all_witnesses_valid(&gateway).await;
}
