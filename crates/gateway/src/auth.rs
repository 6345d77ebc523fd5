// Path: crates/gateway/src/auth.rs
//! Two-phase challenge-response authentication.
//!
//! Phase A issues a random nonce with a TTL; phase B consumes it. The
//! nonce is compared in constant time and invalidated before any further
//! check runs, so it is single-use no matter how verification ends.

use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

use revid_crypto::sign::DevicePublicKey;
use revid_types::app::{AuthChallenge, DeviceId};
use revid_types::error::{AccumulatorError, AuthError, DeviceError};
use revid_types::{Result, NONCE_BYTES};

use crate::{unix_now, IdentityGateway};

/// Phase A result: the challenge the device must sign.
#[derive(Clone, Debug)]
pub struct ChallengeOutcome {
    /// The nonce, hex.
    pub nonce_hex: String,
    /// Unix timestamp (seconds) after which the challenge is void.
    pub expires_at: u64,
}

/// Phase B input, already decoded from the wire.
#[derive(Clone, Debug)]
pub struct VerifyRequest {
    /// The claimed device.
    pub device_id: DeviceId,
    /// The device's prime, decimal or hex text.
    pub prime: String,
    /// The membership witness, hex.
    pub witness_hex: String,
    /// Signature over the raw nonce bytes.
    pub signature: Vec<u8>,
    /// The nonce being answered.
    pub nonce: Vec<u8>,
    /// Optionally, the public key the caller claims to hold. When present
    /// it must derive the claimed device id; verification still runs
    /// against the enrolled key.
    pub claimed_pubkey_pem: Option<String>,
}

/// Phase B result. A stale witness is success: the caller gets the
/// refreshed witness to store for next time.
#[derive(Clone, Debug)]
pub struct AuthOutcome {
    /// Always true; failures surface as errors.
    pub ok: bool,
    /// Present when the presented witness was one root behind.
    pub new_witness_hex: Option<String>,
}

impl IdentityGateway {
    /// Phase A: issue a challenge. Overwrites any prior outstanding
    /// challenge for the device; idempotent in effect.
    pub async fn start_auth(&self, device_id: &DeviceId) -> Result<ChallengeOutcome> {
        let lock = self.device_lock(device_id);
        let _guard = lock.lock().await;

        let record = self
            .devices
            .get(device_id)
            .await?
            .ok_or(DeviceError::NotFound(*device_id))?;
        if !record.is_active() {
            return Err(DeviceError::NotActive(*device_id).into());
        }

        let mut nonce = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce);
        let expires_at = unix_now() + self.config.nonce_ttl_seconds;
        self.devices
            .set_challenge(device_id, Some(AuthChallenge { nonce, expires_at }))
            .await?;

        Ok(ChallengeOutcome {
            nonce_hex: hex::encode(nonce),
            expires_at,
        })
    }

    /// Phase B: verify the proof. Check order is part of the contract:
    /// device state, nonce (constant-time, then invalidated), prime,
    /// signature, membership.
    pub async fn verify_auth(&self, request: VerifyRequest) -> Result<AuthOutcome> {
        // The device lock serializes concurrent phase-B attempts: between
        // the nonce comparison and its invalidation nothing else can read
        // the challenge, so replaying the same nonce cannot win twice.
        let lock = self.device_lock(&request.device_id);
        let _guard = lock.lock().await;

        // 1. Device exists and is active.
        let record = self
            .devices
            .get(&request.device_id)
            .await?
            .ok_or(DeviceError::NotFound(request.device_id))?;
        if !record.is_active() {
            return Err(DeviceError::NotActive(request.device_id).into());
        }

        if let Some(pem) = &request.claimed_pubkey_pem {
            let claimed = DevicePublicKey::from_pem(pem, record.key_type)?;
            if claimed.device_id() != request.device_id {
                return Err(revid_types::error::CryptoError::InvalidKey(
                    "claimed public key does not derive the claimed device id".to_string(),
                )
                .into());
            }
        }

        // 2. An outstanding challenge matches the submitted nonce. The
        // comparison is constant-time; a mismatch does not burn the
        // challenge (a guesser must not be able to cancel a session).
        let challenge = record.challenge.ok_or(AuthError::NoChallenge)?;
        let submitted: [u8; NONCE_BYTES] = request
            .nonce
            .as_slice()
            .try_into()
            .map_err(|_| AuthError::NonceMismatch)?;
        if challenge.nonce.ct_eq(&submitted).unwrap_u8() != 1 {
            return Err(AuthError::NonceMismatch.into());
        }

        // 3. Single-use: invalidate before any further work.
        self.devices.set_challenge(&request.device_id, None).await?;

        if unix_now() >= challenge.expires_at {
            return Err(AuthError::ChallengeExpired.into());
        }

        // 4. The submitted prime is the enrolled prime.
        let submitted_prime = revid_crypto::accumulator::parse_prime(&request.prime)?;
        let enrolled_prime = revid_crypto::accumulator::parse_prime(&record.prime)?;
        if submitted_prime != enrolled_prime {
            return Err(AuthError::PrimeMismatch.into());
        }

        // 5. The device signed this nonce with its enrolled key.
        let key = DevicePublicKey::from_spki_der(&record.public_key, record.key_type)?;
        key.verify(&challenge.nonce, &request.signature)?;

        // 6. Membership proof against the current root; one root behind is
        // stale-but-valid and gets a refresh.
        let witness_bytes = revid_types::codec::decode_hex_loose(&request.witness_hex)?;
        let witness = BigUint::from_bytes_be(&witness_bytes);
        let snapshot = self.snapshot.read().await.clone();
        let current_root = self.engine.params.decode_element(&snapshot.root)?;

        if self
            .engine
            .params
            .verify(&witness, &enrolled_prime, &current_root)
        {
            return Ok(AuthOutcome {
                ok: true,
                new_witness_hex: None,
            });
        }

        let matches_previous = match &snapshot.previous_root {
            Some(previous) => {
                let previous_root = self.engine.params.decode_element(previous)?;
                self.engine
                    .params
                    .verify(&witness, &enrolled_prime, &previous_root)
            }
            None => false,
        };
        if !matches_previous {
            return Err(AccumulatorError::WitnessMismatch.into());
        }

        // Stale witness: recompute from the current root with the trapdoor
        // and persist it, so the registry stays consistent with what the
        // device will hold.
        let prime_in = enrolled_prime.clone();
        let fresh = self
            .offload(move |engine| {
                Ok(engine
                    .params
                    .trapdoor_remove(&current_root, &prime_in, &engine.trapdoor)?)
            })
            .await?;
        let fresh_bytes = self.engine.params.encode_element(&fresh)?.0.to_vec();
        // Only lands while the device is still active; a concurrent
        // revocation wins.
        self.devices
            .refresh_witness(&request.device_id, &fresh_bytes)
            .await?;

        tracing::debug!(
            target: "gateway",
            device = %request.device_id,
            "stale witness refreshed during authentication"
        );
        Ok(AuthOutcome {
            ok: true,
            new_witness_hex: Some(hex::encode(fresh_bytes)),
        })
    }
}
