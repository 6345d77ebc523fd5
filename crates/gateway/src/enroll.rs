// Path: crates/gateway/src/enroll.rs
//! Enrollment: fold new device primes into the accumulator, commit on
//! chain, hand each device its prime and initial witness, and refresh
//! every other holder's witness.
//!
//! Witness refresh on enrollment costs one modexp per existing active
//! device. That is intentional and the only non-O(1) path; batching
//! multiple enrollments into one mutation amortizes it.

use num_bigint::BigUint;

use revid_crypto::accumulator::hash_to_prime_coprime;
use revid_crypto::sign::DevicePublicKey;
use revid_types::app::{
    DeviceId, DeviceRecord, DeviceStatus, KeyType, Operation, OperationKind,
};
use revid_types::error::{DeviceError, GatewayError};
use revid_types::{Result, MAX_BATCH_DEVICES};

use crate::{random_operation_id, IdentityGateway, PARENT_RACE_RETRIES};

/// What an enrolled device walks away with.
#[derive(Clone, Debug)]
pub struct EnrollmentOutcome {
    /// The device's stable identifier.
    pub device_id: DeviceId,
    /// Its accumulator prime, decimal.
    pub prime: String,
    /// Its initial membership witness, hex (256 bytes).
    pub witness_hex: String,
    /// The committed root after enrollment, hex.
    pub root_hex: String,
    /// The committed version after enrollment.
    pub version: u64,
}

impl IdentityGateway {
    /// Enrolls one device from its PEM public key.
    pub async fn enroll(&self, pubkey_pem: &str, key_type: KeyType) -> Result<EnrollmentOutcome> {
        let mut outcomes = self
            .enroll_batch(&[(pubkey_pem.to_string(), key_type)])
            .await?;
        outcomes
            .pop()
            .ok_or_else(|| GatewayError::Internal("empty enrollment batch result".to_string()))
    }

    /// Enrolls up to 50 devices under a single on-chain mutation.
    pub async fn enroll_batch(
        &self,
        requests: &[(String, KeyType)],
    ) -> Result<Vec<EnrollmentOutcome>> {
        if requests.is_empty() || requests.len() > MAX_BATCH_DEVICES {
            return Err(GatewayError::InvalidInput(format!(
                "enrollment batch size {} outside 1..={MAX_BATCH_DEVICES}",
                requests.len()
            )));
        }

        // Canonicalize keys and derive identities before touching any state.
        let mut device_ids = Vec::with_capacity(requests.len());
        let mut spkis = Vec::with_capacity(requests.len());
        let mut key_types = Vec::with_capacity(requests.len());
        for (pem, key_type) in requests {
            let key = DevicePublicKey::from_pem(pem, *key_type)?;
            let id = key.device_id();
            if device_ids.contains(&id) {
                return Err(GatewayError::InvalidInput(format!(
                    "duplicate device {id} in enrollment batch"
                )));
            }
            device_ids.push(id);
            spkis.push(key.to_spki_der());
            key_types.push(*key_type);
        }

        // Assign primes on the blocking pool; hash-to-prime runs a
        // Miller-Rabin search per key.
        let spkis_for_primes = spkis.clone();
        let primes: Vec<BigUint> = self
            .offload(move |engine| {
                spkis_for_primes
                    .iter()
                    .map(|spki| {
                        hash_to_prime_coprime(spki, &engine.trapdoor).map_err(GatewayError::from)
                    })
                    .collect()
            })
            .await?;
        let prime_strings: Vec<String> =
            primes.iter().map(|p| p.to_str_radix(10)).collect();

        let _guard = self.writer.lock().await;

        // Registry preconditions, under the lock so they hold through the
        // mutation.
        for (i, id) in device_ids.iter().enumerate() {
            if let Some(existing) = self.devices.get(id).await? {
                return Err(match existing.status {
                    DeviceStatus::Active => DeviceError::AlreadyEnrolled(*id),
                    DeviceStatus::Revoked => DeviceError::AlreadyRevoked(*id),
                }
                .into());
            }
            if prime_strings
                .iter()
                .enumerate()
                .any(|(j, p)| j != i && p == &prime_strings[i])
            {
                return Err(DeviceError::PrimeCollision(*id).into());
            }
        }
        let active = self.devices.list_by_status(DeviceStatus::Active).await?;
        for (i, prime) in prime_strings.iter().enumerate() {
            if active.iter().any(|r| &r.prime == prime) {
                let id = device_ids
                    .get(i)
                    .copied()
                    .unwrap_or_default();
                return Err(DeviceError::PrimeCollision(id).into());
            }
        }

        let kind = if requests.len() == 1 {
            OperationKind::Register
        } else {
            OperationKind::BatchRegister
        };

        // Propose, retrying only lost parent-hash races.
        let mut attempts = 0;
        let (operation, old_root, witnesses, receipt, version) = loop {
            let state = self.chain.current_state().await?;
            let a_old = self.engine.params.decode_element(&state.root)?;

            let primes_in = primes.clone();
            let a_old_in = a_old.clone();
            let (a_new, new_witnesses) = self
                .offload(move |engine| {
                    let mut a_new = a_old_in.clone();
                    for prime in &primes_in {
                        a_new = engine.params.add(&a_new, prime)?;
                    }
                    // Each enrollee's witness excludes only its own prime:
                    // fold the others over the pre-mutation root.
                    let mut witnesses = Vec::with_capacity(primes_in.len());
                    for skip in 0..primes_in.len() {
                        let mut w = a_old_in.clone();
                        for (j, prime) in primes_in.iter().enumerate() {
                            if j != skip {
                                w = engine.params.add(&w, prime)?;
                            }
                        }
                        witnesses.push(w);
                    }
                    Ok((a_new, witnesses))
                })
                .await?;

            let operation = Operation {
                operation_id: random_operation_id(),
                parent_hash: state.root_hash,
                new_root: self.engine.params.encode_element(&a_new)?,
                kind,
                device_ids: device_ids.clone(),
            };
            match self.chain.submit(&operation).await {
                Ok(receipt) => {
                    let confirmed = self.chain.current_state().await?;
                    break (operation, state.root, new_witnesses, receipt, confirmed.version);
                }
                Err(e)
                    if revid_chain::is_stale_parent(&e) && attempts < PARENT_RACE_RETRIES =>
                {
                    attempts += 1;
                    tracing::debug!(
                        target: "gateway",
                        attempts,
                        "enrollment lost parent-hash race; rebuilding"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        };

        // Confirmed: persist the new records and refresh every other active
        // device's witness by folding in the new primes.
        let mut updated = Vec::with_capacity(active.len() + requests.len());
        if !active.is_empty() {
            let primes_in = primes.clone();
            let active_in = active;
            let refreshed: Vec<DeviceRecord> = self
                .offload(move |engine| {
                    let mut out = Vec::with_capacity(active_in.len());
                    for mut record in active_in {
                        let mut w = BigUint::from_bytes_be(&record.witness);
                        for prime in &primes_in {
                            w = engine.params.refresh_witness_on_add(&w, prime)?;
                        }
                        record.witness = engine.params.encode_element(&w)?.0.to_vec();
                        out.push(record);
                    }
                    Ok(out)
                })
                .await?;
            updated.extend(refreshed);
        }

        let mut outcomes = Vec::with_capacity(requests.len());
        for (i, id) in device_ids.iter().enumerate() {
            let witness = witnesses
                .get(i)
                .ok_or_else(|| GatewayError::Internal("missing enrollee witness".to_string()))?;
            let witness_bytes = self.engine.params.encode_element(witness)?.0.to_vec();
            let prime = prime_strings
                .get(i)
                .cloned()
                .ok_or_else(|| GatewayError::Internal("missing enrollee prime".to_string()))?;
            updated.push(DeviceRecord {
                device_id: *id,
                public_key: spkis
                    .get(i)
                    .cloned()
                    .ok_or_else(|| GatewayError::Internal("missing enrollee key".to_string()))?,
                key_type: *key_types
                    .get(i)
                    .ok_or_else(|| GatewayError::Internal("missing enrollee key type".to_string()))?,
                prime: prime.clone(),
                status: DeviceStatus::Active,
                witness: witness_bytes.clone(),
                challenge: None,
            });
            outcomes.push(EnrollmentOutcome {
                device_id: *id,
                prime,
                witness_hex: hex::encode(witness_bytes),
                root_hex: operation.new_root.to_hex(),
                version,
            });
        }

        self.devices.upsert_many(&updated).await?;
        self.devices
            .record_operation(&operation.operation_id, version)
            .await?;
        self.commit_snapshot(old_root, operation.new_root, version, receipt.block_number)
            .await?;

        tracing::info!(
            target: "gateway",
            enrolled = outcomes.len(),
            version,
            "enrollment committed"
        );
        Ok(outcomes)
    }
}
