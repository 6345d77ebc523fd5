// Path: crates/gateway/src/revoke.rs
//! Revocation: remove a device's prime from the accumulator in O(1) via the
//! trapdoor, commit on chain, and refresh the survivors' witnesses.

use num_bigint::BigUint;

use revid_types::app::{DeviceId, DeviceRecord, DeviceStatus, Operation, OperationKind};
use revid_types::error::{DeviceError, GatewayError};
use revid_types::{Result, MAX_BATCH_DEVICES};

use crate::{random_operation_id, IdentityGateway, PARENT_RACE_RETRIES};

/// The committed state after a revocation.
#[derive(Clone, Debug)]
pub struct RevocationOutcome {
    /// The committed root after removal, hex.
    pub root_hex: String,
    /// The committed version after removal.
    pub version: u64,
}

impl IdentityGateway {
    /// Revokes one device. The transition is terminal.
    pub async fn revoke(&self, device_id: &DeviceId) -> Result<RevocationOutcome> {
        self.revoke_batch(&[*device_id]).await
    }

    /// Revokes up to 50 devices under a single on-chain mutation, with one
    /// combined trapdoor exponentiation.
    pub async fn revoke_batch(&self, device_ids: &[DeviceId]) -> Result<RevocationOutcome> {
        if device_ids.is_empty() || device_ids.len() > MAX_BATCH_DEVICES {
            return Err(GatewayError::InvalidInput(format!(
                "revocation batch size {} outside 1..={MAX_BATCH_DEVICES}",
                device_ids.len()
            )));
        }
        for (i, id) in device_ids.iter().enumerate() {
            if device_ids.iter().skip(i + 1).any(|other| other == id) {
                return Err(GatewayError::InvalidInput(format!(
                    "duplicate device {id} in revocation batch"
                )));
            }
        }

        let _guard = self.writer.lock().await;

        let mut records = Vec::with_capacity(device_ids.len());
        for id in device_ids {
            let record = self
                .devices
                .get(id)
                .await?
                .ok_or(DeviceError::NotFound(*id))?;
            match record.status {
                DeviceStatus::Active => records.push(record),
                DeviceStatus::Revoked => {
                    return Err(DeviceError::AlreadyRevoked(*id).into())
                }
            }
        }
        let primes: Vec<BigUint> = records
            .iter()
            .map(|r| revid_crypto::accumulator::parse_prime(&r.prime).map_err(GatewayError::from))
            .collect::<Result<_>>()?;

        let kind = if device_ids.len() == 1 {
            OperationKind::Revoke
        } else {
            OperationKind::BatchRevoke
        };

        let mut attempts = 0;
        let (operation, old_root, a_new, receipt, version) = loop {
            let state = self.chain.current_state().await?;
            let a_old = self.engine.params.decode_element(&state.root)?;

            let primes_in = primes.clone();
            let a_new = self
                .offload(move |engine| {
                    Ok(engine
                        .params
                        .trapdoor_batch_remove(&a_old, &primes_in, &engine.trapdoor)?)
                })
                .await?;

            let operation = Operation {
                operation_id: random_operation_id(),
                parent_hash: state.root_hash,
                new_root: self.engine.params.encode_element(&a_new)?,
                kind,
                device_ids: device_ids.to_vec(),
            };
            match self.chain.submit(&operation).await {
                Ok(receipt) => {
                    let confirmed = self.chain.current_state().await?;
                    break (operation, state.root, a_new, receipt, confirmed.version);
                }
                Err(e)
                    if revid_chain::is_stale_parent(&e) && attempts < PARENT_RACE_RETRIES =>
                {
                    attempts += 1;
                    tracing::debug!(
                        target: "gateway",
                        attempts,
                        "revocation lost parent-hash race; rebuilding"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        };

        // Confirmed. Mark revoked, drop witnesses and outstanding
        // challenges; a revoked device's witness means nothing.
        let mut updated: Vec<DeviceRecord> = Vec::new();
        for mut record in records {
            record.status = DeviceStatus::Revoked;
            record.witness = Vec::new();
            record.challenge = None;
            updated.push(record);
        }

        // Refresh the survivors with the trapdoor path: removing a holder's
        // own prime from the new root is exactly its fresh witness.
        let survivors = self.devices.list_by_status(DeviceStatus::Active).await?;
        let survivors: Vec<DeviceRecord> = survivors
            .into_iter()
            .filter(|r| !device_ids.contains(&r.device_id))
            .collect();
        if !survivors.is_empty() {
            let a_new_in = a_new.clone();
            let refreshed: Vec<DeviceRecord> = self
                .offload(move |engine| {
                    let mut out = Vec::with_capacity(survivors.len());
                    for mut record in survivors {
                        let prime = revid_crypto::accumulator::parse_prime(&record.prime)?;
                        let w = engine
                            .params
                            .trapdoor_remove(&a_new_in, &prime, &engine.trapdoor)?;
                        record.witness = engine.params.encode_element(&w)?.0.to_vec();
                        out.push(record);
                    }
                    Ok(out)
                })
                .await?;
            updated.extend(refreshed);
        }

        self.devices.upsert_many(&updated).await?;
        self.devices
            .record_operation(&operation.operation_id, version)
            .await?;
        self.commit_snapshot(old_root, operation.new_root, version, receipt.block_number)
            .await?;

        tracing::info!(
            target: "gateway",
            revoked = device_ids.len(),
            version,
            "revocation committed"
        );
        Ok(RevocationOutcome {
            root_hex: operation.new_root.to_hex(),
            version,
        })
    }
}
