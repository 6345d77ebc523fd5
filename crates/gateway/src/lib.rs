// Path: crates/gateway/src/lib.rs
#![forbid(unsafe_code)]

//! # REVID Gateway Orchestration
//!
//! The pipeline that turns device requests into accumulator mutations,
//! persisted state, and confirmed on-chain transactions, plus the inverse:
//! the challenge-response verification path.
//!
//! ## Concurrency model
//!
//! Exactly one task at a time may be between "read the old accumulator" and
//! "persist the new one": the writer mutex is held across in-memory
//! mutation, on-chain proposal, confirmation, persistence, and witness
//! refresh. Readers (authentication, status) never take it; they work from
//! the last-confirmed [`Snapshot`]. CPU-bound modexp batches run on the
//! blocking pool.

mod auth;
mod enroll;
mod ingest;
mod revoke;

#[cfg(test)]
mod tests;

use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

use revid_api::chain::CommitmentChainClient;
use revid_api::storage::{DeviceStore, MetadataStore};
use revid_crypto::accumulator::{commitment_hash, RsaParams, Trapdoor};
use revid_types::app::{DeviceStatus, Operation, OperationKind, RootBytes};
use revid_types::error::GatewayError;
use revid_types::{keys, Result};

pub use auth::{AuthOutcome, ChallengeOutcome, VerifyRequest};
pub use enroll::EnrollmentOutcome;
pub use revoke::RevocationOutcome;

/// How often a mutation is rebuilt and resubmitted after losing a
/// parent-hash race before the failure is surfaced.
const PARENT_RACE_RETRIES: usize = 3;

/// The accumulator engine inputs, shared across blocking-pool tasks.
pub(crate) struct Engine {
    pub(crate) params: RsaParams,
    pub(crate) trapdoor: Trapdoor,
}

/// The last-confirmed commitment view served to readers.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// The latest committed root.
    pub root: RootBytes,
    /// The root this one replaced. A witness that verifies here (but not
    /// against `root`) is stale, not invalid.
    pub previous_root: Option<RootBytes>,
    /// The committed version counter.
    pub version: u64,
    /// Block height of the last mutation.
    pub block: u64,
}

/// Liveness of the gateway's collaborators.
#[derive(Clone, Copy, Debug)]
pub struct ComponentHealth {
    /// The device registry answered.
    pub db: bool,
    /// The chain client answered.
    pub chain: bool,
}

/// The public accumulator view.
#[derive(Clone, Debug)]
pub struct AccumulatorView {
    /// The committed root, hex (256 bytes).
    pub root_hex: String,
    /// Keccak-256 of the root encoding, hex.
    pub root_hash_hex: String,
    /// The committed version.
    pub version: u64,
    /// Block height of the last mutation.
    pub block: u64,
}

/// Gateway tuning knobs, extracted from the node configuration.
#[derive(Clone, Copy, Debug)]
pub struct GatewayConfig {
    /// Seconds an issued challenge nonce stays valid.
    pub nonce_ttl_seconds: u64,
}

/// The orchestration core: enrollment, authentication, revocation, witness
/// bookkeeping, and commitment-state tracking.
pub struct IdentityGateway {
    pub(crate) engine: Arc<Engine>,
    pub(crate) devices: Arc<dyn DeviceStore>,
    pub(crate) meta: Arc<dyn MetadataStore>,
    pub(crate) chain: Arc<dyn CommitmentChainClient>,
    pub(crate) config: GatewayConfig,
    /// The single-writer lock. See the crate docs.
    pub(crate) writer: Mutex<()>,
    pub(crate) snapshot: RwLock<Snapshot>,
    /// Per-device locks serializing the challenge lifecycle, so a nonce is
    /// verified and invalidated as one step.
    pub(crate) device_locks: DashMap<revid_types::app::DeviceId, Arc<Mutex<()>>>,
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A fresh, non-zero operation id.
pub(crate) fn random_operation_id() -> [u8; 32] {
    let mut id = [0u8; 32];
    loop {
        OsRng.fill_bytes(&mut id);
        if id != [0u8; 32] {
            return id;
        }
    }
}

impl IdentityGateway {
    /// Builds the gateway and synchronizes its snapshot with the chain.
    ///
    /// The contract is authoritative: whatever it currently commits becomes
    /// the working root, and the public parameters are mirrored into
    /// metadata for operability. The trapdoor is not persisted.
    pub async fn new(
        params: RsaParams,
        trapdoor: Trapdoor,
        devices: Arc<dyn DeviceStore>,
        meta: Arc<dyn MetadataStore>,
        chain: Arc<dyn CommitmentChainClient>,
        config: GatewayConfig,
    ) -> Result<Self> {
        let state = chain.current_state().await?;
        // Reject a commitment this parameter set cannot have produced.
        params.decode_element(&state.root)?;

        let previous_root = match meta.get_meta(keys::META_PREV_ROOT_HEX).await? {
            Some(hex_root) => Some(RootBytes::from_hex(&hex_root)?),
            None => None,
        };

        meta.put_meta(keys::META_ROOT_HEX, &state.root.to_hex()).await?;
        meta.put_meta(keys::META_VERSION, &state.version.to_string())
            .await?;
        meta.put_meta(
            keys::META_MODULUS_HEX,
            &hex::encode(params.modulus().to_bytes_be()),
        )
        .await?;
        meta.put_meta(
            keys::META_GENERATOR_HEX,
            &hex::encode(params.generator().to_bytes_be()),
        )
        .await?;

        tracing::info!(
            target: "gateway",
            version = state.version,
            root = %state.root.to_hex().get(..16).unwrap_or_default(),
            "gateway synchronized with commitment contract"
        );

        Ok(Self {
            engine: Arc::new(Engine { params, trapdoor }),
            devices,
            meta,
            chain,
            config,
            writer: Mutex::new(()),
            device_locks: DashMap::new(),
            snapshot: RwLock::new(Snapshot {
                root: state.root,
                previous_root,
                version: state.version,
                block: state.last_update_block,
            }),
        })
    }

    /// The current reader snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    /// Liveness of the gateway's collaborators, for the health surface.
    pub async fn component_health(&self) -> ComponentHealth {
        ComponentHealth {
            db: self
                .devices
                .count_by_status(DeviceStatus::Active)
                .await
                .is_ok(),
            chain: self.chain.confirmed_head().await.is_ok(),
        }
    }

    /// The public accumulator view served on the read endpoint.
    pub async fn accumulator_view(&self) -> AccumulatorView {
        let snapshot = self.snapshot.read().await.clone();
        AccumulatorView {
            root_hex: snapshot.root.to_hex(),
            root_hash_hex: hex::encode(commitment_hash(&snapshot.root)),
            version: snapshot.version,
            block: snapshot.block,
        }
    }

    /// Count of active devices, for the status surface.
    pub async fn active_device_count(&self) -> Result<u64> {
        Ok(self.devices.count_by_status(DeviceStatus::Active).await?)
    }

    /// The accumulator parameters (public half only).
    pub fn params(&self) -> &RsaParams {
        &self.engine.params
    }

    /// The stored witness for a device, with the snapshot version it is
    /// current for.
    pub async fn witness(
        &self,
        device_id: &revid_types::app::DeviceId,
    ) -> Result<(String, u64)> {
        let record = self
            .devices
            .get(device_id)
            .await?
            .ok_or(revid_types::error::DeviceError::NotFound(*device_id))?;
        if !record.is_active() {
            return Err(revid_types::error::DeviceError::NotActive(*device_id).into());
        }
        let version = self.snapshot.read().await.version;
        Ok((hex::encode(&record.witness), version))
    }

    /// Replaces the committed accumulator without touching device statuses.
    /// Operator path: recover from parameter migration or external repair.
    ///
    /// With `parent_hash` pinned the mutation fails rather than retry on a
    /// lost race; with `None` it linearizes against whatever is current.
    pub async fn update_accumulator(
        &self,
        new_root: RootBytes,
        parent_hash: Option<[u8; 32]>,
    ) -> Result<(RootBytes, u64, [u8; 32])> {
        self.engine.params.decode_element(&new_root)?;

        let _guard = self.writer.lock().await;
        let mut state = self.chain.current_state().await?;
        let pinned = parent_hash.is_some();
        let mut attempts = 0;
        loop {
            let operation = Operation {
                operation_id: random_operation_id(),
                parent_hash: parent_hash.unwrap_or(state.root_hash),
                new_root,
                kind: OperationKind::Update,
                device_ids: vec![],
            };
            match self.chain.submit(&operation).await {
                Ok(receipt) => {
                    let confirmed = self.chain.current_state().await?;
                    self.devices
                        .record_operation(&operation.operation_id, confirmed.version)
                        .await?;
                    self.commit_snapshot(state.root, confirmed.root, confirmed.version, receipt.block_number)
                        .await?;
                    return Ok((confirmed.root, receipt.block_number, receipt.tx_hash));
                }
                Err(e) if !pinned && revid_chain::is_stale_parent(&e) && attempts < PARENT_RACE_RETRIES => {
                    attempts += 1;
                    state = self.chain.current_state().await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Advances the snapshot and its persisted mirror after a confirmed
    /// mutation. Called with the writer lock held.
    pub(crate) async fn commit_snapshot(
        &self,
        old_root: RootBytes,
        new_root: RootBytes,
        version: u64,
        block: u64,
    ) -> Result<()> {
        self.meta
            .put_meta(keys::META_PREV_ROOT_HEX, &old_root.to_hex())
            .await?;
        self.meta.put_meta(keys::META_ROOT_HEX, &new_root.to_hex()).await?;
        self.meta
            .put_meta(keys::META_VERSION, &version.to_string())
            .await?;

        let mut snapshot = self.snapshot.write().await;
        snapshot.previous_root = Some(old_root);
        snapshot.root = new_root;
        snapshot.version = version;
        snapshot.block = block;
        Ok(())
    }

    /// Sanity check used by the ingestion loop: an event's hash must be the
    /// keccak of the root it carries.
    pub(crate) fn event_hash_consistent(event: &revid_types::app::CommitmentEvent) -> bool {
        commitment_hash(&event.new_root) == event.new_hash
    }

    /// The serialization lock for one device's challenge lifecycle.
    pub(crate) fn device_lock(&self, id: &revid_types::app::DeviceId) -> Arc<Mutex<()>> {
        self.device_locks
            .entry(*id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs `f` on the blocking pool with a handle to the engine.
    pub(crate) async fn offload<R: Send + 'static>(
        &self,
        f: impl FnOnce(&Engine) -> Result<R> + Send + 'static,
    ) -> Result<R> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || f(&engine))
            .await
            .map_err(|e| GatewayError::Internal(format!("blocking task failed: {e}")))?
    }
}
