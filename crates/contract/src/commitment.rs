// Path: crates/contract/src/commitment.rs
//! The commitment contract state machine.
//!
//! Stores a single authoritative accumulator commitment and linearizes every
//! mutation through an ordered guard chain. Guards run strictly before any
//! state write; a rejected mutation leaves the contract untouched.

use std::collections::{BTreeMap, BTreeSet};
use tiny_keccak::{Hasher, Keccak};

use revid_types::app::{
    CommitmentEvent, CommitmentState, DeviceId, Operation, OperationKind, RootBytes,
};
use revid_types::error::ContractError;
use revid_types::MAX_BATCH_DEVICES;

use crate::multisig::{Address, MultisigManager};

/// Minimum blocks between two successful mutations.
pub const MIN_BLOCK_DELAY: u64 = 1;

/// The contract's view of a device. `Unknown` devices have never been
/// registered; `Revoked` is terminal.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DeviceLifecycle {
    /// Never registered.
    #[default]
    Unknown,
    /// Registered and accumulated.
    Active,
    /// Removed; may never be re-registered.
    Revoked,
}

fn keccak(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}

/// The on-chain commitment store, modeled deterministically.
#[derive(Clone, Debug)]
pub struct CommitmentContract {
    accumulator: RootBytes,
    current_hash: [u8; 32],
    version: u64,
    last_update_block: u64,
    executed_operations: BTreeSet<[u8; 32]>,
    device_status: BTreeMap<DeviceId, DeviceLifecycle>,
    paused: bool,
    manager: MultisigManager,
}

impl CommitmentContract {
    /// Deploys the contract with a genesis accumulator and a validated
    /// multi-sig manager. Version starts at 1.
    pub fn new(
        genesis_root: RootBytes,
        manager: MultisigManager,
        deploy_block: u64,
    ) -> Result<Self, ContractError> {
        manager.authority().validate()?;
        let current_hash = keccak(genesis_root.as_ref());
        Ok(Self {
            accumulator: genesis_root,
            current_hash,
            version: 1,
            last_update_block: deploy_block,
            executed_operations: BTreeSet::new(),
            device_status: BTreeMap::new(),
            paused: false,
            manager,
        })
    }

    /// `getCurrentState()`: the committed accumulator, its hash, and version.
    pub fn current_state(&self) -> CommitmentState {
        CommitmentState {
            root: self.accumulator,
            root_hash: self.current_hash,
            version: self.version,
            last_update_block: self.last_update_block,
        }
    }

    /// The contract's view of one device.
    pub fn device_status(&self, id: &DeviceId) -> DeviceLifecycle {
        self.device_status.get(id).copied().unwrap_or_default()
    }

    /// Whether mutations are currently suspended.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The multi-sig manager, for governance calls.
    pub fn manager_mut(&mut self) -> &mut MultisigManager {
        &mut self.manager
    }

    /// Emergency pause toggle. Emergency admin only.
    pub fn set_paused(&mut self, caller: Address, paused: bool) -> Result<(), ContractError> {
        if caller != self.manager.emergency_admin() {
            return Err(ContractError::NotEmergencyAdmin);
        }
        self.paused = paused;
        Ok(())
    }

    /// Executes one mutation. Guard order is part of the contract's public
    /// behavior; tests pin it.
    pub fn apply(
        &mut self,
        caller: Address,
        operation: &Operation,
        block: u64,
    ) -> Result<CommitmentEvent, ContractError> {
        // 1. Not paused.
        if self.paused {
            return Err(ContractError::Paused);
        }
        // 2. Caller is the configured multi-sig authority.
        if caller != self.manager.authority().address {
            return Err(ContractError::NotAuthority);
        }
        // 3. Multi-sig state is well-formed.
        self.manager.authority().validate()?;
        // 4. Rate limit by block height.
        let earliest = self.last_update_block + MIN_BLOCK_DELAY;
        if block < earliest {
            return Err(ContractError::BlockDelay {
                current: block,
                earliest,
            });
        }
        // 5. Linearization.
        if operation.parent_hash != self.current_hash {
            return Err(ContractError::ParentHashMismatch {
                expected: hex::encode(self.current_hash),
                got: hex::encode(operation.parent_hash),
            });
        }
        // 6. Replay guard.
        if operation.operation_id == [0u8; 32] {
            return Err(ContractError::ZeroOperationId);
        }
        if self.executed_operations.contains(&operation.operation_id) {
            return Err(ContractError::ReplayedOperation);
        }
        // 7. Payload shape.
        Self::check_payload(operation)?;
        // 8. Device-state preconditions.
        match operation.kind {
            OperationKind::Update => {}
            OperationKind::Register | OperationKind::BatchRegister => {
                for id in &operation.device_ids {
                    match self.device_status(id) {
                        DeviceLifecycle::Unknown => {}
                        DeviceLifecycle::Active => {
                            return Err(ContractError::DeviceAlreadyActive)
                        }
                        DeviceLifecycle::Revoked => return Err(ContractError::DeviceRevoked),
                    }
                }
            }
            OperationKind::Revoke | OperationKind::BatchRevoke => {
                for id in &operation.device_ids {
                    if self.device_status(id) != DeviceLifecycle::Active {
                        return Err(ContractError::DeviceNotActive);
                    }
                }
            }
        }

        // All guards passed; commit.
        let parent_hash = self.current_hash;
        self.accumulator = operation.new_root;
        self.current_hash = keccak(operation.new_root.as_ref());
        self.version += 1;
        self.last_update_block = block;
        self.executed_operations.insert(operation.operation_id);
        match operation.kind {
            OperationKind::Update => {}
            OperationKind::Register | OperationKind::BatchRegister => {
                for id in &operation.device_ids {
                    self.device_status.insert(*id, DeviceLifecycle::Active);
                }
            }
            OperationKind::Revoke | OperationKind::BatchRevoke => {
                for id in &operation.device_ids {
                    self.device_status.insert(*id, DeviceLifecycle::Revoked);
                }
            }
        }

        Ok(CommitmentEvent {
            kind: operation.kind,
            operation_id: operation.operation_id,
            parent_hash,
            new_root: self.accumulator,
            new_hash: self.current_hash,
            version: self.version,
            executor: caller,
            device_ids: operation.device_ids.clone(),
            block,
        })
    }

    fn check_payload(operation: &Operation) -> Result<(), ContractError> {
        let count = operation.device_ids.len();
        match operation.kind {
            OperationKind::Update => {
                if count != 0 {
                    return Err(ContractError::InvalidPayload(
                        "update carries no device ids".to_string(),
                    ));
                }
            }
            OperationKind::Register | OperationKind::Revoke => {
                if count != 1 {
                    return Err(ContractError::InvalidPayload(format!(
                        "single-device operation carries {count} device ids"
                    )));
                }
            }
            OperationKind::BatchRegister | OperationKind::BatchRevoke => {
                if count == 0 || count > MAX_BATCH_DEVICES {
                    return Err(ContractError::InvalidPayload(format!(
                        "batch size {count} outside 1..={MAX_BATCH_DEVICES}"
                    )));
                }
                let mut seen = BTreeSet::new();
                for id in &operation.device_ids {
                    if !seen.insert(id) {
                        return Err(ContractError::InvalidPayload(format!(
                            "duplicate device id {id} in batch"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
