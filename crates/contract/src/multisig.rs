// Path: crates/contract/src/multisig.rs
//! The multi-signature manager: owner/threshold governance for the
//! commitment contract's authority.
//!
//! The threshold-signature envelope itself lives in the wallet; this
//! component governs *who* the authority is. Owner and threshold changes go
//! through a 24-hour timelock (queue, wait, execute); the emergency admin
//! can cancel a queued change before execution and toggle the pause flag.
//! Every queued change is identified by a domain-separated hash so a change
//! approved for one manager on one chain can never be replayed elsewhere.

use parity_scale_codec::Encode;
use std::collections::BTreeMap;
use tiny_keccak::{Hasher, Keccak};

use revid_types::error::ContractError;

/// A 20-byte chain principal address.
pub type Address = [u8; 20];

/// Seconds a queued authority change must wait before execution.
pub const TIMELOCK_SECS: u64 = 24 * 60 * 60;

fn keccak(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}

/// The multi-sig principal: its wallet address, owners, and threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultisigAuthority {
    /// The wallet address the contract compares callers against.
    pub address: Address,
    /// The owner set behind the wallet.
    pub owners: Vec<Address>,
    /// Signatures required to execute a mutation.
    pub threshold: u32,
}

impl MultisigAuthority {
    /// Enforces the contract's well-formedness bounds: threshold at least 2,
    /// between 3 and 10 owners, threshold within the owner count, owners
    /// distinct.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.threshold < 2 {
            return Err(ContractError::MalformedAuthority(
                "threshold must be at least 2".to_string(),
            ));
        }
        if self.owners.len() < 3 || self.owners.len() > 10 {
            return Err(ContractError::MalformedAuthority(format!(
                "owner count {} outside [3, 10]",
                self.owners.len()
            )));
        }
        if self.threshold as usize > self.owners.len() {
            return Err(ContractError::MalformedAuthority(
                "threshold exceeds owner count".to_string(),
            ));
        }
        let mut sorted = self.owners.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != self.owners.len() {
            return Err(ContractError::MalformedAuthority(
                "duplicate owner".to_string(),
            ));
        }
        Ok(())
    }
}

/// A governance action on the authority configuration.
#[derive(Clone, Debug, PartialEq, Eq, Encode)]
pub enum AuthorityChange {
    /// Add a new owner.
    AddOwner(Address),
    /// Remove an existing owner.
    RemoveOwner(Address),
    /// Change the signature threshold.
    SetThreshold(u32),
}

#[derive(Clone, Debug)]
struct QueuedChange {
    change: AuthorityChange,
    queued_at: u64,
}

/// The manager: authority configuration, its timelocked change queue, and
/// the emergency-admin controls.
#[derive(Clone, Debug)]
pub struct MultisigManager {
    authority: MultisigAuthority,
    emergency_admin: Address,
    /// Domain-separation inputs for change hashes.
    chain_id: u64,
    manager_address: Address,
    /// Monotonic per-manager change counter; part of the hash domain.
    nonce: u64,
    queued: BTreeMap<[u8; 32], QueuedChange>,
}

impl MultisigManager {
    /// Builds a manager over a validated authority.
    pub fn new(
        authority: MultisigAuthority,
        emergency_admin: Address,
        chain_id: u64,
        manager_address: Address,
    ) -> Result<Self, ContractError> {
        authority.validate()?;
        Ok(Self {
            authority,
            emergency_admin,
            chain_id,
            manager_address,
            nonce: 0,
            queued: BTreeMap::new(),
        })
    }

    /// The current authority configuration.
    pub fn authority(&self) -> &MultisigAuthority {
        &self.authority
    }

    /// The emergency admin principal.
    pub fn emergency_admin(&self) -> Address {
        self.emergency_admin
    }

    /// Domain-separated hash of a change: `(op_type, params, chainId,
    /// manager_address, nonce)`, keccak'd over the canonical encoding.
    fn change_hash(&self, change: &AuthorityChange, nonce: u64) -> [u8; 32] {
        let mut preimage = Vec::new();
        preimage.extend_from_slice(b"REVID-MULTISIG/v1");
        preimage.extend_from_slice(&change.encode());
        preimage.extend_from_slice(&self.chain_id.to_be_bytes());
        preimage.extend_from_slice(&self.manager_address);
        preimage.extend_from_slice(&nonce.to_be_bytes());
        keccak(&preimage)
    }

    /// Queues an authority change. Only the authority itself may govern
    /// its own configuration. Returns the change id.
    pub fn queue_change(
        &mut self,
        caller: Address,
        change: AuthorityChange,
        now: u64,
    ) -> Result<[u8; 32], ContractError> {
        if caller != self.authority.address {
            return Err(ContractError::NotAuthority);
        }
        let id = self.change_hash(&change, self.nonce);
        self.nonce += 1;
        self.queued.insert(id, QueuedChange { change, queued_at: now });
        Ok(id)
    }

    /// Executes a queued change once the timelock has elapsed. The resulting
    /// configuration must itself be well-formed, so governance can never
    /// walk the authority out of its bounds.
    pub fn execute_change(
        &mut self,
        caller: Address,
        id: [u8; 32],
        now: u64,
    ) -> Result<(), ContractError> {
        if caller != self.authority.address {
            return Err(ContractError::NotAuthority);
        }
        let queued = self
            .queued
            .get(&id)
            .ok_or(ContractError::UnknownQueuedChange)?;
        let ready_at = queued.queued_at + TIMELOCK_SECS;
        if now < ready_at {
            return Err(ContractError::TimelockNotElapsed {
                remaining_secs: ready_at - now,
            });
        }

        let mut next = self.authority.clone();
        match &queued.change {
            AuthorityChange::AddOwner(owner) => next.owners.push(*owner),
            AuthorityChange::RemoveOwner(owner) => next.owners.retain(|o| o != owner),
            AuthorityChange::SetThreshold(threshold) => next.threshold = *threshold,
        }
        next.validate()?;

        self.queued.remove(&id);
        self.authority = next;
        Ok(())
    }

    /// Cancels a queued change before execution. Emergency admin only.
    pub fn cancel_change(&mut self, caller: Address, id: [u8; 32]) -> Result<(), ContractError> {
        if caller != self.emergency_admin {
            return Err(ContractError::NotEmergencyAdmin);
        }
        self.queued
            .remove(&id)
            .map(|_| ())
            .ok_or(ContractError::UnknownQueuedChange)
    }
}
