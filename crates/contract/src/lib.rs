// Path: crates/contract/src/lib.rs
#![forbid(unsafe_code)]

//! # REVID Commitment Contract
//!
//! A deterministic model of the on-chain commitment contract: authoritative,
//! publicly auditable accumulator storage behind a multi-signature gate.
//! The chain crate executes this model in-process for local mode and tests;
//! the deployed counterpart enforces identical semantics, so every guard
//! here mirrors a contract-side `require`.

mod commitment;
mod multisig;

pub use commitment::{CommitmentContract, DeviceLifecycle, MIN_BLOCK_DELAY};
pub use multisig::{
    Address, AuthorityChange, MultisigAuthority, MultisigManager, TIMELOCK_SECS,
};
