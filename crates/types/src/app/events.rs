// Path: crates/types/src/app/events.rs

//! Contract events, as observed by the gateway's ingestion loop.

use parity_scale_codec::{Decode, Encode};

use crate::app::{DeviceId, OperationKind, RootBytes};

/// The single event type every successful contract mutation emits.
///
/// The gateway reconstructs the latest committed state by tailing these
/// events; ingestion is idempotent, keyed by `operation_id`.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug)]
pub struct CommitmentEvent {
    /// The mutation kind that produced this event.
    pub kind: OperationKind,
    /// The replay-guard id of the executed operation.
    pub operation_id: [u8; 32],
    /// Hash of the accumulator this mutation replaced. Lets the ingestion
    /// loop keccak-chain each accepted root against the prior one.
    pub parent_hash: [u8; 32],
    /// The committed accumulator.
    pub new_root: RootBytes,
    /// Keccak-256 of `new_root`.
    pub new_hash: [u8; 32],
    /// The post-mutation version counter.
    pub version: u64,
    /// The principal that executed the mutation (the multi-sig authority).
    pub executor: [u8; 20],
    /// Devices touched by the mutation.
    pub device_ids: Vec<DeviceId>,
    /// Block height at which the mutation was committed.
    pub block: u64,
}
