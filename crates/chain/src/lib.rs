// Path: crates/chain/src/lib.rs
#![forbid(unsafe_code)]

//! # REVID Chain Clients
//!
//! Two implementations of [`revid_api::chain::CommitmentChainClient`]:
//!
//! - [`HttpBridgeClient`] speaks JSON over HTTP to the bridge service that
//!   fronts the deployed contract and the multi-sig wallet;
//! - [`InProcessChain`] executes the contract model directly, for local
//!   development and the gateway test suite.
//!
//! Contract rejections surface as [`Reverted`] errors carrying the
//! contract's stable error code; [`is_stale_parent`] classifies the one
//! rejection the gateway retries (a lost parent-hash race).
//!
//! [`Reverted`]: revid_types::error::ChainClientError::Reverted

mod bridge;
mod inprocess;

pub use bridge::HttpBridgeClient;
pub use inprocess::InProcessChain;

/// True if a submission failure is a lost parent-hash race, i.e. the
/// mutation should be rebuilt against the refreshed root and retried.
pub fn is_stale_parent(err: &revid_types::error::ChainClientError) -> bool {
    matches!(
        err,
        revid_types::error::ChainClientError::Reverted(msg)
            if msg.contains("PARENT_HASH_MISMATCH")
    )
}
