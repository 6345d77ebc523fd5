// Path: crates/api/src/chain/mod.rs
//! The chain-client seam.
//!
//! The gateway speaks to the commitment contract only through this trait:
//! the production implementation proxies an HTTP bridge in front of the
//! multi-sig wallet, the local implementation executes the contract model
//! in-process. Both linearize through the contract's parent-hash check.

use async_trait::async_trait;
use revid_types::app::{CommitmentEvent, CommitmentState, Operation, TxReceipt};
use revid_types::error::ChainClientError;

/// Client for the on-chain commitment contract.
#[async_trait]
pub trait CommitmentChainClient: Send + Sync {
    /// Reads the contract's latest committed state.
    async fn current_state(&self) -> Result<CommitmentState, ChainClientError>;

    /// Submits a mutation through the multi-sig path and waits for
    /// inclusion. A contract rejection surfaces as
    /// [`ChainClientError::Reverted`] with the contract's error code in the
    /// message; the caller decides whether the rejection is retryable
    /// (stale parent hash) or final.
    async fn submit(&self, operation: &Operation) -> Result<TxReceipt, ChainClientError>;

    /// Returns all events in the inclusive block range, oldest first.
    /// Implementations only surface sufficiently confirmed blocks.
    async fn events_in_range(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CommitmentEvent>, ChainClientError>;

    /// The newest block the client considers confirmed.
    async fn confirmed_head(&self) -> Result<u64, ChainClientError>;
}
