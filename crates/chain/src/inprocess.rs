// Path: crates/chain/src/inprocess.rs
use async_trait::async_trait;
use tiny_keccak::{Hasher, Keccak};
use tokio::sync::Mutex;

use revid_api::chain::CommitmentChainClient;
use revid_contract::{Address, CommitmentContract};
use revid_types::app::{CommitmentEvent, CommitmentState, Operation, TxReceipt};
use revid_types::error::{ChainClientError, ErrorCode as _};

struct ChainInner {
    contract: CommitmentContract,
    block: u64,
    events: Vec<CommitmentEvent>,
}

/// An in-process chain: the contract model plus a block counter that
/// advances once per submission. No reorgs, every block confirmed.
pub struct InProcessChain {
    authority: Address,
    inner: Mutex<ChainInner>,
}

impl InProcessChain {
    /// Wraps a deployed contract model. `authority` is the principal the
    /// bridge would submit as; every submission executes under it.
    pub fn new(contract: CommitmentContract, authority: Address) -> Self {
        let block = contract.current_state().last_update_block;
        Self {
            authority,
            inner: Mutex::new(ChainInner {
                contract,
                block,
                events: Vec::new(),
            }),
        }
    }

    /// Runs a governance or pause action directly against the contract.
    /// Test-suite and local-mode escape hatch; the bridge has no such door.
    pub async fn with_contract<R>(
        &self,
        f: impl FnOnce(&mut CommitmentContract) -> R,
    ) -> R {
        let mut inner = self.inner.lock().await;
        f(&mut inner.contract)
    }
}

fn tx_hash(operation: &Operation, block: u64) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(&operation.operation_id);
    hasher.update(&block.to_be_bytes());
    hasher.finalize(&mut out);
    out
}

#[async_trait]
impl CommitmentChainClient for InProcessChain {
    async fn current_state(&self) -> Result<CommitmentState, ChainClientError> {
        let inner = self.inner.lock().await;
        Ok(inner.contract.current_state())
    }

    async fn submit(&self, operation: &Operation) -> Result<TxReceipt, ChainClientError> {
        let mut inner = self.inner.lock().await;
        inner.block += 1;
        let block = inner.block;
        let event = inner
            .contract
            .apply(self.authority, operation, block)
            .map_err(|e| ChainClientError::Reverted(format!("{}: {e}", e.code())))?;
        inner.events.push(event);
        Ok(TxReceipt {
            tx_hash: tx_hash(operation, block),
            block_number: block,
        })
    }

    async fn events_in_range(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CommitmentEvent>, ChainClientError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.block >= from_block && e.block <= to_block)
            .cloned()
            .collect())
    }

    async fn confirmed_head(&self) -> Result<u64, ChainClientError> {
        let inner = self.inner.lock().await;
        Ok(inner.block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_stale_parent;
    use revid_contract::{MultisigAuthority, MultisigManager};
    use revid_types::app::{OperationKind, RootBytes};

    const AUTHORITY: Address = [0xaa; 20];

    fn root(b: u8) -> RootBytes {
        let mut bytes = [0u8; 256];
        bytes[255] = b;
        RootBytes(bytes)
    }

    fn chain() -> InProcessChain {
        let manager = MultisigManager::new(
            MultisigAuthority {
                address: AUTHORITY,
                owners: vec![[1; 20], [2; 20], [3; 20]],
                threshold: 2,
            },
            [0xee; 20],
            31_337,
            [0xcc; 20],
        )
        .unwrap();
        let contract = CommitmentContract::new(root(4), manager, 0).unwrap();
        InProcessChain::new(contract, AUTHORITY)
    }

    #[tokio::test]
    async fn test_submit_confirms_and_emits() {
        let chain = chain();
        let state = chain.current_state().await.unwrap();

        let operation = Operation {
            operation_id: [1; 32],
            parent_hash: state.root_hash,
            new_root: root(9),
            kind: OperationKind::Update,
            device_ids: vec![],
        };
        let receipt = chain.submit(&operation).await.unwrap();
        assert_eq!(receipt.block_number, 1);

        let events = chain.events_in_range(0, 10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].version, 2);
        assert_eq!(chain.confirmed_head().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lost_parent_race_is_classified_stale() {
        let chain = chain();
        let state = chain.current_state().await.unwrap();

        let winner = Operation {
            operation_id: [1; 32],
            parent_hash: state.root_hash,
            new_root: root(9),
            kind: OperationKind::Update,
            device_ids: vec![],
        };
        let loser = Operation {
            operation_id: [2; 32],
            parent_hash: state.root_hash,
            new_root: root(10),
            kind: OperationKind::Update,
            device_ids: vec![],
        };
        chain.submit(&winner).await.unwrap();
        let err = chain.submit(&loser).await.unwrap_err();
        assert!(is_stale_parent(&err));

        // A replayed operation id with a refreshed parent is final.
        let replay = Operation {
            operation_id: [1; 32],
            parent_hash: chain.current_state().await.unwrap().root_hash,
            new_root: root(11),
            kind: OperationKind::Update,
            device_ids: vec![],
        };
        let err = chain.submit(&replay).await.unwrap_err();
        assert!(!is_stale_parent(&err));
        assert!(matches!(err, ChainClientError::Reverted(_)));
    }
}
