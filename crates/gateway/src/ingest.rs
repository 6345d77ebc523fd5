// Path: crates/gateway/src/ingest.rs
//! Contract-event ingestion.
//!
//! The gateway reconstructs the latest committed state by tailing the
//! contract's events from the last fully processed block. Ingestion is
//! idempotent (operation-id dedup), resumable across restarts (the cursor
//! lives in metadata), and reorg-tolerant: only confirmed blocks are read,
//! and each accepted root is keccak-chained against the previous one.

use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use revid_types::app::CommitmentEvent;
use revid_types::error::{ChainClientError, GatewayError};
use revid_types::{keys, Result};

use crate::IdentityGateway;

impl IdentityGateway {
    /// Runs the ingestion loop until `shutdown` flips.
    pub async fn run_event_ingestion(
        &self,
        poll_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!(target: "gateway", "event ingestion stopping");
                    return;
                }
                _ = sleep(poll_interval) => {
                    match self.ingest_once().await {
                        Ok(applied) if applied > 0 => {
                            tracing::debug!(target: "gateway", applied, "ingested contract events");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(target: "gateway", error = %e, "event ingestion pass failed");
                        }
                    }
                }
            }
        }
    }

    /// One ingestion pass. Returns how many events newly applied (events
    /// this gateway itself committed are deduplicated away).
    pub async fn ingest_once(&self) -> Result<u64> {
        let head = self.chain.confirmed_head().await?;
        let from = match self.meta.get_meta(keys::META_LAST_PROCESSED_BLOCK).await? {
            Some(text) => text
                .parse::<u64>()
                .map_err(|e| GatewayError::Internal(format!("corrupt block cursor: {e}")))?
                .saturating_add(1),
            None => 0,
        };
        if from > head {
            return Ok(0);
        }

        let events = self.chain.events_in_range(from, head).await?;
        let mut applied = 0u64;
        for event in events {
            if self.apply_event(&event).await? {
                applied += 1;
            }
        }
        self.meta
            .put_meta(keys::META_LAST_PROCESSED_BLOCK, &head.to_string())
            .await?;
        Ok(applied)
    }

    /// Applies one event if it has not been seen. Returns whether it was new.
    async fn apply_event(&self, event: &CommitmentEvent) -> Result<bool> {
        if !Self::event_hash_consistent(event) {
            return Err(ChainClientError::Decode(
                "event hash is not the keccak of its root".to_string(),
            )
            .into());
        }
        let snapshot = self.snapshot.read().await.clone();
        if event.version <= snapshot.version {
            // Already reflected: the mutation path that produced it
            // advanced the snapshot, or the cursor moved backwards.
            return Ok(false);
        }
        if event.version != snapshot.version + 1 {
            return Err(ChainClientError::EventGap {
                expected: snapshot.version + 1,
                got: event.version,
            }
            .into());
        }
        // Chain-link check: the event must extend the root we hold.
        let expected_parent = revid_crypto::accumulator::commitment_hash(&snapshot.root);
        if event.parent_hash != expected_parent {
            return Err(ChainClientError::Decode(
                "event does not chain onto the held root".to_string(),
            )
            .into());
        }
        // Mark last, after every check that could reject the event; a
        // marked-but-unapplied event would otherwise be lost forever.
        if !self
            .devices
            .record_operation(&event.operation_id, event.version)
            .await?
        {
            return Ok(false);
        }

        self.commit_snapshot(snapshot.root, event.new_root, event.version, event.block)
            .await?;
        tracing::info!(
            target: "gateway",
            version = event.version,
            block = event.block,
            kind = ?event.kind,
            "external commitment event applied"
        );
        Ok(true)
    }
}
