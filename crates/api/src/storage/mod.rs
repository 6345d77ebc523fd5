// Path: crates/api/src/storage/mod.rs
//! Persistence seams for the gateway.
//!
//! Two stores with specified semantics, not a specific schema: the device
//! registry (keyed by device id, with a status index) and a small metadata
//! KV holding the committed accumulator state and chain cursor.

use async_trait::async_trait;
use revid_types::app::{AuthChallenge, DeviceId, DeviceRecord, DeviceStatus};
use revid_types::error::StorageError;

/// The device registry.
///
/// Upserts happen while the gateway holds the accumulator writer lock, so
/// implementations only need per-call atomicity, not cross-call transactions.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Fetches a device record by id.
    async fn get(&self, id: &DeviceId) -> Result<Option<DeviceRecord>, StorageError>;

    /// Inserts or replaces a device record.
    async fn upsert(&self, record: &DeviceRecord) -> Result<(), StorageError>;

    /// Replaces a batch of records atomically (used by witness refresh).
    async fn upsert_many(&self, records: &[DeviceRecord]) -> Result<(), StorageError>;

    /// Lists all devices currently in the given status.
    async fn list_by_status(&self, status: DeviceStatus)
        -> Result<Vec<DeviceRecord>, StorageError>;

    /// Counts devices in the given status.
    async fn count_by_status(&self, status: DeviceStatus) -> Result<u64, StorageError>;

    /// Sets or clears a device's outstanding challenge without touching the
    /// rest of the record, so the authentication path can never clobber a
    /// concurrent lifecycle write. Returns `false` if the device is unknown.
    async fn set_challenge(
        &self,
        id: &DeviceId,
        challenge: Option<AuthChallenge>,
    ) -> Result<bool, StorageError>;

    /// Replaces a device's witness, but only while the device is active.
    /// Returns whether the write happened.
    async fn refresh_witness(
        &self,
        id: &DeviceId,
        witness: &[u8],
    ) -> Result<bool, StorageError>;

    /// Records an executed operation id; returns `false` if it was already
    /// recorded. This is the idempotency guard for event replay.
    async fn record_operation(
        &self,
        operation_id: &[u8; 32],
        version: u64,
    ) -> Result<bool, StorageError>;
}

/// The metadata KV store.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetches a metadata value.
    async fn get_meta(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a metadata value.
    async fn put_meta(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
