// Path: crates/storage/src/memory.rs
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use revid_api::storage::{DeviceStore, MetadataStore};
use revid_types::app::{AuthChallenge, DeviceId, DeviceRecord, DeviceStatus};
use revid_types::error::StorageError;

/// An in-memory registry with the same semantics as the redb store.
///
/// Used by the gateway test suite and short-lived tooling; nothing survives
/// the process.
#[derive(Default)]
pub struct MemoryDeviceStore {
    devices: Mutex<HashMap<DeviceId, DeviceRecord>>,
    operations: Mutex<HashMap<[u8; 32], u64>>,
    metadata: Mutex<HashMap<String, String>>,
}

impl MemoryDeviceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err() -> StorageError {
        StorageError::Backend("memory store mutex poisoned".to_string())
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn get(&self, id: &DeviceId) -> Result<Option<DeviceRecord>, StorageError> {
        let devices = self.devices.lock().map_err(|_| Self::lock_err())?;
        Ok(devices.get(id).cloned())
    }

    async fn upsert(&self, record: &DeviceRecord) -> Result<(), StorageError> {
        let mut devices = self.devices.lock().map_err(|_| Self::lock_err())?;
        devices.insert(record.device_id, record.clone());
        Ok(())
    }

    async fn upsert_many(&self, records: &[DeviceRecord]) -> Result<(), StorageError> {
        let mut devices = self.devices.lock().map_err(|_| Self::lock_err())?;
        for record in records {
            devices.insert(record.device_id, record.clone());
        }
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: DeviceStatus,
    ) -> Result<Vec<DeviceRecord>, StorageError> {
        let devices = self.devices.lock().map_err(|_| Self::lock_err())?;
        let mut out: Vec<DeviceRecord> = devices
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        // HashMap order is arbitrary; keep listings deterministic.
        out.sort_by_key(|r| r.device_id);
        Ok(out)
    }

    async fn count_by_status(&self, status: DeviceStatus) -> Result<u64, StorageError> {
        let devices = self.devices.lock().map_err(|_| Self::lock_err())?;
        Ok(devices.values().filter(|r| r.status == status).count() as u64)
    }

    async fn set_challenge(
        &self,
        id: &DeviceId,
        challenge: Option<AuthChallenge>,
    ) -> Result<bool, StorageError> {
        let mut devices = self.devices.lock().map_err(|_| Self::lock_err())?;
        match devices.get_mut(id) {
            Some(record) => {
                record.challenge = challenge;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn refresh_witness(
        &self,
        id: &DeviceId,
        witness: &[u8],
    ) -> Result<bool, StorageError> {
        let mut devices = self.devices.lock().map_err(|_| Self::lock_err())?;
        match devices.get_mut(id) {
            Some(record) if record.status == DeviceStatus::Active => {
                record.witness = witness.to_vec();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_operation(
        &self,
        operation_id: &[u8; 32],
        version: u64,
    ) -> Result<bool, StorageError> {
        let mut operations = self.operations.lock().map_err(|_| Self::lock_err())?;
        if operations.contains_key(operation_id) {
            return Ok(false);
        }
        operations.insert(*operation_id, version);
        Ok(true)
    }
}

#[async_trait]
impl MetadataStore for MemoryDeviceStore {
    async fn get_meta(&self, key: &str) -> Result<Option<String>, StorageError> {
        let metadata = self.metadata.lock().map_err(|_| Self::lock_err())?;
        Ok(metadata.get(key).cloned())
    }

    async fn put_meta(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut metadata = self.metadata.lock().map_err(|_| Self::lock_err())?;
        metadata.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
