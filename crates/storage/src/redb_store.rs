// Path: crates/storage/src/redb_store.rs
use async_trait::async_trait;
use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;
use std::sync::Arc;

use revid_api::storage::{DeviceStore, MetadataStore};
use revid_types::app::{AuthChallenge, DeviceId, DeviceRecord, DeviceStatus};
use revid_types::codec;
use revid_types::error::StorageError;

/// ---- Table definitions (single DB) ----
/// Device registry: device_id -> SCALE(DeviceRecord).
const DEVICES: TableDefinition<&[u8; 32], &[u8]> = TableDefinition::new("DEVICES");
/// Secondary index: [status_byte(1)][device_id(32)] -> ().
const STATUS_INDEX: TableDefinition<&[u8], ()> = TableDefinition::new("STATUS_INDEX");
/// Metadata KV: string key -> string value.
const METADATA: TableDefinition<&str, &str> = TableDefinition::new("METADATA");
/// Executed operation ids -> the version they committed. Replay/dedup guard.
const PROCESSED_OPS: TableDefinition<&[u8; 32], u64> = TableDefinition::new("PROCESSED_OPS");

fn status_byte(status: DeviceStatus) -> u8 {
    match status {
        DeviceStatus::Active => 1,
        DeviceStatus::Revoked => 2,
    }
}

fn index_key(status: DeviceStatus, id: &DeviceId) -> Vec<u8> {
    [&[status_byte(status)][..], id.as_ref()].concat()
}

fn backend_err(e: impl core::fmt::Display) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// The redb-backed device registry and metadata store.
#[derive(Clone)]
pub struct RedbDeviceStore {
    db: Arc<Database>,
}

impl RedbDeviceStore {
    /// Opens (or creates) the database at `path`, ensuring all tables exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(backend_err)?;
        {
            let w = db.begin_write().map_err(backend_err)?;
            {
                w.open_table(DEVICES).map_err(backend_err)?;
                w.open_table(STATUS_INDEX).map_err(backend_err)?;
                w.open_table(METADATA).map_err(backend_err)?;
                w.open_table(PROCESSED_OPS).map_err(backend_err)?;
            }
            w.commit().map_err(backend_err)?;
        }
        Ok(Self { db: Arc::new(db) })
    }

    fn read_txn(&self) -> Result<ReadTransaction<'_>, StorageError> {
        self.db.begin_read().map_err(backend_err)
    }

    fn write_txn(&self) -> Result<WriteTransaction<'_>, StorageError> {
        self.db.begin_write().map_err(backend_err)
    }

    fn upsert_in_txn(w: &WriteTransaction, record: &DeviceRecord) -> Result<(), StorageError> {
        let key = &record.device_id.0;
        let mut devices = w.open_table(DEVICES).map_err(backend_err)?;
        let mut index = w.open_table(STATUS_INDEX).map_err(backend_err)?;

        // Drop a stale index entry if the status moved.
        let prior_status = devices
            .get(key)
            .map_err(backend_err)?
            .map(|v| codec::from_bytes_canonical::<DeviceRecord>(v.value()))
            .transpose()
            .map_err(|e| StorageError::Decode(e.to_string()))?
            .map(|r| r.status);
        if let Some(old) = prior_status {
            if old != record.status {
                index
                    .remove(index_key(old, &record.device_id).as_slice())
                    .map_err(backend_err)?;
            }
        }

        let encoded = codec::to_bytes_canonical(record);
        devices
            .insert(key, encoded.as_slice())
            .map_err(backend_err)?;
        index
            .insert(index_key(record.status, &record.device_id).as_slice(), ())
            .map_err(backend_err)?;
        Ok(())
    }

    /// Read-modify-write of one record in a single write transaction.
    /// `mutate` returns whether the record should be written back.
    async fn mutate_record(
        &self,
        id: &DeviceId,
        mutate: impl FnOnce(&mut DeviceRecord) -> bool,
    ) -> Result<bool, StorageError> {
        let w = self.write_txn()?;
        let written = {
            let mut devices = w.open_table(DEVICES).map_err(backend_err)?;
            let current = devices
                .get(&id.0)
                .map_err(backend_err)?
                .map(|v| codec::from_bytes_canonical::<DeviceRecord>(v.value()))
                .transpose()
                .map_err(|e| StorageError::Decode(e.to_string()))?;
            match current {
                Some(mut record) => {
                    if mutate(&mut record) {
                        let encoded = codec::to_bytes_canonical(&record);
                        devices
                            .insert(&id.0, encoded.as_slice())
                            .map_err(backend_err)?;
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };
        w.commit().map_err(backend_err)?;
        Ok(written)
    }
}

#[async_trait]
impl DeviceStore for RedbDeviceStore {
    async fn get(&self, id: &DeviceId) -> Result<Option<DeviceRecord>, StorageError> {
        let r = self.read_txn()?;
        let devices = r.open_table(DEVICES).map_err(backend_err)?;
        let result = devices
            .get(&id.0)
            .map_err(backend_err)?
            .map(|v| codec::from_bytes_canonical(v.value()))
            .transpose()
            .map_err(|e| StorageError::Decode(e.to_string()));
        result
    }

    async fn upsert(&self, record: &DeviceRecord) -> Result<(), StorageError> {
        let w = self.write_txn()?;
        Self::upsert_in_txn(&w, record)?;
        w.commit().map_err(backend_err)
    }

    async fn upsert_many(&self, records: &[DeviceRecord]) -> Result<(), StorageError> {
        let w = self.write_txn()?;
        for record in records {
            Self::upsert_in_txn(&w, record)?;
        }
        w.commit().map_err(backend_err)
    }

    async fn list_by_status(
        &self,
        status: DeviceStatus,
    ) -> Result<Vec<DeviceRecord>, StorageError> {
        let r = self.read_txn()?;
        let index = r.open_table(STATUS_INDEX).map_err(backend_err)?;
        let devices = r.open_table(DEVICES).map_err(backend_err)?;

        let prefix = [status_byte(status)];
        let ids: Vec<[u8; 32]> = index
            .range(&prefix[..]..)
            .map_err(backend_err)?
            .take_while(|entry| {
                entry
                    .as_ref()
                    .is_ok_and(|(k, _)| k.value().starts_with(&prefix))
            })
            .filter_map(|entry| {
                entry
                    .ok()
                    .and_then(|(k, _)| k.value().get(1..).and_then(|id| id.try_into().ok()))
            })
            .collect();

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(v) = devices.get(&id).map_err(backend_err)? {
                out.push(
                    codec::from_bytes_canonical(v.value())
                        .map_err(|e| StorageError::Decode(e.to_string()))?,
                );
            }
        }
        Ok(out)
    }

    async fn count_by_status(&self, status: DeviceStatus) -> Result<u64, StorageError> {
        let r = self.read_txn()?;
        let index = r.open_table(STATUS_INDEX).map_err(backend_err)?;
        let prefix = [status_byte(status)];
        let count = index
            .range(&prefix[..]..)
            .map_err(backend_err)?
            .take_while(|entry| {
                entry
                    .as_ref()
                    .is_ok_and(|(k, _)| k.value().starts_with(&prefix))
            })
            .count();
        Ok(count as u64)
    }

    async fn set_challenge(
        &self,
        id: &DeviceId,
        challenge: Option<AuthChallenge>,
    ) -> Result<bool, StorageError> {
        self.mutate_record(id, move |record| {
            record.challenge = challenge;
            true
        })
        .await
    }

    async fn refresh_witness(
        &self,
        id: &DeviceId,
        witness: &[u8],
    ) -> Result<bool, StorageError> {
        let witness = witness.to_vec();
        self.mutate_record(id, move |record| {
            if record.status != DeviceStatus::Active {
                return false;
            }
            record.witness = witness;
            true
        })
        .await
    }

    async fn record_operation(
        &self,
        operation_id: &[u8; 32],
        version: u64,
    ) -> Result<bool, StorageError> {
        let w = self.write_txn()?;
        let fresh = {
            let mut ops = w.open_table(PROCESSED_OPS).map_err(backend_err)?;
            if ops.get(operation_id).map_err(backend_err)?.is_some() {
                false
            } else {
                ops.insert(operation_id, version).map_err(backend_err)?;
                true
            }
        };
        w.commit().map_err(backend_err)?;
        Ok(fresh)
    }
}

#[async_trait]
impl MetadataStore for RedbDeviceStore {
    async fn get_meta(&self, key: &str) -> Result<Option<String>, StorageError> {
        let r = self.read_txn()?;
        let meta = r.open_table(METADATA).map_err(backend_err)?;
        let result = Ok(meta
            .get(key)
            .map_err(backend_err)?
            .map(|v| v.value().to_string()));
        result
    }

    async fn put_meta(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let w = self.write_txn()?;
        {
            let mut meta = w.open_table(METADATA).map_err(backend_err)?;
            meta.insert(key, value).map_err(backend_err)?;
        }
        w.commit().map_err(backend_err)
    }
}
