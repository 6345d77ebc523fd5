// Path: crates/storage/src/lib.rs
#![forbid(unsafe_code)]

//! # REVID Storage
//!
//! Persistence for the gateway: the device registry and the metadata KV,
//! backed by `redb`. A hashmap-backed in-memory variant backs tests and
//! short-lived tooling.

mod memory;
mod redb_store;

pub use memory::MemoryDeviceStore;
pub use redb_store::RedbDeviceStore;
