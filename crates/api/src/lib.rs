// Path: crates/api/src/lib.rs
#![forbid(unsafe_code)]

//! # REVID API
//!
//! Core traits for the REVID gateway. The gateway's orchestration logic is
//! written against these seams; the concrete crypto backend, the redb
//! registry, and the two chain backends all plug in behind them.

/// The chain-client seam: submission, event tailing, confirmed-state reads.
pub mod chain;
/// The key/signature object model the signing backends implement.
pub mod crypto;
/// The persistence seams: device registry and metadata KV.
pub mod storage;
