// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # REVID Types
//!
//! This crate is the foundational library for the REVID device-identity
//! gateway, containing all core data structures, error types, and
//! configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `revid-types` has minimal dependencies and is itself a
//! dependency for almost every other crate in the workspace. This structure
//! prevents circular dependencies and provides a stable, canonical
//! definition for shared types like `DeviceId`, `DeviceRecord`,
//! `CommitmentState`, and the error enums of the gateway's taxonomy.

/// The fixed width, in bytes, of an accumulator element on the wire and in
/// contract storage (2048-bit modulus, big-endian).
pub const ACCUMULATOR_BYTES: usize = 256;

/// The width of a device identifier in bytes.
pub const DEVICE_ID_BYTES: usize = 32;

/// The width of an authentication challenge nonce in bytes.
pub const NONCE_BYTES: usize = 16;

/// The maximum number of devices accepted in a single batch mutation.
pub const MAX_BATCH_DEVICES: usize = 50;

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::GatewayError> = std::result::Result<T, E>;

/// Core application-level data structures: devices, commitments, operations.
pub mod app;
/// The canonical, deterministic binary codec plus hex helpers for the wire.
pub mod codec;
/// Shared configuration structures, loaded from the environment.
pub mod config;
/// The unified error taxonomy used across the workspace.
pub mod error;
/// Constants for well-known metadata keys used by the persistence layer.
pub mod keys;
