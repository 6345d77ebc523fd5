// Path: crates/types/src/keys/mod.rs
//! Defines constants for well-known metadata keys.
//!
//! These constants provide a single source of truth for the keys used to
//! store gateway-critical values in the metadata KV store. Using these
//! constants prevents typos and keeps the startup loader and the ingestion
//! loop pointed at the same entries.

/// The latest committed accumulator root, hex-encoded (256 bytes).
pub const META_ROOT_HEX: &str = "accumulator::root";

/// The previously committed root, hex-encoded. Retained for exactly one
/// generation to support stale-witness detection during authentication.
pub const META_PREV_ROOT_HEX: &str = "accumulator::root::previous";

/// The committed mutation counter, decimal text.
pub const META_VERSION: &str = "accumulator::version";

/// The RSA modulus `N`, hex-encoded.
pub const META_MODULUS_HEX: &str = "params::modulus";

/// The accumulator generator `g`, hex-encoded.
pub const META_GENERATOR_HEX: &str = "params::generator";

/// The Carmichael trapdoor, hex-encoded.
///
/// Written only when the node runs with `REVID_DEV_PERSIST_TRAPDOOR=1`;
/// production deployments keep the trapdoor out of persistence entirely.
pub const META_TRAPDOOR_HEX: &str = "params::trapdoor";

/// The highest block the event-ingestion loop has fully processed.
pub const META_LAST_PROCESSED_BLOCK: &str = "chain::last_processed_block";
