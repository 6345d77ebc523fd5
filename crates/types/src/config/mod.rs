// Path: crates/types/src/config/mod.rs

//! Shared configuration structures for the REVID node.
//!
//! Configuration is environment-driven: `NodeConfig::from_env` reads the
//! `REVID_*` variables, applies the documented defaults, and validates the
//! hex-encoded RSA parameters syntactically (the crypto crate validates them
//! semantically at startup).

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::ConfigError;

/// Which chain backend the node speaks to.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChainMode {
    /// The HTTP bridge fronting the deployed contract and multi-sig wallet.
    Bridge,
    /// An in-process contract instance (local development and tests).
    InProcess,
}

/// The RSA accumulator parameters, as loaded from the environment.
///
/// The trapdoor is carried separately from the public parameters so callers
/// can drop it from memory independently; it never appears in `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
pub struct RsaParamsConfig {
    /// The 2048-bit composite modulus `N`, hex.
    pub modulus_hex: String,
    /// The generator `g` (conventionally 2 or 4), hex.
    pub generator_hex: String,
    /// The Carmichael totient of `N`, hex. The trapdoor.
    pub trapdoor_hex: String,
}

impl core::fmt::Debug for RsaParamsConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RsaParamsConfig")
            .field("modulus_hex", &self.modulus_hex)
            .field("generator_hex", &self.generator_hex)
            .field("trapdoor_hex", &"<redacted>")
            .finish()
    }
}

/// Connection settings for the commitment chain.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainConfig {
    /// Backend selection.
    pub mode: ChainMode,
    /// Base URL of the chain bridge (required in `Bridge` mode).
    pub rpc_url: String,
    /// The deployed commitment contract address, hex (20 bytes).
    pub contract_address: String,
    /// The multi-sig authority address, hex (20 bytes).
    pub multisig_address: String,
    /// How often the event-ingestion loop polls, in milliseconds.
    #[serde(default = "default_event_poll_interval_ms")]
    pub event_poll_interval_ms: u64,
    /// Only blocks at least this far behind the tip are ingested.
    #[serde(default = "default_confirmation_depth")]
    pub confirmation_depth: u64,
    /// Per-RPC deadline in milliseconds.
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
}

fn default_event_poll_interval_ms() -> u64 {
    2_000
}
fn default_confirmation_depth() -> u64 {
    3
}
fn default_rpc_timeout_ms() -> u64 {
    10_000
}

/// Authentication-handshake settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// Seconds an issued challenge nonce stays valid.
    #[serde(default = "default_nonce_ttl_seconds")]
    pub nonce_ttl_seconds: u64,
}

fn default_nonce_ttl_seconds() -> u64 {
    300
}

/// Advisory sliding-window rate limits applied at the external surface.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests allowed per source address per minute.
    #[serde(default = "default_ip_per_minute")]
    pub ip_per_minute: u32,
    /// Authentication attempts allowed per device per five minutes.
    #[serde(default = "default_device_per_5_minutes")]
    pub device_per_5_minutes: u32,
}

fn default_ip_per_minute() -> u32 {
    20
}
fn default_device_per_5_minutes() -> u32 {
    5
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip_per_minute: default_ip_per_minute(),
            device_per_5_minutes: default_device_per_5_minutes(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// The socket address the HTTP surface binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Maximum accepted request body, in kilobytes.
    #[serde(default = "default_body_limit_kb")]
    pub body_limit_kb: usize,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_body_limit_kb() -> usize {
    64
}

/// The complete node configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NodeConfig {
    /// RSA accumulator parameters.
    pub params: RsaParamsConfig,
    /// Chain backend settings.
    pub chain: ChainConfig,
    /// Challenge-nonce settings.
    pub auth: AuthConfig,
    /// External-surface rate limits.
    pub limits: RateLimitConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Path to the redb database file.
    pub db_path: String,
    /// Shared admin secret expected in the `x-admin-secret` header.
    pub admin_secret: String,
    /// Dev-mode only: allow the trapdoor to be mirrored into metadata.
    pub dev_persist_trapdoor: bool,
}

fn require(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse<T: core::str::FromStr>(name: &str, raw: String) -> Result<T, ConfigError>
where
    T::Err: core::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidVar {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn check_hex(name: &str, value: &str) -> Result<(), ConfigError> {
    crate::codec::decode_hex_loose(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidVar {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

impl NodeConfig {
    /// Loads the configuration from `REVID_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let modulus_hex = require("REVID_MODULUS_HEX")?;
        check_hex("REVID_MODULUS_HEX", &modulus_hex)?;
        let generator_hex = require("REVID_GENERATOR_HEX")?;
        check_hex("REVID_GENERATOR_HEX", &generator_hex)?;

        // The trapdoor may come inline or from a secret file; the file form
        // keeps it out of process listings.
        let trapdoor_hex = match env::var("REVID_TRAPDOOR_HEX") {
            Ok(v) => v,
            Err(_) => {
                let path = require("REVID_TRAPDOOR_FILE")?;
                std::fs::read_to_string(&path)
                    .map(|s| s.trim().to_string())
                    .map_err(|e| ConfigError::InvalidVar {
                        name: "REVID_TRAPDOOR_FILE".to_string(),
                        reason: e.to_string(),
                    })?
            }
        };
        check_hex("REVID_TRAPDOOR_HEX", &trapdoor_hex)?;

        let mode = match optional("REVID_CHAIN_MODE", "bridge").to_ascii_lowercase().as_str() {
            "bridge" => ChainMode::Bridge,
            "inprocess" | "in-process" => ChainMode::InProcess,
            other => {
                return Err(ConfigError::InvalidVar {
                    name: "REVID_CHAIN_MODE".to_string(),
                    reason: format!("unknown mode '{other}'"),
                })
            }
        };
        let rpc_url = if mode == ChainMode::Bridge {
            require("REVID_CHAIN_RPC_URL")?
        } else {
            optional("REVID_CHAIN_RPC_URL", "")
        };

        Ok(Self {
            params: RsaParamsConfig {
                modulus_hex,
                generator_hex,
                trapdoor_hex,
            },
            chain: ChainConfig {
                mode,
                rpc_url,
                contract_address: optional("REVID_CONTRACT_ADDRESS", ""),
                multisig_address: optional("REVID_MULTISIG_ADDRESS", ""),
                event_poll_interval_ms: parse(
                    "REVID_EVENT_POLL_INTERVAL_MS",
                    optional("REVID_EVENT_POLL_INTERVAL_MS", "2000"),
                )?,
                confirmation_depth: parse(
                    "REVID_CONFIRMATION_DEPTH",
                    optional("REVID_CONFIRMATION_DEPTH", "3"),
                )?,
                rpc_timeout_ms: parse(
                    "REVID_RPC_TIMEOUT_MS",
                    optional("REVID_RPC_TIMEOUT_MS", "10000"),
                )?,
            },
            auth: AuthConfig {
                nonce_ttl_seconds: parse(
                    "REVID_NONCE_TTL_SECONDS",
                    optional("REVID_NONCE_TTL_SECONDS", "300"),
                )?,
            },
            limits: RateLimitConfig {
                ip_per_minute: parse(
                    "REVID_IP_RATE_LIMIT_PER_MINUTE",
                    optional("REVID_IP_RATE_LIMIT_PER_MINUTE", "20"),
                )?,
                device_per_5_minutes: parse(
                    "REVID_DEVICE_RATE_LIMIT_PER_5_MINUTES",
                    optional("REVID_DEVICE_RATE_LIMIT_PER_5_MINUTES", "5"),
                )?,
            },
            server: ServerConfig {
                listen_addr: optional("REVID_LISTEN_ADDR", &default_listen_addr()),
                body_limit_kb: parse(
                    "REVID_BODY_LIMIT_KB",
                    optional("REVID_BODY_LIMIT_KB", "64"),
                )?,
            },
            db_path: optional("REVID_DB_PATH", "./revid-data/registry.redb"),
            admin_secret: require("REVID_ADMIN_SECRET")?,
            dev_persist_trapdoor: optional("REVID_DEV_PERSIST_TRAPDOOR", "0") == "1",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsa_params_debug_redacts_trapdoor() {
        let params = RsaParamsConfig {
            modulus_hex: "d1".to_string(),
            generator_hex: "04".to_string(),
            trapdoor_hex: "5a".to_string(),
        };
        let rendered = format!("{:?}", params);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("5a"));
    }
}
