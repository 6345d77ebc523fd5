// Path: crates/types/src/error/mod.rs
//! Core error types for the REVID gateway.
//!
//! Each domain owns its own `thiserror` enum; everything converges into
//! [`GatewayError`], whose [`GatewayError::kind`] classifies the failure into
//! the transport-independent taxonomy the external surface maps to HTTP
//! status codes.

use crate::app::DeviceId;
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// The transport-independent classification of a failure.
///
/// Every `GatewayError` maps onto exactly one kind; the HTTP layer maps each
/// kind onto a status code and never inspects variants directly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// Malformed hex, wrong length, unknown key type, negative integer.
    InvalidInput,
    /// Missing or invalid admin secret; caller is not the multi-sig.
    Unauthorized,
    /// A rate limiter denied the request.
    RateLimited,
    /// The referenced device is unknown.
    NotFound,
    /// Already enrolled / already revoked / duplicate operation id.
    Conflict,
    /// Stale parent hash, block delay not elapsed, device not active.
    Precondition,
    /// Invalid signature or membership proof, hash-to-prime exhausted.
    CryptoFailure,
    /// RPC timeout, reverted transaction, event-log gap.
    ChainFailure,
    /// Programmer error or broken invariant.
    Internal,
}

/// Errors from wire-format decoding (hex strings, fixed-width fields).
#[derive(Error, Debug)]
pub enum CodecError {
    /// The input was not valid hexadecimal.
    #[error("Invalid hex: {0}")]
    BadHex(String),
    /// A fixed-width field had the wrong length.
    #[error("Invalid length: expected {expected} bytes, got {got}")]
    BadLength {
        /// The required width in bytes.
        expected: usize,
        /// The width actually supplied.
        got: usize,
    },
    /// A canonical SCALE decode failed.
    #[error("Canonical decode failed: {0}")]
    Canonical(String),
}

impl ErrorCode for CodecError {
    fn code(&self) -> &'static str {
        match self {
            Self::BadHex(_) => "CODEC_BAD_HEX",
            Self::BadLength { .. } => "CODEC_BAD_LENGTH",
            Self::Canonical(_) => "CODEC_CANONICAL_DECODE",
        }
    }
}

/// Errors from the accumulator engine's pure-math operations.
#[derive(Error, Debug)]
pub enum AccumulatorError {
    /// An input was non-positive, out of range, or otherwise malformed.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// A removal was attempted for a prime not coprime to the trapdoor.
    #[error("Element is not coprime to the trapdoor; no modular inverse exists")]
    NotCoprime,
    /// Hash-to-prime exceeded its bounded search.
    #[error("Hash-to-prime exhausted after {attempts} candidates")]
    HashToPrimeExhausted {
        /// How many candidates were tested before giving up.
        attempts: u32,
    },
    /// A witness failed verification against the expected root.
    #[error("Witness does not verify against the accumulator")]
    WitnessMismatch,
}

impl ErrorCode for AccumulatorError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidParameter(_) => "ACC_INVALID_PARAMETER",
            Self::NotCoprime => "ACC_NOT_COPRIME",
            Self::HashToPrimeExhausted { .. } => "ACC_HASH_TO_PRIME_EXHAUSTED",
            Self::WitnessMismatch => "ACC_WITNESS_MISMATCH",
        }
    }
}

/// Errors from signature and key-handling operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The signature failed cryptographic verification.
    #[error("Signature verification failed")]
    VerificationFailed,
    /// The provided key material is malformed or invalid for the scheme.
    #[error("Invalid cryptographic key: {0}")]
    InvalidKey(String),
    /// The provided signature bytes are malformed for the scheme.
    #[error("Invalid signature format: {0}")]
    InvalidSignature(String),
    /// The key type is not supported by this gateway.
    #[error("Unsupported key type: {0}")]
    Unsupported(String),
    /// A generic failure in an underlying cryptographic library.
    #[error("Cryptographic operation failed: {0}")]
    OperationFailed(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::InvalidSignature(_) => "CRYPTO_INVALID_SIGNATURE",
            Self::Unsupported(_) => "CRYPTO_UNSUPPORTED",
            Self::OperationFailed(_) => "CRYPTO_OPERATION_FAILED",
        }
    }
}

/// Errors about the lifecycle state of a device record.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// No record exists for the device id.
    #[error("Device {0} not found")]
    NotFound(DeviceId),
    /// A record already exists for this public key.
    #[error("Device {0} is already enrolled")]
    AlreadyEnrolled(DeviceId),
    /// The device was revoked; the transition is terminal.
    #[error("Device {0} is already revoked")]
    AlreadyRevoked(DeviceId),
    /// The requested operation requires an active device.
    #[error("Device {0} is not active")]
    NotActive(DeviceId),
    /// Two distinct devices derived the same accumulator prime.
    #[error("Accumulator prime collision for device {0}")]
    PrimeCollision(DeviceId),
}

impl ErrorCode for DeviceError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "DEVICE_NOT_FOUND",
            Self::AlreadyEnrolled(_) => "DEVICE_ALREADY_ENROLLED",
            Self::AlreadyRevoked(_) => "DEVICE_ALREADY_REVOKED",
            Self::NotActive(_) => "DEVICE_NOT_ACTIVE",
            Self::PrimeCollision(_) => "DEVICE_PRIME_COLLISION",
        }
    }
}

/// Errors in the challenge-response authentication handshake.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No outstanding challenge exists for the device.
    #[error("No outstanding challenge for this device")]
    NoChallenge,
    /// The outstanding challenge has expired.
    #[error("Challenge has expired")]
    ChallengeExpired,
    /// The submitted nonce does not match the outstanding challenge.
    #[error("Nonce does not match the outstanding challenge")]
    NonceMismatch,
    /// The submitted prime does not match the device's assigned prime.
    #[error("Submitted prime does not match the enrolled prime")]
    PrimeMismatch,
}

impl ErrorCode for AuthError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoChallenge => "AUTH_NO_CHALLENGE",
            Self::ChallengeExpired => "AUTH_CHALLENGE_EXPIRED",
            Self::NonceMismatch => "AUTH_NONCE_MISMATCH",
            Self::PrimeMismatch => "AUTH_PRIME_MISMATCH",
        }
    }
}

/// Rejections from the commitment contract's guard chain.
#[derive(Error, Debug)]
pub enum ContractError {
    /// The contract is paused by the emergency admin.
    #[error("Contract is paused")]
    Paused,
    /// The caller is not the configured multi-sig authority.
    #[error("Caller is not the multi-sig authority")]
    NotAuthority,
    /// The multi-sig configuration violates the well-formedness bounds.
    #[error("Multi-sig authority is malformed: {0}")]
    MalformedAuthority(String),
    /// The minimum block delay between mutations has not elapsed.
    #[error("Block delay not elapsed: current block {current}, earliest allowed {earliest}")]
    BlockDelay {
        /// The block at which the mutation was attempted.
        current: u64,
        /// The first block at which a mutation is allowed.
        earliest: u64,
    },
    /// The supplied parent hash does not match the current root hash.
    #[error("Stale parent hash: expected {expected}, got {got}")]
    ParentHashMismatch {
        /// Hex of the contract's current root hash.
        expected: String,
        /// Hex of the parent hash the operation carried.
        got: String,
    },
    /// The operation id was already executed.
    #[error("Operation id already executed")]
    ReplayedOperation,
    /// The operation id is the zero hash.
    #[error("Operation id must be non-zero")]
    ZeroOperationId,
    /// The payload shape is invalid (lengths, batch size, duplicates).
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    /// Register requires a device the contract has never seen.
    #[error("Device is already registered")]
    DeviceAlreadyActive,
    /// Register rejects devices that were revoked (terminal state).
    #[error("Device was revoked and cannot be re-registered")]
    DeviceRevoked,
    /// Revoke requires an active device.
    #[error("Device is not active")]
    DeviceNotActive,
    /// Only the emergency admin may pause, unpause, or cancel.
    #[error("Caller is not the emergency admin")]
    NotEmergencyAdmin,
    /// A timelocked change was executed before its delay elapsed.
    #[error("Timelock has not elapsed: {remaining_secs}s remaining")]
    TimelockNotElapsed {
        /// Seconds until the change becomes executable.
        remaining_secs: u64,
    },
    /// The referenced queued change does not exist (or was cancelled).
    #[error("No such queued change")]
    UnknownQueuedChange,
}

impl ErrorCode for ContractError {
    fn code(&self) -> &'static str {
        match self {
            Self::Paused => "CONTRACT_PAUSED",
            Self::NotAuthority => "CONTRACT_NOT_AUTHORITY",
            Self::MalformedAuthority(_) => "CONTRACT_MALFORMED_AUTHORITY",
            Self::BlockDelay { .. } => "CONTRACT_BLOCK_DELAY",
            Self::ParentHashMismatch { .. } => "CONTRACT_PARENT_HASH_MISMATCH",
            Self::ReplayedOperation => "CONTRACT_REPLAYED_OPERATION",
            Self::ZeroOperationId => "CONTRACT_ZERO_OPERATION_ID",
            Self::InvalidPayload(_) => "CONTRACT_INVALID_PAYLOAD",
            Self::DeviceAlreadyActive => "CONTRACT_DEVICE_ALREADY_ACTIVE",
            Self::DeviceRevoked => "CONTRACT_DEVICE_REVOKED",
            Self::DeviceNotActive => "CONTRACT_DEVICE_NOT_ACTIVE",
            Self::NotEmergencyAdmin => "CONTRACT_NOT_EMERGENCY_ADMIN",
            Self::TimelockNotElapsed { .. } => "CONTRACT_TIMELOCK_NOT_ELAPSED",
            Self::UnknownQueuedChange => "CONTRACT_UNKNOWN_QUEUED_CHANGE",
        }
    }
}

/// Errors from the chain client (submission and event tailing).
#[derive(Error, Debug)]
pub enum ChainClientError {
    /// A transport-level RPC failure, after the retry budget was spent.
    #[error("RPC failed: {0}")]
    Rpc(String),
    /// The RPC deadline elapsed.
    #[error("RPC timed out: {0}")]
    Timeout(String),
    /// The transaction was included but reverted by the contract.
    #[error("Transaction reverted: {0}")]
    Reverted(String),
    /// Observed event versions are not contiguous.
    #[error("Event-log gap: expected version {expected}, got {got}")]
    EventGap {
        /// The version the gateway expected next.
        expected: u64,
        /// The version actually observed.
        got: u64,
    },
    /// A response payload could not be decoded.
    #[error("Malformed chain response: {0}")]
    Decode(String),
}

impl ErrorCode for ChainClientError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rpc(_) => "CHAIN_RPC_FAILED",
            Self::Timeout(_) => "CHAIN_RPC_TIMEOUT",
            Self::Reverted(_) => "CHAIN_TX_REVERTED",
            Self::EventGap { .. } => "CHAIN_EVENT_GAP",
            Self::Decode(_) => "CHAIN_DECODE_ERROR",
        }
    }
}

/// Errors from the persistence layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
    /// A stored value failed canonical decoding.
    #[error("Stored value decode error: {0}")]
    Decode(String),
    /// The requested key does not exist.
    #[error("Key not found in storage")]
    NotFound,
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "STORAGE_BACKEND_ERROR",
            Self::Decode(_) => "STORAGE_DECODE_ERROR",
            Self::NotFound => "STORAGE_KEY_NOT_FOUND",
        }
    }
}

/// Errors raised while loading configuration from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is absent.
    #[error("Missing required environment variable {0}")]
    MissingVar(String),
    /// An environment variable is present but unparseable.
    #[error("Invalid value for {name}: {reason}")]
    InvalidVar {
        /// The variable name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingVar(_) => "CONFIG_MISSING_VAR",
            Self::InvalidVar { .. } => "CONFIG_INVALID_VAR",
        }
    }
}

/// The top-level error type of the gateway pipeline.
///
/// Carries every domain error via `#[from]`, plus the two cross-cutting
/// variants the pipeline raises directly.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Wire-format decoding failed at the boundary.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The accumulator engine rejected an operation.
    #[error(transparent)]
    Accumulator(#[from] AccumulatorError),
    /// A signature or key operation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// A device-lifecycle precondition failed.
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// An authentication-handshake precondition failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The contract rejected the mutation.
    #[error(transparent)]
    Contract(#[from] ContractError),
    /// The chain client failed after its retry budget.
    #[error(transparent)]
    Chain(#[from] ChainClientError),
    /// The persistence layer failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A request failed validation before reaching any domain logic.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A broken invariant or programmer error. Logged with full context and
    /// surfaced generically.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Classifies this error into the transport-independent taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Codec(_) | Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Accumulator(e) => match e {
                AccumulatorError::InvalidParameter(_) => ErrorKind::InvalidInput,
                AccumulatorError::NotCoprime => ErrorKind::InvalidInput,
                AccumulatorError::HashToPrimeExhausted { .. }
                | AccumulatorError::WitnessMismatch => ErrorKind::CryptoFailure,
            },
            Self::Crypto(_) => ErrorKind::CryptoFailure,
            Self::Device(e) => match e {
                DeviceError::NotFound(_) => ErrorKind::NotFound,
                DeviceError::AlreadyEnrolled(_)
                | DeviceError::AlreadyRevoked(_)
                | DeviceError::PrimeCollision(_) => ErrorKind::Conflict,
                DeviceError::NotActive(_) => ErrorKind::Precondition,
            },
            Self::Auth(_) => ErrorKind::Precondition,
            Self::Contract(e) => match e {
                ContractError::NotAuthority | ContractError::NotEmergencyAdmin => {
                    ErrorKind::Unauthorized
                }
                ContractError::ReplayedOperation => ErrorKind::Conflict,
                ContractError::InvalidPayload(_) | ContractError::ZeroOperationId => {
                    ErrorKind::InvalidInput
                }
                ContractError::Paused
                | ContractError::BlockDelay { .. }
                | ContractError::ParentHashMismatch { .. }
                | ContractError::DeviceAlreadyActive
                | ContractError::DeviceRevoked
                | ContractError::DeviceNotActive
                | ContractError::TimelockNotElapsed { .. }
                | ContractError::UnknownQueuedChange => ErrorKind::Precondition,
                ContractError::MalformedAuthority(_) => ErrorKind::Internal,
            },
            Self::Chain(_) => ErrorKind::ChainFailure,
            Self::Storage(_) | Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl ErrorCode for GatewayError {
    fn code(&self) -> &'static str {
        match self {
            Self::Codec(e) => e.code(),
            Self::Accumulator(e) => e.code(),
            Self::Crypto(e) => e.code(),
            Self::Device(e) => e.code(),
            Self::Auth(e) => e.code(),
            Self::Contract(e) => e.code(),
            Self::Chain(e) => e.code(),
            Self::Storage(e) => e.code(),
            Self::Config(e) => e.code(),
            Self::InvalidInput(_) => "GATEWAY_INVALID_INPUT",
            Self::Internal(_) => "GATEWAY_INTERNAL",
        }
    }
}
