//! Error types for the native ledger

use thiserror::Error;

/// Every failure an invocation, the genesis assembler or the storage layer
/// can surface. An `Err` aborts the current invocation; the executor is
/// expected to discard the transaction overlay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Irregular data: {0}")]
    DataIrregularity(String),
    #[error("Insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: u64, required: u64 },
    #[error("Insufficient allowance: have {allowance}, need {required}")]
    InsufficientAllowance { allowance: u64, required: u64 },
    #[error("Authentication failed for {0}")]
    Unauthorized(String),
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
    #[error("Wrong config, overflow detected: {0}")]
    ConfigOverflow(String),
    #[error("Init has been completed for contract {0}")]
    AlreadyInitialized(String),
    #[error("Wrong config, total supply {actual} != {expected}")]
    SupplyMismatch { actual: u64, expected: u64 },
    #[error("Wrong timestamp: end offset {end} < start offset {start}")]
    InvalidTimeOrdering { start: u32, end: u32 },
    #[error("Book-keeper address derivation failed: {0}")]
    BookKeeperDerivation(String),
    #[error("Amount {value} over total supply {cap}")]
    ValueTooLarge { value: u64, cap: u64 },
    #[error("Unknown native contract: {0}")]
    UnknownContract(String),
    #[error("Unknown method {method} on contract {contract}")]
    UnknownMethod { contract: String, method: String },
    #[error("Corrupt storage record: {0}")]
    CorruptRecord(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::DatabaseError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::DatabaseError(format!("bincode: {}", err))
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

impl From<secp256k1::Error> for ChainError {
    fn from(err: secp256k1::Error) -> Self {
        ChainError::CryptoError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
