//! Error types for blog meta sync operations

use crate::TenantId;
use thiserror::Error;

/// Overlay and option storage errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Overlay read failed for tenant {tenant} key {key}: {reason}")]
    ReadFailed {
        tenant: TenantId,
        key: String,
        reason: String,
    },

    #[error("Overlay write failed for tenant {tenant} key {key}: {reason}")]
    WriteFailed {
        tenant: TenantId,
        key: String,
        reason: String,
    },

    #[error("Option snapshot unavailable for tenant {tenant}: {reason}")]
    SnapshotFailed { tenant: TenantId, reason: String },

    #[error("Tenant listing failed: {reason}")]
    ListingFailed { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Tenant context switching errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("Failed to switch to tenant {tenant}: {reason}")]
    SwitchFailed { tenant: TenantId, reason: String },

    #[error("Unknown tenant {tenant}")]
    UnknownTenant { tenant: TenantId },
}

/// Payload serialization errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Failed to encode value for {key}: {reason}")]
    Encode { key: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Master error type for all blog meta sync errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetaError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for blog meta sync operations.
pub type MetaResult<T> = Result<T, MetaError>;

// =============================================================================
// TESTS
// =============================================================================
