//! Error types for pipeline operations
//!
//! Only wiring defects, backend faults and cancellation are errors.
//! Data-shape problems (missing record, bad key, zero affected rows) travel
//! inside the result types with `successful == false`.

use thiserror::Error;

/// Configuration errors: the pipeline was assembled incorrectly.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No entity map is defined from {persistence} to {domain}")]
    MissingMapper {
        domain: &'static str,
        persistence: &'static str,
    },

    #[error("Filters are defined for {record} but no filter handler is registered")]
    MissingFilterHandler { record: &'static str },

    #[error("Sorters are defined for {record} but no sort handler is registered")]
    MissingSortHandler { record: &'static str },

    #[error("No pipeline is registered with the broker for {record}")]
    UnregisteredRecord { record: &'static str },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Table for {record} has an unexpected row type")]
    TableTypeMismatch { record: &'static str },

    #[error("Cannot {operation} through a read-only session")]
    ReadOnlySession { operation: &'static str },

    #[error("Store backend failed: {reason}")]
    Backend { reason: String },
}

/// Key provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key provider for {key_type} cannot build a key from {value}")]
    InvalidKey { key_type: &'static str, value: String },
}

/// Master error type for all pipeline errors.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl PipelineError {
    /// True when the caller's cancellation signal stopped the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }

    /// True when the error points at a wiring defect rather than the data.
    pub fn is_configuration(&self) -> bool {
        matches!(self, PipelineError::Config(_))
    }
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

// =============================================================================
// TESTS
// =============================================================================
