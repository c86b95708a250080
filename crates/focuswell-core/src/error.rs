//! Core error types for focuswell-core.
//!
//! Every failure in the engine is locally recoverable: requests are either
//! rejected with a [`ValidationError`] (and nothing is mutated), or a corrupt
//! persisted record is discarded and replaced with a default. Storage and
//! configuration errors only surface from the explicit open/save paths.

use std::path::PathBuf;
use thiserror::Error;

use crate::debt::RiskLevel;

/// Core error type for focuswell-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Request rejected before any state was touched
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Key/value store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Typed rejections. Returning one of these guarantees no state changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("duration {requested} min is below the minimum of {minimum} min")]
    DurationTooShort { requested: u32, minimum: u32 },

    #[error("duration {requested} min exceeds the maximum of {maximum} min")]
    DurationTooLong { requested: u32, maximum: u32 },

    #[error(
        "duration {requested} min exceeds the conservative mode limit of {max_allowed} min \
         ({risk} risk, total debt {total_debt})"
    )]
    ConservativeLimit {
        requested: u32,
        max_allowed: u32,
        total_debt: u32,
        risk: RiskLevel,
    },

    #[error("block category label must not be empty")]
    EmptyCategoryLabel,

    #[error("protocol interval for '{category}' must be at least 1 minute")]
    InvalidInterval { category: String },

    #[error("no protocols scheduled: enable at least one protocol type")]
    EmptyProtocolSchedule,

    #[error("break of {minutes} min is below the minimum of {minimum} min")]
    BreakTooShort { minutes: u32, minimum: u32 },

    #[error("unknown protocol id {0}")]
    UnknownProtocol(u32),

    #[error("protocol {0} has not been triggered yet")]
    ProtocolNotTriggered(u32),

    #[error("unknown block id {0}")]
    UnknownBlock(String),

    #[error("block {0} is already completed")]
    BlockAlreadyCompleted(String),

    #[error("block {0} has a session in progress")]
    BlockInProgress(String),

    #[error("no active block")]
    NoActiveBlock,
}

/// Key/value store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Could not determine or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StorageError::Locked
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
