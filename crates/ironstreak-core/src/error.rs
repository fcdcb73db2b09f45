//! Core error types for ironstreak-core.
//!
//! Every operation of the engine returns a typed [`CoreError`]; callers never
//! see a partial or ambiguous success. [`CoreError::Duplicate`] is internal to
//! the check-in path and is converted into an idempotent success before it can
//! reach a caller.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::target::TargetStatus;

/// Core error type for ironstreak-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Bad input at target creation
    #[error("Invalid target: {0}")]
    InvalidTarget(#[from] ValidationError),

    /// Unknown target id
    #[error("Target not found: {target_id}")]
    NotFound { target_id: String },

    /// Target belongs to another actor
    #[error("Target {target_id} does not belong to {actor}")]
    Forbidden { target_id: String, actor: String },

    /// Check-in attempted on a finished target
    #[error("Target already finished ({status}): {target_id}")]
    TerminalState {
        target_id: String,
        status: TargetStatus,
    },

    /// Check-in attempted outside the target's date window
    #[error("{date} is outside the target window {start_date}..={end_date}")]
    OutOfRange {
        date: NaiveDate,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },

    /// A check-in for this day already exists
    #[error("Check-in already recorded for {target_id} on {date}")]
    Duplicate { target_id: String, date: NaiveDate },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

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

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be decoded
    #[error("Corrupt row in {table}: {message}")]
    Corrupt { table: &'static str, message: String },
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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Target creation validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Description is empty after trimming
    #[error("target_text must not be empty")]
    EmptyText,

    /// Description exceeds the configured limit
    #[error("target_text is {len} characters, limit is {max}")]
    TextTooLong { len: usize, max: usize },

    /// Duration outside the allowed window
    #[error("duration_in_days must be between 1 and {max}, got {value}")]
    DurationOutOfRange { value: i64, max: u32 },

    /// Start date could not be parsed
    #[error("start_date '{0}' is not a YYYY-MM-DD date")]
    UnparseableDate(String),

    /// Start date lies before the earliest accepted day
    #[error("start_date {start_date} is before {earliest}")]
    StartInPast {
        start_date: NaiveDate,
        earliest: NaiveDate,
    },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
