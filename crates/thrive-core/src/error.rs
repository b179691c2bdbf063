//! Core error types for thrive-core.
//!
//! Every fallible collaborator (stores, mail transport, configuration)
//! has its own thiserror enum; `CoreError` wraps them for callers that
//! only want one type to propagate.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for thrive-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Store-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Mail transport errors
    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No active email template with the given id
    #[error("No active email template '{0}'")]
    NoActiveTemplate(String),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors raised by user, content, template and delivery stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
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

    /// Referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Stored value could not be decoded
    #[error("Corrupt {field} value: {message}")]
    Corrupt { field: &'static str, message: String },

    /// Remote store unavailable (used by non-SQLite implementations)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Mail transport errors.
#[derive(Error, Debug)]
pub enum MailError {
    /// Provider answered with a non-2xx status
    #[error("Mail provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Request never reached the provider or the response was unreadable
    #[error("Mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider response did not carry a message id
    #[error("Mail provider response missing message id")]
    MissingId,

    /// Transport is not configured (no endpoint or API key)
    #[error("Mail transport not configured: {0}")]
    NotConfigured(String),

    /// Recipient address is empty or malformed
    #[error("Invalid recipient address: '{0}'")]
    InvalidRecipient(String),

    /// The task driving a send panicked or was cancelled
    #[error("Send task failed: {0}")]
    TaskFailed(String),
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Timezone name is not a known IANA zone
    #[error("Unknown timezone '{0}'")]
    UnknownTimezone(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
