//! # Error Types
//!
//! Structured error handling for query composition, execution and state persistence.

use thiserror::Error;

/// Errors surfaced by the query engine.
///
/// Validation and configuration problems are raised immediately and never
/// coerced. Storage failures propagate unchanged; the engine does not retry.
#[derive(Debug, Error)]
pub enum DbQueryError {
    /// Caller supplied a value the engine refuses to work with (short session id,
    /// unknown scope level, invalid identifier).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The query object was used in a way its configuration does not allow.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The storage collaborator failed to execute a statement.
    #[error("Execution error: {0}")]
    Execution(#[from] sqlx::Error),

    /// Stored state could not be serialized or read back.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl DbQueryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// True for errors caused by the caller rather than by storage.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Configuration(_))
    }
}

impl From<config::ConfigError> for DbQueryError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbQueryError>;
