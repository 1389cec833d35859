//! Error types for the MemoRable client
//!
//! This module provides structured error definitions with thiserror, the
//! [`RemoteError`] payload wrapper for JSON-RPC `error` objects, and the
//! [`Outcome`] type used where "service is down" is an expected result
//! rather than a failure.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Main error type for MemoRable operations
#[derive(Error, Debug)]
pub enum MemorableError {
    /// HTTP request failed (connect, send, or body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded as JSON-RPC
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    /// Server answered with a JSON-RPC error object
    #[error("MCP error: {0}")]
    Remote(RemoteError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A remote payload could not be turned into a complete record
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] NormalizeError),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl MemorableError {
    /// True for failures that mean the service could not be reached at all
    pub fn is_unavailable(&self) -> bool {
        matches!(self, MemorableError::Http(_))
    }

    /// The remote error payload, if the server rejected the call
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            MemorableError::Remote(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for MemoRable operations
pub type Result<T> = std::result::Result<T, MemorableError>;

/// Convert anyhow::Error to MemorableError
impl From<anyhow::Error> for MemorableError {
    fn from(err: anyhow::Error) -> Self {
        MemorableError::Other(err.to_string())
    }
}

/// JSON-RPC error object exactly as the server sent it
///
/// The payload is kept verbatim so callers can log or inspect fields the
/// client does not know about. `code`, `message` and `data` are read lazily.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    payload: Value,
}

impl RemoteError {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// The original `error` value
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    pub fn code(&self) -> Option<i64> {
        self.payload.get("code").and_then(Value::as_i64)
    }

    pub fn message(&self) -> Option<&str> {
        self.payload.get("message").and_then(Value::as_str)
    }

    pub fn data(&self) -> Option<&Value> {
        self.payload.get("data")
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.payload)
    }
}

/// Why a loosely shaped payload could not become a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// Timestamp-bearing field present but not ISO-8601
    #[error("unparseable timestamp in '{field}': {value}")]
    Timestamp { field: &'static str, value: String },

    /// Payload was not a JSON object
    #[error("expected an object, got {0}")]
    NotAnObject(&'static str),
}

/// Result of an operation where an unreachable service is expected
///
/// Lets application code run in a degraded "no memory service" mode by
/// matching on a value instead of unwinding through errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    /// Service unreachable, or its reply was not usable MCP
    Unavailable,
    /// Service reachable but rejected the call
    RemoteError(RemoteError),
}

impl<T> Outcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    /// The value, if the call succeeded
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(MemorableError::Remote(err)) => Outcome::RemoteError(err),
            Err(_) => Outcome::Unavailable,
        }
    }
}
