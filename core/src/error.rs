//! Error types for the Airtable client.
//!
//! # Design
//! Every public operation fails with exactly one variant of `AirtableError`.
//! Local input problems (`InvalidTableName`, `InvalidRecordId`,
//! `UnknownParam`, `InvalidParam`) are raised before any request is built.
//! 404 and 429 map to `NotFound` and `RateLimited`; every other non-2xx
//! status maps to `Api`.

use std::fmt;

/// Why the transport failed to produce a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The per-request timeout elapsed.
    Timeout,
    /// DNS, connect, TLS or I/O failure before a response was read.
    ConnectionFailed,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timed out"),
            TransportErrorKind::ConnectionFailed => write!(f, "connection failed"),
        }
    }
}

/// Failure reported by a `Transport` implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::ConnectionFailed,
            message: message.into(),
        }
    }
}

/// Errors returned by `AirtableClient` and `BaseClient`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AirtableError {
    /// The table name is empty or contains a path separator.
    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),

    /// The record id is empty or contains a path separator.
    #[error("invalid record id: {0:?}")]
    InvalidRecordId(String),

    /// A query parameter key that the list endpoint does not recognize.
    #[error("unknown query parameter: {0}")]
    UnknownParam(String),

    /// A recognized parameter with an unusable value.
    #[error("invalid value for {name}: {reason}")]
    InvalidParam { name: String, reason: String },

    /// The server returned 404. `code` tells a missing table
    /// (`TABLE_NOT_FOUND`) from a missing record (`NOT_FOUND`).
    #[error("not found: {message}")]
    NotFound { code: Option<String>, message: String },

    /// The server returned 429. Back off before retrying.
    #[error("rate limited: {message}")]
    RateLimited { code: Option<String>, message: String },

    /// Any other non-2xx response.
    #[error("HTTP {status}{}: {message}", .code.as_deref().map(|c| format!(" {c}")).unwrap_or_default())]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A 2xx response whose body did not decode into the expected shape.
    #[error("malformed success response: {0}")]
    Conversion(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// No response was obtained.
    #[error("transport {kind}: {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// A 2xx delete response without `"deleted": true`.
    #[error("delete of {} was not confirmed", .id.as_deref().unwrap_or("<unknown record>"))]
    DeleteNotConfirmed { id: Option<String> },

    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AirtableError {
    /// HTTP status for errors that carry one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AirtableError::NotFound { .. } => Some(404),
            AirtableError::RateLimited { .. } => Some(429),
            AirtableError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Service error code (`error.type`) for errors that carry one.
    pub fn code(&self) -> Option<&str> {
        match self {
            AirtableError::NotFound { code, .. }
            | AirtableError::RateLimited { code, .. }
            | AirtableError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AirtableError::RateLimited { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AirtableError::Transport {
                kind: TransportErrorKind::Timeout,
                ..
            }
        )
    }
}

impl From<TransportError> for AirtableError {
    fn from(err: TransportError) -> Self {
        AirtableError::Transport {
            kind: err.kind,
            message: err.message,
        }
    }
}
