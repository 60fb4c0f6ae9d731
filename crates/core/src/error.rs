//! Unified error types for sqlkv.
//!
//! Codec failures have no variant here: they degrade to a missing
//! value inside the store and never reach a caller.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the store and its callers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid call arguments (wrong arity, non-string key, ...).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// `mset` received a dangling key without a value.
    #[error("INVALID_INPUT: mset expects key/value pairs, got {count} values")]
    MalformedPairs { count: usize },

    /// Namespace name is not usable as a table identifier.
    #[error("INVALID_NAMESPACE: {0}")]
    InvalidNamespace(String),

    /// Store configuration rejected before opening.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Namespace table or index could not be created.
    #[error("CACHE_ERROR: schema setup failed: {0}")]
    SchemaFailed(String),

    /// A tokio-rusqlite failure kind this crate does not know about.
    #[error("CACHE_ERROR: unrecognized database failure")]
    DatabaseOther,

    /// A spawned operation went away before delivering its result.
    #[error("CACHE_ERROR: operation dropped before completion")]
    Interrupted,
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::DatabaseOther,
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::MalformedPairs { .. } => (-32602, err.to_string()),
            Error::InvalidNamespace(msg) => (-32602, msg.clone()),
            Error::Config(e) => (-32602, e.to_string()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::SchemaFailed(msg) => (-32002, msg.clone()),
            Error::DatabaseOther | Error::Interrupted => (-32002, err.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
