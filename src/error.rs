//! Error types for the store
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Store Error Enum ==
/// Unified error type shared by every backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No live record matched the key in the namespace
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid namespace name, malformed address or bad context value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Redis transport or command failure
    #[error("Redis {op} failed for {target}: {source}")]
    Redis {
        op: &'static str,
        target: String,
        #[source]
        source: redis::RedisError,
    },

    /// SQL transport or query failure
    #[error("SQL {op} failed for {target}: {source}")]
    Sql {
        op: &'static str,
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// Operation issued after close()
    #[error("Store closed: {0}")]
    Closed(&'static str),
}

impl StoreError {
    /// Wraps a Redis error with the operation and key it belongs to.
    pub fn redis(op: &'static str, target: impl Into<String>, source: redis::RedisError) -> Self {
        StoreError::Redis {
            op,
            target: target.into(),
            source,
        }
    }

    /// Wraps a SQL error with the operation and table or key it belongs to.
    pub fn sql(op: &'static str, target: impl Into<String>, source: sqlx::Error) -> Self {
        StoreError::Sql {
            op,
            target: target.into(),
            source,
        }
    }

    /// True for the not-found sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
