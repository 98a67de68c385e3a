//! Storage error types and result alias.
//!
//! This module defines the errors a [`ChaincodeStub`](crate::ChaincodeStub)
//! implementation can surface. Every ledger adapter must map its internal
//! failures to these standardized variants so the contract layer can treat
//! them uniformly.
//!
//! # Error Types
//!
//! - [`StorageError::NotFound`] - Key or collection does not exist
//! - [`StorageError::Conflict`] - Read-set validation failed at commit time
//! - [`StorageError::AccessDenied`] - Caller is not a member of a private collection
//! - [`StorageError::InvalidQuery`] - Rich query is not a well-formed selector document
//! - [`StorageError::Connection`] - Network or connection-related failures
//! - [`StorageError::Serialization`] - Data encoding/decoding failures
//! - [`StorageError::Internal`] - Adapter-specific internal errors
//! - [`StorageError::Timeout`] - Operation exceeded time limit
//!
//! # Example
//!
//! ```
//! use electronics_ledger_storage::{StorageError, StorageResult};
//!
//! fn lookup(key: &str) -> StorageResult<Vec<u8>> {
//!     Err(StorageError::not_found(key))
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for ledger access operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while talking to the ledger.
///
/// Errors preserve their source chain via the `#[source]` attribute, enabling
/// debugging tools to display the full error context.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases without a
/// semver-breaking change. Downstream match expressions must include a
/// wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The requested key or collection does not exist.
    #[error("Key not found: {key}")]
    NotFound {
        /// The key that was not found.
        key: String,
    },

    /// Optimistic concurrency failure.
    ///
    /// A key recorded in the transaction's read set was modified by another
    /// transaction that committed first. The whole transaction is rejected.
    #[error("Transaction conflict: {message}")]
    Conflict {
        /// Which read failed validation.
        message: String,
    },

    /// The caller's organization may not access a private collection.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Description naming the collection and organization.
        message: String,
    },

    /// A rich query string is not a single well-formed query document.
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// Why the query was rejected.
        message: String,
        /// The underlying parse error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Connection or network error.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Serialization or deserialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// Internal ledger adapter error.
    ///
    /// This is a catch-all for adapter-specific errors that don't fit other
    /// categories.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Operation timed out.
    #[error("Operation timeout")]
    Timeout,
}

impl StorageError {
    /// Creates a new `NotFound` error for the given key.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied { message: message.into() }
    }

    /// Creates a new `InvalidQuery` error with the given message.
    #[must_use]
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery { message: message.into(), source: None }
    }

    /// Creates a new `InvalidQuery` error with a message and source error.
    #[must_use]
    pub fn invalid_query_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::InvalidQuery { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Returns `true` for failures that may succeed if the whole transaction
    /// is resubmitted by the caller.
    ///
    /// Nothing inside this workspace retries; the flag exists for the
    /// submission layer that sits above the dispatch boundary.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Connection { .. } | Self::Timeout)
    }
}

/// Configuration validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required string field was empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A field held a value that is not acceptable.
    #[error("invalid {field} {value:?}: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
