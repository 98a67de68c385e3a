//! Contract error types and result alias.
//!
//! Every contract operation returns [`ContractResult<T>`]. Failures are
//! classified by [`ContractError::kind`] so callers at the dispatch boundary
//! can map them to status codes without matching on messages.
//!
//! # Error Types
//!
//! - [`ContractError::Authorization`] - Caller's organization may not perform the operation
//! - [`ContractError::NotFound`] - Referenced record does not exist
//! - [`ContractError::AlreadyExists`] - Duplicate creation
//! - [`ContractError::Validation`] - Malformed or missing input
//! - [`ContractError::MissingTransientField`] - A required transient order field is absent
//! - [`ContractError::Deserialization`] - Stored bytes do not match the expected record
//! - [`ContractError::LedgerIo`] - The ledger call itself failed
//! - [`ContractError::UnknownFunction`] - No such contract or function

use std::{fmt, sync::Arc};

use electronics_ledger_storage::{BoxError, MspId, StorageError};
use thiserror::Error;

use crate::policy::Operation;

/// Result type alias for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;

/// Coarse classification of a [`ContractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller's organization not permitted.
    Authorization,
    /// Referenced key absent.
    NotFound,
    /// Duplicate creation.
    AlreadyExists,
    /// Required input missing or malformed.
    Validation,
    /// Stored bytes do not match the expected schema.
    Deserialization,
    /// Underlying ledger call failed.
    LedgerIo,
    /// Contract or function name not recognized.
    UnknownFunction,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorization => write!(f, "authorization"),
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::Validation => write!(f, "validation"),
            Self::Deserialization => write!(f, "deserialization"),
            Self::LedgerIo => write!(f, "ledger_io"),
            Self::UnknownFunction => write!(f, "unknown_function"),
        }
    }
}

/// Errors returned by contract operations.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases without a
/// semver-breaking change. Match on [`kind`](Self::kind) where possible.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContractError {
    /// The caller's organization is not in the policy for this operation.
    #[error("organization {msp_id} is not permitted to {operation}")]
    Authorization {
        /// Caller's organization.
        msp_id: MspId,
        /// The refused operation.
        operation: Operation,
    },

    /// The referenced record does not exist.
    #[error("the {entity} {id} does not exist")]
    NotFound {
        /// Kind of record looked up.
        entity: &'static str,
        /// Identifier that was not found.
        id: String,
    },

    /// A record with this identifier already exists.
    #[error("the {entity} {id} already exists")]
    AlreadyExists {
        /// Kind of record.
        entity: &'static str,
        /// Duplicate identifier.
        id: String,
    },

    /// Input failed validation.
    #[error("{message}")]
    Validation {
        /// Which input was rejected and why.
        message: String,
    },

    /// A required transient order field was not supplied.
    ///
    /// `field` is the first missing field in the order brand, deviceType,
    /// color, dealerName; `missing` lists every absent field in that order.
    #[error("the {field} was not specified in transient data")]
    MissingTransientField {
        /// First missing field.
        field: &'static str,
        /// All missing fields.
        missing: Vec<&'static str>,
    },

    /// Stored bytes could not be decoded as the expected record.
    #[error("could not decode {key} as {entity}: {message}")]
    Deserialization {
        /// Record type expected at the key.
        entity: &'static str,
        /// Ledger key holding the bytes.
        key: String,
        /// What went wrong.
        message: String,
        /// The underlying decode error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The ledger rejected or failed a call.
    #[error("ledger access failed: {0}")]
    LedgerIo(#[from] StorageError),

    /// No contract or function with this name.
    #[error("unknown function {contract}:{function}")]
    UnknownFunction {
        /// Contract name as given.
        contract: String,
        /// Function name as given.
        function: String,
    },
}

impl ContractError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists { entity, id: id.into() }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Creates a new `Deserialization` error without a source.
    #[must_use]
    pub fn deserialization(
        entity: &'static str,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Deserialization { entity, key: key.into(), message: message.into(), source: None }
    }

    /// Creates a new `Deserialization` error wrapping a decode failure.
    #[must_use]
    pub fn deserialization_with_source(
        entity: &'static str,
        key: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Deserialization {
            entity,
            key: key.into(),
            message: source.to_string(),
            source: Some(Arc::new(source)),
        }
    }

    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::Validation { .. } | Self::MissingTransientField { .. } => ErrorKind::Validation,
            Self::Deserialization { .. } => ErrorKind::Deserialization,
            Self::LedgerIo(_) => ErrorKind::LedgerIo,
            Self::UnknownFunction { .. } => ErrorKind::UnknownFunction,
        }
    }
}
