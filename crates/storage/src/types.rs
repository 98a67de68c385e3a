//! Common types used across ledger access operations.
//!
//! This module defines the shared data structures returned by
//! [`ChaincodeStub`](crate::ChaincodeStub) implementations and consumed by
//! the contract layer.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Request-scoped input fields that never reach the ledger.
///
/// Transient data travels with a proposal but is excluded from the
/// transaction's read-write set, so confidential fields can be written into a
/// private collection without appearing on the public chain.
pub type TransientMap = HashMap<String, Bytes>;

/// Key-value pair returned from range and rich queries.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use electronics_ledger_storage::KeyValue;
///
/// let kv = KeyValue::new("device:D1", Bytes::from(r#"{"deviceId":"D1"}"#));
/// assert_eq!(kv.key, "device:D1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key identifying this entry.
    pub key: String,

    /// The value stored at this key.
    pub value: Bytes,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: impl Into<String>, value: Bytes) -> Self {
        Self { key: key.into(), value }
    }
}

/// One entry of a key's change log.
///
/// Deletions are recorded with `is_delete == true` and an empty `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyModification {
    /// Transaction that produced this change.
    pub tx_id: TxId,

    /// Timestamp of the transaction proposal.
    pub timestamp: DateTime<Utc>,

    /// The value written, or empty for a deletion.
    pub value: Bytes,

    /// Whether this change removed the key.
    pub is_delete: bool,
}

/// Macro to define a newtype wrapper around `String` with standard trait
/// implementations.
///
/// Each generated type:
/// - Derives `Clone`, `Debug`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Derives `Serialize` and `Deserialize` (transparent)
/// - Implements `From<&str>` and `From<String>`
/// - Implements `Display` and `AsRef<str>`
macro_rules! define_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Returns the wrapped string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_name!(
    /// Membership service provider identifier of an organization.
    ///
    /// This is the unit of authorization: policies grant operations to
    /// organizations, never to individual users.
    ///
    /// # Examples
    ///
    /// ```
    /// use electronics_ledger_storage::MspId;
    ///
    /// let org = MspId::from("Org1MSP");
    /// assert_eq!(org.to_string(), "Org1MSP");
    /// ```
    MspId
);

define_name!(
    /// Transaction identifier assigned when a proposal is created.
    ///
    /// # Examples
    ///
    /// ```
    /// use electronics_ledger_storage::TxId;
    ///
    /// let tx = TxId::from("8f1c");
    /// assert_eq!(tx.as_str(), "8f1c");
    /// ```
    TxId
);
