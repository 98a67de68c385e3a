//! Shared test utilities for ledger access testing.
//!
//! This module provides helpers for creating test ledgers, generating keys,
//! building transient maps, and asserting on [`StorageResult`] values. It is
//! feature-gated behind `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! electronics-ledger-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use electronics_ledger_storage::testutil::{make_key, populated_ledger, transient};
//! ```

use std::collections::BTreeSet;

use bytes::Bytes;

use crate::{
    ChaincodeStub,
    collection::CollectionConfig,
    conformance::{LedgerHarness, MEMBER_ORG, PRIVATE_COLLECTION},
    error::{StorageError, StorageResult},
    identity::StaticIdentity,
    memory::{MemoryLedger, MemoryTransaction},
    types::{MspId, TransientMap},
};

/// Create a deterministic test key from a prefix and index.
///
/// Produces keys like `"prefix:000042"`. The zero-padding ensures
/// lexicographic ordering matches numeric ordering, which is important for
/// range query tests.
#[must_use]
pub fn make_key(prefix: &str, idx: usize) -> String {
    format!("{prefix}:{idx:06}")
}

/// Build a transient map from string pairs.
#[must_use]
pub fn transient(pairs: &[(&str, &str)]) -> TransientMap {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), Bytes::copy_from_slice(value.as_bytes())))
        .collect()
}

/// Build a collection definition from a name and member organization ids.
///
/// # Panics
///
/// Panics if `name` or `members` is empty.
#[must_use]
pub fn collection(name: &str, members: &[&str]) -> CollectionConfig {
    CollectionConfig::builder()
        .name(name)
        .member_orgs(members.iter().map(|m| MspId::from(*m)).collect::<BTreeSet<_>>())
        .build()
        .expect("valid collection config")
}

/// Create a [`MemoryLedger`] pre-populated with `count` keys.
///
/// Keys are formatted as `"{prefix}:{idx:06}"` and values are the key's
/// bytes. All writes land in one committed transaction.
///
/// # Panics
///
/// Panics if any write or the commit fails (should not happen with
/// `MemoryLedger`).
pub async fn populated_ledger(prefix: &str, count: usize) -> MemoryLedger {
    let ledger = MemoryLedger::new();
    let tx = ledger.begin(StaticIdentity::new(MEMBER_ORG));
    for i in 0..count {
        let key = make_key(prefix, i);
        tx.put_state(&key, key.clone().into_bytes()).await.expect("populate put failed");
    }
    tx.commit().expect("populate commit failed");
    ledger
}

/// A [`MemoryLedger`] set up to satisfy the conformance suite's
/// [`LedgerHarness`] requirements.
#[must_use]
pub fn conformance_ledger() -> MemoryLedger {
    MemoryLedger::new().with_collection(collection(PRIVATE_COLLECTION, &[MEMBER_ORG, "Org2MSP"]))
}

impl LedgerHarness for MemoryLedger {
    type Tx = MemoryTransaction;

    fn begin(&self, msp_id: &str) -> Self::Tx {
        MemoryLedger::begin(self, StaticIdentity::new(msp_id))
    }

    fn commit(&self, tx: Self::Tx) -> StorageResult<()> {
        tx.commit()
    }
}

/// Assert that a [`StorageResult`] is an error of the given
/// [`StorageError`] variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use electronics_ledger_storage::{StorageError, StorageResult, assert_storage_error};
///
/// let result: StorageResult<()> = Err(StorageError::conflict("stale read"));
/// assert_storage_error!(result, Conflict);
/// ```
#[macro_export]
macro_rules! assert_storage_error {
    ($result:expr, $variant:ident) => {
        match $result {
            Err($crate::error::StorageError::$variant { .. }) => {},
            other => panic!(
                "expected StorageError::{}, got: {:?}",
                stringify!($variant),
                other,
            ),
        }
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        match $result {
            Err($crate::error::StorageError::$variant { .. }) => {},
            other => panic!(
                "{}: expected StorageError::{}, got: {:?}",
                $msg,
                stringify!($variant),
                other,
            ),
        }
    };
}

/// Assert that a [`StorageResult`] is a [`StorageError::Conflict`].
#[macro_export]
macro_rules! assert_conflict {
    ($result:expr) => {
        $crate::assert_storage_error!($result, Conflict)
    };
}

/// Assert that a [`StorageResult`] is a [`StorageError::NotFound`].
#[macro_export]
macro_rules! assert_not_found {
    ($result:expr) => {
        $crate::assert_storage_error!($result, NotFound)
    };
}

/// Assert that a [`StorageResult`] is `Ok`.
///
/// Returns the inner value on success, panics with a descriptive message
/// on failure.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use electronics_ledger_storage::{StorageResult, assert_storage_ok};
///
/// let result: StorageResult<i32> = Ok(42);
/// let value = assert_storage_ok!(result);
/// assert_eq!(value, 42);
/// ```
#[macro_export]
macro_rules! assert_storage_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StorageError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StorageError: {e:?}", $msg),
        }
    };
}

/// Helper to verify that a result is a `Conflict` error.
pub fn is_conflict<T>(result: &StorageResult<T>) -> bool {
    matches!(result, Err(StorageError::Conflict { .. }))
}

/// Helper to verify that a result is a `NotFound` error.
pub fn is_not_found<T>(result: &StorageResult<T>) -> bool {
    matches!(result, Err(StorageError::NotFound { .. }))
}
