//! Ledger access trait definition.
//!
//! This module defines the [`ChaincodeStub`] trait, the capability through
//! which contract code reads and writes the ledger on behalf of one
//! transaction proposal.
//!
//! # Design
//!
//! - **One stub per invocation**: a stub is bound to a single transaction and
//!   is never shared across invocations.
//! - **Buffered writes**: `put_*` and `del_*` calls are recorded in the
//!   transaction's write set and become visible to other transactions only
//!   when the platform commits it.
//! - **Snapshot queries**: range, rich and history queries observe committed
//!   state and are returned as [`ResultsIterator`] values.
//! - **Private collections**: confidential values live in named collections
//!   readable only by member organizations; every write publishes a SHA-256
//!   hash of the value to world state so existence can be checked by anyone.
//!
//! See [`MemoryTransaction`](crate::MemoryTransaction) for a reference
//! implementation.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{
    error::StorageResult,
    iterator::ResultsIterator,
    types::{KeyModification, KeyValue, TransientMap, TxId},
};

/// Ledger operations available to contract code during one transaction.
///
/// # Key Operations
///
/// | Method | Description |
/// |--------|-------------|
/// | [`get_state`](ChaincodeStub::get_state) | Read a world-state value |
/// | [`put_state`](ChaincodeStub::put_state) | Buffer a world-state write |
/// | [`del_state`](ChaincodeStub::del_state) | Buffer a world-state delete |
/// | [`get_state_by_range`](ChaincodeStub::get_state_by_range) | Iterate keys in `[start, end)` |
/// | [`get_query_result`](ChaincodeStub::get_query_result) | Run a rich query |
/// | [`get_history_for_key`](ChaincodeStub::get_history_for_key) | Iterate a key's change log |
/// | [`get_private_data`](ChaincodeStub::get_private_data) | Read a private value |
/// | [`get_private_data_hash`](ChaincodeStub::get_private_data_hash) | Read a private value's hash |
/// | [`get_transient`](ChaincodeStub::get_transient) | Proposal-scoped confidential input |
///
/// # Range bounds
///
/// An empty `start` or `end` means the range is unbounded on that side.
///
/// # Example
///
/// ```
/// use electronics_ledger_storage::{ChaincodeStub, MemoryLedger, StaticIdentity};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let ledger = MemoryLedger::new();
/// let tx = ledger.begin(StaticIdentity::new("Org1MSP"));
///
/// tx.put_state("device:D1", b"{}".to_vec()).await.unwrap();
/// assert!(tx.get_state("device:D1").await.unwrap().is_some());
/// tx.commit().unwrap();
/// # });
/// ```
#[async_trait]
pub trait ChaincodeStub: Send + Sync {
    /// Identifier of the transaction this stub is bound to.
    fn tx_id(&self) -> &TxId;

    /// Timestamp the client put on the proposal.
    fn tx_timestamp(&self) -> DateTime<Utc>;

    /// Reads a world-state value.
    ///
    /// Returns `Ok(None)` if the key does not exist. A value written earlier in
    /// the same transaction is returned as written.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn get_state(&self, key: &str) -> StorageResult<Option<Bytes>>;

    /// Buffers a world-state write.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn put_state(&self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Buffers a world-state delete.
    ///
    /// Deleting a key that does not exist is not an error.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn del_state(&self, key: &str) -> StorageResult<()>;

    /// Iterates committed world-state entries with keys in `[start, end)`,
    /// ascending by key.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn get_state_by_range(
        &self,
        start: &str,
        end: &str,
    ) -> StorageResult<ResultsIterator<KeyValue>>;

    /// Runs a rich query over committed world state.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidQuery`](crate::StorageError::InvalidQuery)
    /// if `query` is not a single well-formed query document.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn get_query_result(&self, query: &str) -> StorageResult<ResultsIterator<KeyValue>>;

    /// Iterates every committed change to `key`, oldest first.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn get_history_for_key(
        &self,
        key: &str,
    ) -> StorageResult<ResultsIterator<KeyModification>>;

    /// Reads a value from a private collection.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AccessDenied`](crate::StorageError::AccessDenied)
    /// if the caller's organization is not a member of the collection and
    /// [`StorageError::NotFound`](crate::StorageError::NotFound) if the
    /// collection is not defined.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn get_private_data(&self, collection: &str, key: &str) -> StorageResult<Option<Bytes>>;

    /// Buffers a write to a private collection.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn put_private_data(&self, collection: &str, key: &str, value: Vec<u8>)
    -> StorageResult<()>;

    /// Buffers a delete from a private collection.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn del_private_data(&self, collection: &str, key: &str) -> StorageResult<()>;

    /// Reads the SHA-256 hash of a private value.
    ///
    /// Available to every organization, member or not.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn get_private_data_hash(
        &self,
        collection: &str,
        key: &str,
    ) -> StorageResult<Option<Bytes>>;

    /// Iterates committed private entries with keys in `[start, end)`.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn get_private_data_by_range(
        &self,
        collection: &str,
        start: &str,
        end: &str,
    ) -> StorageResult<ResultsIterator<KeyValue>>;

    /// Runs a rich query over a private collection.
    #[must_use = "ledger operations may fail and errors must be handled"]
    async fn get_private_data_query_result(
        &self,
        collection: &str,
        query: &str,
    ) -> StorageResult<ResultsIterator<KeyValue>>;

    /// Returns the proposal's transient map.
    fn get_transient(&self) -> StorageResult<TransientMap>;
}
