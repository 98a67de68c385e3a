//! In-memory ledger implementation.
//!
//! This module provides [`MemoryLedger`], an in-memory stand-in for the
//! ledger platform, and [`MemoryTransaction`], its [`ChaincodeStub`] and
//! [`TransactionContext`] for one proposal.
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Ordered storage**: Keys are stored in a [`BTreeMap`] for range queries
//! - **Optimistic concurrency**: Every read records the version it saw;
//!   [`MemoryTransaction::commit`] rejects the transaction with
//!   [`StorageError::Conflict`] if any of them moved
//! - **Read-your-writes**: Point reads see the transaction's buffered writes
//! - **History**: Every committed change is appended to the key's log
//! - **Private collections**: Values visible to members only, SHA-256 hashes
//!   visible to everyone
//!
//! # Example
//!
//! ```
//! use electronics_ledger_storage::{ChaincodeStub, MemoryLedger, StaticIdentity};
//!
//! #[tokio::main]
//! async fn main() {
//!     let ledger = MemoryLedger::new();
//!
//!     let tx = ledger.begin(StaticIdentity::new("Org1MSP"));
//!     tx.put_state("greeting", b"hello".to_vec()).await.unwrap();
//!     tx.commit().unwrap();
//!
//!     let tx = ledger.begin(StaticIdentity::new("Org2MSP"));
//!     let value = tx.get_state("greeting").await.unwrap();
//!     assert_eq!(value.unwrap().as_ref(), b"hello");
//! }
//! ```
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits
//! - One process, one copy: there is no ordering service or endorsement
//! - Rich queries scan every value in the namespace

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};

use crate::{
    collection::CollectionConfig,
    context::TransactionContext,
    error::{StorageError, StorageResult},
    identity::{ClientIdentity, StaticIdentity},
    iterator::{ResultsIterator, VecCursor},
    query::RichQuery,
    stub::ChaincodeStub,
    types::{KeyModification, KeyValue, MspId, TransientMap, TxId},
};

/// Computes the hash published to world state for a private value.
#[must_use]
pub fn private_data_hash(value: &[u8]) -> Bytes {
    Bytes::from(Sha256::digest(value).to_vec())
}

/// Address of a value: world state or one private collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Namespace {
    World,
    Private(String),
}

impl Namespace {
    fn describe(&self, key: &str) -> String {
        match self {
            Self::World => format!("{key:?}"),
            Self::Private(collection) => format!("{key:?} in collection {collection}"),
        }
    }
}

/// A committed value and the height of the block that wrote it.
#[derive(Debug, Clone)]
struct Versioned {
    value: Bytes,
    version: u64,
}

struct PrivateStore {
    config: CollectionConfig,
    data: BTreeMap<String, Versioned>,
    hashes: BTreeMap<String, Bytes>,
}

#[derive(Default)]
struct LedgerState {
    height: u64,
    world: BTreeMap<String, Versioned>,
    history: HashMap<String, Vec<KeyModification>>,
    collections: BTreeMap<String, PrivateStore>,
}

impl LedgerState {
    fn namespace(&self, namespace: &Namespace) -> Option<&BTreeMap<String, Versioned>> {
        match namespace {
            Namespace::World => Some(&self.world),
            Namespace::Private(name) => self.collections.get(name).map(|c| &c.data),
        }
    }

    fn version(&self, namespace: &Namespace, key: &str) -> Option<u64> {
        self.namespace(namespace)?.get(key).map(|v| v.version)
    }

    fn collection(&self, name: &str) -> StorageResult<&PrivateStore> {
        self.collections
            .get(name)
            .ok_or_else(|| StorageError::not_found(format!("collection {name}")))
    }
}

/// In-memory ledger shared by every transaction begun on it.
///
/// # Cloning
///
/// `MemoryLedger` is cheaply cloneable via [`Arc`]. All clones share the
/// same underlying state.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    open_iterators: Arc<AtomicUsize>,
}

impl MemoryLedger {
    /// Creates an empty ledger with no private collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a private data collection.
    ///
    /// Redefining an existing collection replaces its membership and keeps
    /// its data.
    #[must_use]
    pub fn with_collection(self, config: CollectionConfig) -> Self {
        {
            let mut state = self.state.write();
            let name = config.name().to_owned();
            match state.collections.get_mut(&name) {
                Some(existing) => existing.config = config,
                None => {
                    let store =
                        PrivateStore { config, data: BTreeMap::new(), hashes: BTreeMap::new() };
                    state.collections.insert(name, store);
                },
            }
        }
        self
    }

    /// Starts a transaction submitted by `identity`.
    ///
    /// The transaction id is the hex SHA-256 of a random nonce followed by the
    /// creator's identity, and the timestamp is the current time.
    pub fn begin(&self, identity: StaticIdentity) -> MemoryTransaction {
        let nonce: [u8; 24] = rand::random();
        let mut hasher = Sha256::new();
        hasher.update(nonce);
        if let Ok(msp_id) = identity.msp_id() {
            hasher.update(msp_id.as_str().as_bytes());
        }
        if let Ok(id) = identity.id() {
            hasher.update(id.as_bytes());
        }
        let tx_id = TxId::from(hex::encode(hasher.finalize()));

        MemoryTransaction {
            ledger: self.clone(),
            identity,
            tx_id,
            timestamp: Utc::now(),
            transient: TransientMap::new(),
            rw_set: Mutex::new(ReadWriteSet::default()),
        }
    }

    /// Number of committed transactions that wrote at least one key.
    #[must_use]
    pub fn height(&self) -> u64 {
        self.state.read().height
    }

    /// Number of query iterators handed out and not yet released.
    #[must_use]
    pub fn open_iterators(&self) -> usize {
        self.open_iterators.load(Ordering::SeqCst)
    }

    /// Reads committed world state directly, bypassing any transaction.
    #[must_use]
    pub fn committed_state(&self, key: &str) -> Option<Bytes> {
        self.state.read().world.get(key).map(|v| v.value.clone())
    }

    /// Reads a committed private value directly, bypassing membership checks.
    #[must_use]
    pub fn committed_private_data(&self, collection: &str, key: &str) -> Option<Bytes> {
        let state = self.state.read();
        state.collections.get(collection)?.data.get(key).map(|v| v.value.clone())
    }

    /// Number of keys in committed world state.
    #[must_use]
    pub fn world_len(&self) -> usize {
        self.state.read().world.len()
    }

    fn iterator<T: Send + 'static>(&self, items: Vec<T>) -> ResultsIterator<T> {
        self.open_iterators.fetch_add(1, Ordering::SeqCst);
        let open = Arc::clone(&self.open_iterators);
        ResultsIterator::new(VecCursor::new(items).on_close(move || {
            open.fetch_sub(1, Ordering::SeqCst);
        }))
    }
}

impl std::fmt::Debug for MemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryLedger")
            .field("height", &state.height)
            .field("keys", &state.world.len())
            .field("collections", &state.collections.keys().collect::<Vec<_>>())
            .field("open_iterators", &self.open_iterators())
            .finish()
    }
}

/// A range scan recorded for phantom detection at commit.
#[derive(Debug)]
struct RangeRead {
    namespace: Namespace,
    start: String,
    end: String,
    observed: Vec<(String, u64)>,
}

/// Reads observed and writes buffered by one transaction.
#[derive(Debug, Default)]
struct ReadWriteSet {
    reads: BTreeMap<(Namespace, String), Option<u64>>,
    ranges: Vec<RangeRead>,
    writes: BTreeMap<(Namespace, String), Option<Bytes>>,
}

impl ReadWriteSet {
    fn buffered(&self, namespace: &Namespace, key: &str) -> Option<Option<Bytes>> {
        self.writes.get(&(namespace.clone(), key.to_owned())).cloned()
    }

    fn record_read(&mut self, namespace: &Namespace, key: &str, version: Option<u64>) {
        self.reads.entry((namespace.clone(), key.to_owned())).or_insert(version);
    }
}

fn in_range(key: &str, start: &str, end: &str) -> bool {
    (start.is_empty() || key >= start) && (end.is_empty() || key < end)
}

fn scan(map: &BTreeMap<String, Versioned>, start: &str, end: &str) -> Vec<(String, Versioned)> {
    if !start.is_empty() && !end.is_empty() && start >= end {
        return Vec::new();
    }
    let lower = if start.is_empty() { "" } else { start };
    map.range::<str, _>((std::ops::Bound::Included(lower), std::ops::Bound::Unbounded))
        .take_while(|(key, _)| in_range(key, start, end))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn run_query(map: &BTreeMap<String, Versioned>, query: &RichQuery) -> Vec<KeyValue> {
    let mut matches: Vec<(serde_json::Value, KeyValue)> = map
        .iter()
        .filter_map(|(key, versioned)| {
            let doc = serde_json::from_slice::<serde_json::Value>(&versioned.value).ok()?;
            query.matches(&doc).then(|| (doc, KeyValue::new(key.clone(), versioned.value.clone())))
        })
        .collect();
    // Stable sort: ties keep ascending key order.
    matches.sort_by(|(a, _), (b, _)| query.compare(a, b));
    query.apply_limit(matches.into_iter().map(|(_, kv)| kv).collect())
}

/// One proposal executing against a [`MemoryLedger`].
///
/// Implements both [`ChaincodeStub`] and [`TransactionContext`], so it can be
/// handed directly to contract code. Nothing it writes is visible to other
/// transactions until [`commit`](Self::commit) succeeds; dropping it without
/// committing discards the write set.
pub struct MemoryTransaction {
    ledger: MemoryLedger,
    identity: StaticIdentity,
    tx_id: TxId,
    timestamp: DateTime<Utc>,
    transient: TransientMap,
    rw_set: Mutex<ReadWriteSet>,
}

impl MemoryTransaction {
    /// Attaches transient data to the proposal.
    #[must_use]
    pub fn with_transient(mut self, transient: TransientMap) -> Self {
        self.transient = transient;
        self
    }

    /// Overrides the proposal timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether the transaction has buffered any write.
    #[must_use]
    pub fn has_writes(&self) -> bool {
        !self.rw_set.lock().writes.is_empty()
    }

    /// Validates the read set and applies the write set atomically.
    ///
    /// A transaction without writes validates but does not advance the
    /// ledger height or touch any history.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if a key read by this transaction,
    /// or the key set of a range it scanned, changed since the read. Nothing
    /// is applied in that case.
    ///
    /// Returns [`StorageError::NotFound`] if a buffered private write names a
    /// collection the ledger does not define, again before anything is applied.
    #[tracing::instrument(skip(self), fields(tx_id = %self.tx_id))]
    pub fn commit(self) -> StorageResult<()> {
        let rw_set = self.rw_set.into_inner();
        let mut state = self.ledger.state.write();

        for ((namespace, key), seen) in &rw_set.reads {
            if state.version(namespace, key) != *seen {
                tracing::debug!(key = %key, "read conflict");
                return Err(StorageError::conflict(format!(
                    "{} was modified after it was read",
                    namespace.describe(key)
                )));
            }
        }

        for range in &rw_set.ranges {
            let current: Vec<(String, u64)> = state
                .namespace(&range.namespace)
                .map(|map| {
                    scan(map, &range.start, &range.end)
                        .into_iter()
                        .map(|(key, value)| (key, value.version))
                        .collect()
                })
                .unwrap_or_default();
            if current != range.observed {
                return Err(StorageError::conflict(format!(
                    "range [{:?}, {:?}) changed after it was scanned",
                    range.start, range.end
                )));
            }
        }

        if rw_set.writes.is_empty() {
            return Ok(());
        }

        for (namespace, _) in rw_set.writes.keys() {
            if let Namespace::Private(collection) = namespace {
                state.collection(collection)?;
            }
        }

        state.height += 1;
        let height = state.height;
        for ((namespace, key), value) in rw_set.writes {
            match namespace {
                Namespace::World => {
                    let modification = KeyModification {
                        tx_id: self.tx_id.clone(),
                        timestamp: self.timestamp,
                        value: value.clone().unwrap_or_default(),
                        is_delete: value.is_none(),
                    };
                    match value {
                        Some(value) => {
                            state.world.insert(key.clone(), Versioned { value, version: height });
                        },
                        None => {
                            state.world.remove(&key);
                        },
                    }
                    state.history.entry(key).or_default().push(modification);
                },
                Namespace::Private(collection) => {
                    // Resolved above, before anything was applied.
                    let Some(store) = state.collections.get_mut(&collection) else {
                        continue;
                    };
                    match value {
                        Some(value) => {
                            store.hashes.insert(key.clone(), private_data_hash(&value));
                            store.data.insert(key, Versioned { value, version: height });
                        },
                        None => {
                            store.hashes.remove(&key);
                            store.data.remove(&key);
                        },
                    }
                },
            }
        }

        tracing::debug!(height, "transaction committed");
        Ok(())
    }

    fn caller(&self) -> StorageResult<MspId> {
        self.identity.msp_id()
    }

    fn read(&self, namespace: &Namespace, key: &str) -> Option<Bytes> {
        let mut rw_set = self.rw_set.lock();
        if let Some(buffered) = rw_set.buffered(namespace, key) {
            return buffered;
        }
        let state = self.ledger.state.read();
        let versioned = state.namespace(namespace).and_then(|map| map.get(key)).cloned();
        rw_set.record_read(namespace, key, versioned.as_ref().map(|v| v.version));
        versioned.map(|v| v.value)
    }

    fn write(&self, namespace: Namespace, key: &str, value: Option<Bytes>) {
        self.rw_set.lock().writes.insert((namespace, key.to_owned()), value);
    }

    fn range(&self, namespace: Namespace, start: &str, end: &str) -> Vec<KeyValue> {
        let entries = {
            let state = self.ledger.state.read();
            state.namespace(&namespace).map(|map| scan(map, start, end)).unwrap_or_default()
        };
        let observed = entries.iter().map(|(key, value)| (key.clone(), value.version)).collect();
        self.rw_set.lock().ranges.push(RangeRead {
            namespace,
            start: start.to_owned(),
            end: end.to_owned(),
            observed,
        });
        entries.into_iter().map(|(key, value)| KeyValue::new(key, value.value)).collect()
    }

    fn readable_collection(&self, collection: &str) -> StorageResult<()> {
        let caller = self.caller()?;
        let state = self.ledger.state.read();
        let store = state.collection(collection)?;
        if !store.config.can_read(&caller) {
            tracing::debug!(collection, %caller, "private read denied");
            return Err(StorageError::access_denied(format!(
                "organization {caller} is not a member of collection {collection}"
            )));
        }
        Ok(())
    }

    fn known_collection(&self, collection: &str) -> StorageResult<()> {
        self.ledger.state.read().collection(collection).map(|_| ())
    }
}

#[async_trait]
impl ChaincodeStub for MemoryTransaction {
    fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[tracing::instrument(skip(self))]
    async fn get_state(&self, key: &str) -> StorageResult<Option<Bytes>> {
        Ok(self.read(&Namespace::World, key))
    }

    #[tracing::instrument(skip(self, value), fields(len = value.len()))]
    async fn put_state(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.write(Namespace::World, key, Some(Bytes::from(value)));
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn del_state(&self, key: &str) -> StorageResult<()> {
        self.write(Namespace::World, key, None);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_state_by_range(
        &self,
        start: &str,
        end: &str,
    ) -> StorageResult<ResultsIterator<KeyValue>> {
        let entries = self.range(Namespace::World, start, end);
        Ok(self.ledger.iterator(entries))
    }

    #[tracing::instrument(skip(self))]
    async fn get_query_result(&self, query: &str) -> StorageResult<ResultsIterator<KeyValue>> {
        let query = RichQuery::parse(query)?;
        let results = run_query(&self.ledger.state.read().world, &query);
        Ok(self.ledger.iterator(results))
    }

    #[tracing::instrument(skip(self))]
    async fn get_history_for_key(
        &self,
        key: &str,
    ) -> StorageResult<ResultsIterator<KeyModification>> {
        let log = self.ledger.state.read().history.get(key).cloned().unwrap_or_default();
        Ok(self.ledger.iterator(log))
    }

    #[tracing::instrument(skip(self))]
    async fn get_private_data(&self, collection: &str, key: &str) -> StorageResult<Option<Bytes>> {
        self.readable_collection(collection)?;
        Ok(self.read(&Namespace::Private(collection.to_owned()), key))
    }

    #[tracing::instrument(skip(self, value), fields(len = value.len()))]
    async fn put_private_data(
        &self,
        collection: &str,
        key: &str,
        value: Vec<u8>,
    ) -> StorageResult<()> {
        self.known_collection(collection)?;
        self.write(Namespace::Private(collection.to_owned()), key, Some(Bytes::from(value)));
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn del_private_data(&self, collection: &str, key: &str) -> StorageResult<()> {
        self.known_collection(collection)?;
        self.write(Namespace::Private(collection.to_owned()), key, None);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_private_data_hash(
        &self,
        collection: &str,
        key: &str,
    ) -> StorageResult<Option<Bytes>> {
        let namespace = Namespace::Private(collection.to_owned());
        let mut rw_set = self.rw_set.lock();
        if let Some(buffered) = rw_set.buffered(&namespace, key) {
            return Ok(buffered.map(|value| private_data_hash(&value)));
        }
        let state = self.ledger.state.read();
        let store = state.collection(collection)?;
        rw_set.record_read(&namespace, key, store.data.get(key).map(|v| v.version));
        Ok(store.hashes.get(key).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn get_private_data_by_range(
        &self,
        collection: &str,
        start: &str,
        end: &str,
    ) -> StorageResult<ResultsIterator<KeyValue>> {
        self.readable_collection(collection)?;
        let entries = self.range(Namespace::Private(collection.to_owned()), start, end);
        Ok(self.ledger.iterator(entries))
    }

    #[tracing::instrument(skip(self))]
    async fn get_private_data_query_result(
        &self,
        collection: &str,
        query: &str,
    ) -> StorageResult<ResultsIterator<KeyValue>> {
        self.readable_collection(collection)?;
        let query = RichQuery::parse(query)?;
        let results = {
            let state = self.ledger.state.read();
            run_query(&state.collection(collection)?.data, &query)
        };
        Ok(self.ledger.iterator(results))
    }

    fn get_transient(&self) -> StorageResult<TransientMap> {
        Ok(self.transient.clone())
    }
}

impl TransactionContext for MemoryTransaction {
    fn stub(&self) -> &dyn ChaincodeStub {
        self
    }

    fn client_identity(&self) -> &dyn ClientIdentity {
        &self.identity
    }
}

impl std::fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransaction")
            .field("tx_id", &self.tx_id)
            .field("identity", &self.identity)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}
