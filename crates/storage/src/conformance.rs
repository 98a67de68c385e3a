//! Conformance test suite for [`ChaincodeStub`] implementations.
//!
//! Every adapter of the ledger platform, in-memory or remote, can run the
//! same suite to check that contract code will observe the semantics it
//! relies on. A stub is bound to one transaction, so the suite drives a
//! [`LedgerHarness`] that can begin and commit transactions.
//!
//! # Usage
//!
//! Enable the `testutil` feature and call each conformance function with a
//! harness:
//!
//! ```no_run
//! use electronics_ledger_storage::{conformance, testutil::conformance_ledger};
//!
//! #[tokio::test]
//! async fn crud_get_returns_none_for_missing_key() {
//!     conformance::crud_get_returns_none_for_missing_key(&conformance_ledger()).await;
//! }
//! ```
//!
//! The harness must define [`PRIVATE_COLLECTION`] with [`MEMBER_ORG`] as a
//! member and [`OUTSIDER_ORG`] as a non-member.
//!
//! # Test Categories
//!
//! | Category | Functions | Contract aspect |
//! |----------|-----------|-----------------|
//! | CRUD | 5 tests | Point get/put/delete within and across transactions |
//! | Range | 4 tests | `[start, end)` ordering and unbounded sides |
//! | Query | 3 tests | Selector filtering, sort, malformed documents |
//! | History | 2 tests | Change log order and delete markers |
//! | Private | 4 tests | Membership, hashes, isolation from world state |
//! | Transaction | 3 tests | Isolation, conflicts, discarded proposals |
//! | Concurrent | 1 test | Exactly one winner among racing creators |

#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::{
    assert_storage_error,
    error::{StorageError, StorageResult},
    stub::ChaincodeStub,
    types::{KeyModification, KeyValue},
};

/// Private collection every harness must define.
pub const PRIVATE_COLLECTION: &str = "conformanceCollection";

/// Organization that is a member of [`PRIVATE_COLLECTION`].
pub const MEMBER_ORG: &str = "Org1MSP";

/// Organization that is not a member of [`PRIVATE_COLLECTION`].
pub const OUTSIDER_ORG: &str = "Org3MSP";

/// Begins and commits transactions against one ledger instance.
pub trait LedgerHarness: Send + Sync {
    /// Stub type handed out for each transaction.
    type Tx: ChaincodeStub + 'static;

    /// Starts a transaction submitted by an organization.
    fn begin(&self, msp_id: &str) -> Self::Tx;

    /// Commits a transaction.
    fn commit(&self, tx: Self::Tx) -> StorageResult<()>;
}

async fn put_committed<H: LedgerHarness>(harness: &H, pairs: &[(&str, &str)]) {
    let tx = harness.begin(MEMBER_ORG);
    for (key, value) in pairs {
        tx.put_state(key, value.as_bytes().to_vec()).await.expect("put_state");
    }
    harness.commit(tx).expect("commit");
}

fn keys(results: impl Iterator<Item = StorageResult<KeyValue>>) -> Vec<String> {
    results.map(|kv| kv.expect("iterator item").key).collect()
}

// ============================================================================
// CRUD (5 tests)
// ============================================================================

/// `get_state` on a nonexistent key returns `Ok(None)`.
pub async fn crud_get_returns_none_for_missing_key<H: LedgerHarness>(harness: &H) {
    let tx = harness.begin(MEMBER_ORG);
    let result = tx.get_state("crud:missing").await;
    assert!(result.is_ok(), "get should not error on missing key: {result:?}");
    assert_eq!(result.expect("checked above"), None, "missing key should return None");
}

/// A committed write is visible to later transactions.
pub async fn crud_commit_then_get_returns_value<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[("crud:k1", "v1")]).await;
    let tx = harness.begin(OUTSIDER_ORG);
    assert_eq!(tx.get_state("crud:k1").await.expect("get"), Some(Bytes::from("v1")));
}

/// A transaction reads its own buffered writes and deletes.
pub async fn crud_read_your_writes<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[("crud:ryw-old", "old")]).await;
    let tx = harness.begin(MEMBER_ORG);
    tx.put_state("crud:ryw-new", b"new".to_vec()).await.expect("put");
    tx.del_state("crud:ryw-old").await.expect("del");
    assert_eq!(tx.get_state("crud:ryw-new").await.expect("get"), Some(Bytes::from("new")));
    assert_eq!(tx.get_state("crud:ryw-old").await.expect("get"), None);
}

/// Deleting a nonexistent key is a silent no-op.
pub async fn crud_delete_nonexistent_is_noop<H: LedgerHarness>(harness: &H) {
    let tx = harness.begin(MEMBER_ORG);
    let result = tx.del_state("crud:ghost").await;
    assert!(result.is_ok(), "delete of nonexistent key should not error: {result:?}");
}

/// A committed delete removes the key.
pub async fn crud_delete_removes_key<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[("crud:k2", "val")]).await;
    let tx = harness.begin(MEMBER_ORG);
    tx.del_state("crud:k2").await.expect("delete");
    harness.commit(tx).expect("commit");

    let tx = harness.begin(MEMBER_ORG);
    assert_eq!(tx.get_state("crud:k2").await.expect("get after delete"), None);
}

// ============================================================================
// Range (4 tests)
// ============================================================================

/// Range results come back in ascending key order.
pub async fn range_results_are_ordered<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[("r:c", "v"), ("r:a", "v"), ("r:b", "v")]).await;
    let tx = harness.begin(MEMBER_ORG);
    let found = keys(tx.get_state_by_range("r:", "r:~").await.expect("range"));
    assert_eq!(found, vec!["r:a", "r:b", "r:c"], "range results must be sorted");
}

/// The end bound is exclusive.
pub async fn range_exclusive_end<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[("rx:a", "v"), ("rx:b", "v"), ("rx:c", "v")]).await;
    let tx = harness.begin(MEMBER_ORG);
    let found = keys(tx.get_state_by_range("rx:a", "rx:c").await.expect("range"));
    assert_eq!(found, vec!["rx:a", "rx:b"]);
}

/// Empty bounds leave that side of the range open.
pub async fn range_empty_bounds_are_unbounded<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[("ru:a", "v"), ("ru:b", "v")]).await;
    let tx = harness.begin(MEMBER_ORG);
    let from = keys(tx.get_state_by_range("ru:b", "").await.expect("range"));
    assert!(from.contains(&"ru:b".to_owned()) && !from.contains(&"ru:a".to_owned()));
    let until = keys(tx.get_state_by_range("", "ru:b").await.expect("range"));
    assert!(until.contains(&"ru:a".to_owned()) && !until.contains(&"ru:b".to_owned()));
}

/// `start == end` yields nothing.
pub async fn range_empty_range_returns_empty<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[("re:a", "v")]).await;
    let tx = harness.begin(MEMBER_ORG);
    let found = keys(tx.get_state_by_range("re:a", "re:a").await.expect("range"));
    assert!(found.is_empty(), "start == end should return nothing: {found:?}");
}

// ============================================================================
// Query (3 tests)
// ============================================================================

/// Rich queries return only documents matching the selector.
pub async fn query_selector_filters<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[
        ("q:1", r#"{"kind":"conformanceWidget","rank":1}"#),
        ("q:2", r#"{"kind":"conformanceGadget","rank":2}"#),
        ("q:3", "opaque bytes"),
    ])
    .await;
    let tx = harness.begin(MEMBER_ORG);
    let found = keys(
        tx.get_query_result(r#"{"selector":{"kind":"conformanceWidget"}}"#).await.expect("query"),
    );
    assert_eq!(found, vec!["q:1"]);
}

/// Sort clauses inside the query document are honored.
pub async fn query_sort_descending<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[
        ("qs:1", r#"{"kind":"conformanceSorted","rank":1}"#),
        ("qs:2", r#"{"kind":"conformanceSorted","rank":3}"#),
        ("qs:3", r#"{"kind":"conformanceSorted","rank":2}"#),
    ])
    .await;
    let tx = harness.begin(MEMBER_ORG);
    let query = r#"{"selector":{"kind":"conformanceSorted"},"sort":[{"rank":"desc"}]}"#;
    let found = keys(tx.get_query_result(query).await.expect("query"));
    assert_eq!(found, vec!["qs:2", "qs:3", "qs:1"]);
}

/// A sort clause trailing the query object is rejected.
pub async fn query_malformed_is_rejected<H: LedgerHarness>(harness: &H) {
    let tx = harness.begin(MEMBER_ORG);
    let malformed = r#"{"selector":{"kind":"conformanceSorted"}}, "sort":[{"rank":"desc"}]"#;
    assert_storage_error!(tx.get_query_result(malformed).await, InvalidQuery);
}

// ============================================================================
// History (2 tests)
// ============================================================================

/// History lists committed changes oldest first.
pub async fn history_is_oldest_first<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[("h:1", "first")]).await;
    put_committed(harness, &[("h:1", "second")]).await;
    let tx = harness.begin(MEMBER_ORG);
    let log: Vec<KeyModification> = tx
        .get_history_for_key("h:1")
        .await
        .expect("history")
        .map(|m| m.expect("history item"))
        .collect();
    let values: Vec<Bytes> = log.iter().map(|m| m.value.clone()).collect();
    assert_eq!(values, vec![Bytes::from("first"), Bytes::from("second")]);
}

/// A delete appears in history flagged `is_delete` with an empty value.
pub async fn history_marks_deletes<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[("h:2", "v")]).await;
    let tx = harness.begin(MEMBER_ORG);
    tx.del_state("h:2").await.expect("del");
    harness.commit(tx).expect("commit");

    let tx = harness.begin(MEMBER_ORG);
    let log: Vec<KeyModification> = tx
        .get_history_for_key("h:2")
        .await
        .expect("history")
        .map(|m| m.expect("history item"))
        .collect();
    assert_eq!(log.len(), 2);
    let last = log.last().expect("two entries");
    assert!(last.is_delete);
    assert!(last.value.is_empty());
}

// ============================================================================
// Private (4 tests)
// ============================================================================

/// Members read committed private values.
pub async fn private_member_reads_value<H: LedgerHarness>(harness: &H) {
    let tx = harness.begin(MEMBER_ORG);
    tx.put_private_data(PRIVATE_COLLECTION, "p:1", b"secret".to_vec()).await.expect("put");
    harness.commit(tx).expect("commit");

    let tx = harness.begin(MEMBER_ORG);
    let value = tx.get_private_data(PRIVATE_COLLECTION, "p:1").await.expect("get");
    assert_eq!(value, Some(Bytes::from("secret")));
}

/// Non-members are denied the value but see its SHA-256 hash.
pub async fn private_outsider_sees_hash_only<H: LedgerHarness>(harness: &H) {
    let tx = harness.begin(MEMBER_ORG);
    tx.put_private_data(PRIVATE_COLLECTION, "p:2", b"classified".to_vec()).await.expect("put");
    harness.commit(tx).expect("commit");

    let tx = harness.begin(OUTSIDER_ORG);
    assert_storage_error!(tx.get_private_data(PRIVATE_COLLECTION, "p:2").await, AccessDenied);
    let hash = tx.get_private_data_hash(PRIVATE_COLLECTION, "p:2").await.expect("hash");
    assert_eq!(hash, Some(Bytes::from(Sha256::digest(b"classified").to_vec())));
}

/// A missing private key has no hash.
pub async fn private_missing_hash_is_none<H: LedgerHarness>(harness: &H) {
    let tx = harness.begin(OUTSIDER_ORG);
    let hash = tx.get_private_data_hash(PRIVATE_COLLECTION, "p:missing").await.expect("hash");
    assert_eq!(hash, None);
}

/// Private values never show up in world state queries.
pub async fn private_data_not_in_world_state<H: LedgerHarness>(harness: &H) {
    let tx = harness.begin(MEMBER_ORG);
    tx.put_private_data(PRIVATE_COLLECTION, "p:3", b"{}".to_vec()).await.expect("put");
    harness.commit(tx).expect("commit");

    let tx = harness.begin(MEMBER_ORG);
    assert_eq!(tx.get_state("p:3").await.expect("get"), None);
    let found = keys(tx.get_private_data_by_range(PRIVATE_COLLECTION, "p:3", "p:4").await.expect(
        "private range",
    ));
    assert_eq!(found, vec!["p:3"]);
}

// ============================================================================
// Transaction (3 tests)
// ============================================================================

/// Uncommitted writes are invisible to other transactions.
pub async fn tx_uncommitted_writes_are_isolated<H: LedgerHarness>(harness: &H) {
    let writer = harness.begin(MEMBER_ORG);
    writer.put_state("tx:iso", b"pending".to_vec()).await.expect("put");
    let reader = harness.begin(MEMBER_ORG);
    assert_eq!(reader.get_state("tx:iso").await.expect("get"), None);
}

/// Dropping a transaction discards its writes.
pub async fn tx_drop_without_commit_is_noop<H: LedgerHarness>(harness: &H) {
    {
        let tx = harness.begin(MEMBER_ORG);
        tx.put_state("tx:dropped", b"v".to_vec()).await.expect("put");
    }
    let tx = harness.begin(MEMBER_ORG);
    assert_eq!(tx.get_state("tx:dropped").await.expect("get"), None);
}

/// A stale read fails validation at commit.
pub async fn tx_stale_read_conflicts<H: LedgerHarness>(harness: &H) {
    put_committed(harness, &[("tx:stale", "v1")]).await;
    let slow = harness.begin(MEMBER_ORG);
    let _ = slow.get_state("tx:stale").await.expect("get");
    slow.put_state("tx:stale", b"slow".to_vec()).await.expect("put");

    put_committed(harness, &[("tx:stale", "v2")]).await;
    assert_storage_error!(harness.commit(slow), Conflict);

    let tx = harness.begin(MEMBER_ORG);
    assert_eq!(tx.get_state("tx:stale").await.expect("get"), Some(Bytes::from("v2")));
}

// ============================================================================
// Concurrent (1 test)
// ============================================================================

/// Of several transactions racing to create the same key after observing it
/// absent, exactly one commits.
pub async fn concurrent_create_exactly_one_winner<H: LedgerHarness + 'static>(harness: Arc<H>) {
    let racers: Vec<H::Tx> = (0..8).map(|_| harness.begin(MEMBER_ORG)).collect();
    for (i, tx) in racers.iter().enumerate() {
        assert_eq!(tx.get_state("cc:key").await.expect("get"), None);
        tx.put_state("cc:key", format!("racer{i}").into_bytes()).await.expect("put");
    }

    let mut handles = Vec::new();
    for tx in racers {
        let harness = Arc::clone(&harness);
        handles.push(tokio::spawn(async move { harness.commit(tx) }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(()) => winners += 1,
            Err(StorageError::Conflict { .. }) => {},
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(winners, 1, "exactly one racer should commit");
}

// ============================================================================
// Convenience runner
// ============================================================================

/// Run the full conformance suite against one harness.
///
/// ```no_run
/// use std::sync::Arc;
///
/// use electronics_ledger_storage::{conformance, testutil::conformance_ledger};
///
/// #[tokio::test]
/// async fn memory_ledger_conformance() {
///     conformance::run_all(Arc::new(conformance_ledger())).await;
/// }
/// ```
pub async fn run_all<H: LedgerHarness + 'static>(harness: Arc<H>) {
    // CRUD
    crud_get_returns_none_for_missing_key(harness.as_ref()).await;
    crud_commit_then_get_returns_value(harness.as_ref()).await;
    crud_read_your_writes(harness.as_ref()).await;
    crud_delete_nonexistent_is_noop(harness.as_ref()).await;
    crud_delete_removes_key(harness.as_ref()).await;

    // Range
    range_results_are_ordered(harness.as_ref()).await;
    range_exclusive_end(harness.as_ref()).await;
    range_empty_bounds_are_unbounded(harness.as_ref()).await;
    range_empty_range_returns_empty(harness.as_ref()).await;

    // Query
    query_selector_filters(harness.as_ref()).await;
    query_sort_descending(harness.as_ref()).await;
    query_malformed_is_rejected(harness.as_ref()).await;

    // History
    history_is_oldest_first(harness.as_ref()).await;
    history_marks_deletes(harness.as_ref()).await;

    // Private
    private_member_reads_value(harness.as_ref()).await;
    private_outsider_sees_hash_only(harness.as_ref()).await;
    private_missing_hash_is_none(harness.as_ref()).await;
    private_data_not_in_world_state(harness.as_ref()).await;

    // Transaction
    tx_uncommitted_writes_are_isolated(harness.as_ref()).await;
    tx_drop_without_commit_is_noop(harness.as_ref()).await;
    tx_stale_read_conflicts(harness.as_ref()).await;

    // Concurrent
    concurrent_create_exactly_one_winner(Arc::clone(&harness)).await;
}
