//! Integration test verifying that `#[instrument]` annotations produce
//! the expected spans on `MemoryTransaction` operations.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use electronics_ledger_storage::{ChaincodeStub, MemoryLedger, StaticIdentity};
use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer: records span names as they are entered
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<String>>>,
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        _attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            self.spans.lock().expect("lock poisoned").push(span.name().to_owned());
        }
    }
}

fn collect() -> (Arc<Mutex<Vec<String>>>, tracing::subscriber::DefaultGuard) {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);
    let subscriber = tracing_subscriber::registry().with(collector);
    (spans, tracing::subscriber::set_default(subscriber))
}

fn assert_span(spans: &Arc<Mutex<Vec<String>>>, name: &str) {
    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.iter().any(|s| s == name), "expected a '{name}' span, got: {recorded:?}");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn put_state_creates_span() {
    let (spans, _guard) = collect();
    let tx = MemoryLedger::new().begin(StaticIdentity::new("Org1MSP"));
    tx.put_state("key-1", b"value-1".to_vec()).await.expect("put should succeed");
    assert_span(&spans, "put_state");
}

#[tokio::test]
async fn get_state_creates_span() {
    let (spans, _guard) = collect();
    let tx = MemoryLedger::new().begin(StaticIdentity::new("Org1MSP"));
    let _ = tx.get_state("missing").await;
    assert_span(&spans, "get_state");
}

#[tokio::test]
async fn range_and_query_create_spans() {
    let (spans, _guard) = collect();
    let tx = MemoryLedger::new().begin(StaticIdentity::new("Org1MSP"));
    let _ = tx.get_state_by_range("a", "z").await;
    let _ = tx.get_query_result(r#"{"selector":{}}"#).await;
    let _ = tx.get_history_for_key("a").await;
    assert_span(&spans, "get_state_by_range");
    assert_span(&spans, "get_query_result");
    assert_span(&spans, "get_history_for_key");
}

#[tokio::test]
async fn commit_creates_span() {
    let (spans, _guard) = collect();
    let tx = MemoryLedger::new().begin(StaticIdentity::new("Org1MSP"));
    tx.put_state("k", b"v".to_vec()).await.expect("put");
    tx.commit().expect("commit");
    assert_span(&spans, "commit");
}
