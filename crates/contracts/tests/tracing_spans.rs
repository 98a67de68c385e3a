//! Integration test verifying that contract methods produce named spans and
//! that the tracing audit logger emits structured events.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use electronics_ledger_contracts::{
    Chaincode, ContractConfig, ContractEnv, DEVICE_CONTRACT, TracingAuditLogger,
    testutil::{DEALER, MANUFACTURER, TestNetwork, new_device},
};
use electronics_ledger_storage::{MemoryLedger, StaticIdentity};
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer: records span names and event messages
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Collector {
    spans: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<String>>>,
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{value:?}");
        }
    }
}

impl<S> tracing_subscriber::Layer<S> for Collector
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

    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        self.events.lock().expect("lock poisoned").push(message);
    }
}

struct Capture {
    spans: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<String>>>,
    _guard: tracing::subscriber::DefaultGuard,
}

impl Capture {
    fn start() -> Self {
        let collector = Collector::default();
        let spans = Arc::clone(&collector.spans);
        let events = Arc::clone(&collector.events);
        let subscriber = tracing_subscriber::registry().with(collector);
        Self { spans, events, _guard: tracing::subscriber::set_default(subscriber) }
    }

    fn assert_span(&self, name: &str) {
        let recorded = self.spans.lock().expect("lock poisoned");
        assert!(recorded.iter().any(|s| s == name), "expected a '{name}' span, got: {recorded:?}");
    }

    fn assert_event(&self, message: &str) {
        let recorded = self.events.lock().expect("lock poisoned");
        assert!(
            recorded.iter().any(|m| m == message),
            "expected a '{message}' event, got: {recorded:?}"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_device_operations_create_spans() {
    let capture = Capture::start();
    let network = TestNetwork::new();
    let tx = network.begin(MANUFACTURER);
    let devices = network.chaincode.devices();

    devices.create_device(&tx, new_device("D1")).await.expect("create");
    let _ = devices.read_device(&tx, "D1").await;
    let _ = devices.get_all_devices(&tx).await;
    let _ = devices.get_devices_by_range(&tx, "", "").await;
    let _ = devices.get_device_history(&tx, "D1").await;

    for name in [
        "create_device",
        "device_exists",
        "read_device",
        "get_all_devices",
        "get_devices_by_range",
        "get_device_history",
        "put_state",
        "get_query_result",
    ] {
        capture.assert_span(name);
    }
}

#[tokio::test]
async fn test_order_and_assignment_operations_create_spans() {
    let capture = Capture::start();
    let network = TestNetwork::new();
    let tx = network.begin(DEALER);

    let _ = network.chaincode.orders().create_order(&tx, "O1").await;
    let _ = network.chaincode.orders().read_order(&tx, "O1").await;
    let _ = network.chaincode.assignments().read_device_assignment(&tx, "D1").await;

    capture.assert_span("create_order");
    capture.assert_span("order_exists");
    capture.assert_span("read_order");
    capture.assert_span("get_private_data_hash");
    capture.assert_span("read_device_assignment");
}

#[tokio::test]
async fn test_dispatch_creates_invoke_span() {
    let capture = Capture::start();
    let network = TestNetwork::new();
    let _ = network.evaluate(DEALER, DEVICE_CONTRACT, "DeviceExists", &["D1"]).await;
    capture.assert_span("invoke");
    capture.assert_span("device_exists");
}

#[tokio::test]
async fn test_denied_call_logs_warning() {
    let capture = Capture::start();
    let network = TestNetwork::new();
    let tx = network.begin(DEALER);
    let _ = network.chaincode.devices().create_device(&tx, new_device("D1")).await;
    capture.assert_event("authorization denied");
}

#[tokio::test]
async fn test_tracing_audit_logger_emits_audit_event() {
    let capture = Capture::start();
    let env = ContractEnv::new(ContractConfig::default())
        .with_audit_logger(Arc::new(TracingAuditLogger));
    let chaincode = Chaincode::with_env(env);
    let ledger = MemoryLedger::new();
    let tx = ledger.begin(StaticIdentity::new(MANUFACTURER));

    chaincode.devices().create_device(&tx, new_device("D1")).await.expect("create");
    capture.assert_event("audit_event");
    capture.assert_event("device created");
}
