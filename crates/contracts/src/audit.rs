//! Audit trail for mutating contract calls.
//!
//! Each create, delete and assign call emits exactly one [`AuditEvent`]
//! recording which organization acted, on what, in which transaction, and
//! whether the call succeeded. Events are emitted for refused calls too.
//!
//! # Backends
//!
//! - [`TracingAuditLogger`]: structured `tracing` events at `INFO`, for log aggregation.
//! - [`NoopAuditLogger`]: discards events.
//! - [`MemoryAuditLogger`]: keeps events in memory for inspection in tests.
//!
//! # Usage
//!
//! ```no_run
//! use electronics_ledger_contracts::{
//!     Operation,
//!     audit::{AuditEvent, AuditLogger, AuditResult, TracingAuditLogger, device_resource},
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let logger = TracingAuditLogger;
//! let event = AuditEvent::builder()
//!     .actor("Org1MSP")
//!     .action(Operation::CreateDevice)
//!     .resource(device_resource("D1"))
//!     .tx_id("4f2a")
//!     .result(AuditResult::Success)
//!     .build();
//! logger.log(&event).await;
//! # });
//! ```

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{error::ContractResult, policy::Operation};

/// Outcome of an audited call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    /// The call completed.
    Success,
    /// The call failed with the given reason.
    Failure(String),
}

impl AuditResult {
    /// Summarizes a contract result.
    #[must_use]
    pub fn from_outcome<T>(outcome: &ContractResult<T>) -> Self {
        match outcome {
            Ok(_) => Self::Success,
            Err(e) => Self::Failure(e.to_string()),
        }
    }
}

impl fmt::Display for AuditResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure(reason) => write!(f, "failure: {reason}"),
        }
    }
}

/// Structured audit event for one mutating call.
#[derive(Debug, Clone, bon::Builder)]
pub struct AuditEvent {
    /// When the event occurred (defaults to now).
    #[builder(default = Utc::now())]
    pub timestamp: DateTime<Utc>,
    /// Organization that made the call.
    #[builder(into)]
    pub actor: String,
    /// The guarded operation.
    pub action: Operation,
    /// Affected record (e.g., "device:D1").
    #[builder(into)]
    pub resource: String,
    /// Transaction the call ran in.
    #[builder(into)]
    pub tx_id: String,
    /// Outcome of the call.
    pub result: AuditResult,
    /// Additional context (e.g., retailer, quantity).
    #[builder(default)]
    pub metadata: HashMap<String, String>,
}

/// Sink for audit events.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Records an audit event.
    async fn log(&self, event: &AuditEvent);
}

#[async_trait]
impl<L: AuditLogger> AuditLogger for Arc<L> {
    async fn log(&self, event: &AuditEvent) {
        (**self).log(event).await;
    }
}

/// Audit logger that emits structured `tracing` events.
///
/// Field mapping:
/// - `audit.timestamp`: RFC 3339 timestamp
/// - `audit.actor`: calling organization
/// - `audit.action`: the operation (e.g., "create_device")
/// - `audit.resource`: affected record
/// - `audit.tx_id`: transaction id
/// - `audit.result`: "success" or "failure: ..."
/// - `audit.metadata`: additional context
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log(&self, event: &AuditEvent) {
        let mut metadata: Vec<String> =
            event.metadata.iter().map(|(k, v)| format!("{k}={v}")).collect();
        metadata.sort();

        tracing::info!(
            audit.timestamp = %event.timestamp.to_rfc3339(),
            audit.actor = %event.actor,
            audit.action = %event.action,
            audit.resource = %event.resource,
            audit.tx_id = %event.tx_id,
            audit.result = %event.result,
            audit.metadata = %metadata.join(", "),
            "audit_event"
        );
    }
}

/// Audit logger that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditLogger;

#[async_trait]
impl AuditLogger for NoopAuditLogger {
    async fn log(&self, _event: &AuditEvent) {}
}

/// Audit logger that keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditLogger {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLogger {
    /// Creates an empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Discards recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl AuditLogger for MemoryAuditLogger {
    async fn log(&self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Resource identifier of a device.
#[must_use]
pub fn device_resource(device_id: &str) -> String {
    format!("device:{device_id}")
}

/// Resource identifier of an order in a collection.
#[must_use]
pub fn order_resource(collection: &str, order_id: &str) -> String {
    format!("collection:{collection}/order:{order_id}")
}

/// Resource identifier of a device assignment.
#[must_use]
pub fn assignment_resource(device_id: &str) -> String {
    format!("assignment:{device_id}")
}
