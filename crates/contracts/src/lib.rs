//! Registry contracts for tracking electronic devices through a supply chain.
//!
//! Three contracts share one ledger:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Chaincode::invoke                        │
//! │        (contract name, function name, string args)           │
//! └──────────────┬────────────────┬───────────────┬──────────────┘
//!                │                │               │
//!   ┌────────────▼───┐  ┌─────────▼──────┐  ┌─────▼──────────────┐
//!   │ Device registry│  │  Order vault   │  │ Assignment ledger  │
//!   │  world state   │  │ private data + │  │   world state      │
//!   │                │  │ published hash │  │                    │
//!   └────────────┬───┘  └─────────┬──────┘  └─────┬──────────────┘
//!                │                │               │
//!   ┌────────────▼────────────────▼───────────────▼──────────────┐
//!   │  AccessPolicy · KeyLayout · AuditLogger   (ContractEnv)     │
//!   └────────────────────────────┬────────────────────────────────┘
//!                                │
//!   ┌────────────────────────────▼────────────────────────────────┐
//!   │            TransactionContext (stub + identity)             │
//!   └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Contracts hold only immutable configuration. Everything tied to one
//! invocation (ledger access, caller identity, transient data) arrives
//! through the [`TransactionContext`](electronics_ledger_storage::TransactionContext).
//!
//! | Operation | Allowed organization (default) |
//! |-----------|--------------------------------|
//! | create/delete device | manufacturer (`Org1MSP`) |
//! | create order | dealer (`Org2MSP`) |
//! | delete order | manufacturer or dealer |
//! | assign device | distributor (`Org3MSP`) |
//!
//! Reads are open to every organization, except order contents, which only
//! members of the order collection can see.
//!
//! # Quick Start
//!
//! ```
//! use electronics_ledger_contracts::{Chaincode, ContractConfig, device::NewDevice};
//! use electronics_ledger_storage::{MemoryLedger, StaticIdentity};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let ledger = MemoryLedger::new();
//! let chaincode = Chaincode::new(ContractConfig::default());
//!
//! let tx = ledger.begin(StaticIdentity::new("Org1MSP"));
//! let device = NewDevice::builder()
//!     .device_id("D1")
//!     .brand("Acme")
//!     .device_type("phone")
//!     .color("black")
//!     .manufacturer("AcmeCorp")
//!     .date_of_manufacture("2024-01-01")
//!     .build();
//! chaincode.devices().create_device(&tx, device).await.unwrap();
//! tx.commit().unwrap();
//!
//! let tx = ledger.begin(StaticIdentity::new("Org3MSP"));
//! let device = chaincode.devices().read_device(&tx, "D1").await.unwrap();
//! assert_eq!(device.status, "In Factory");
//! # });
//! ```
//!
//! # Feature Flags
//!
//! - `testutil`: exposes [`testutil`] fixtures and the [`assert_contract_error!`] macro.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod assets;
pub mod assignment;
pub mod audit;
pub mod chaincode;
pub mod config;
pub mod device;
pub mod env;
pub mod error;
pub mod keys;
pub mod order;
pub mod policy;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

pub use assets::{
    DeviceAssignment, ElectronicDevice, ElectronicsOrder, HistoryQueryResult, STATUS_IN_FACTORY,
};
pub use assignment::ElectronicAssignmentContract;
pub use audit::{
    AuditEvent, AuditLogger, AuditResult, MemoryAuditLogger, NoopAuditLogger, TracingAuditLogger,
};
pub use chaincode::{ASSIGNMENT_CONTRACT, Chaincode, DEVICE_CONTRACT, ORDER_CONTRACT};
pub use config::ContractConfig;
pub use device::{ElectronicDeviceContract, NewDevice};
pub use env::ContractEnv;
pub use error::{ContractError, ContractResult, ErrorKind};
pub use keys::KeyLayout;
pub use order::{ElectronicsOrderContract, OrderRequest};
pub use policy::{AccessPolicy, Operation};
