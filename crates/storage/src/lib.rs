//! Ledger access abstraction for the electronics supply-chain contracts.
//!
//! This crate provides the [`ChaincodeStub`], [`ClientIdentity`] and
//! [`TransactionContext`] traits that contract code is written against, the
//! error taxonomy every ledger adapter maps its failures to, and
//! [`MemoryLedger`], an in-memory ledger that reproduces the platform
//! semantics the contracts rely on.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Dispatch Layer                           │
//! │        (contract name + function name + string args)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   Contract Layer                            │
//! │   Device Registry │ Order Vault │ Assignment Ledger         │
//! │      (authorization, key layout, serialization)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │             electronics-ledger-storage                      │
//! │     ChaincodeStub / ClientIdentity / TransactionContext     │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryLedger │          Ledger platform adapter             │
//! │   (testing)  │              (production)                    │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use electronics_ledger_storage::{ChaincodeStub, MemoryLedger, StaticIdentity};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = MemoryLedger::new();
//!
//!     // Buffer writes in a transaction, then commit them atomically
//!     let tx = ledger.begin(StaticIdentity::new("Org1MSP"));
//!     tx.put_state("device:D1", br#"{"deviceId":"D1"}"#.to_vec()).await?;
//!     tx.put_state("device:D2", br#"{"deviceId":"D2"}"#.to_vec()).await?;
//!     tx.commit()?;
//!
//!     // Scan committed state
//!     let tx = ledger.begin(StaticIdentity::new("Org3MSP"));
//!     let keys: Vec<String> = tx
//!         .get_state_by_range("device:", "device:~")
//!         .await?
//!         .map(|kv| kv.map(|kv| kv.key))
//!         .collect::<Result<_, _>>()?;
//!     assert_eq!(keys, vec!["device:D1", "device:D2"]);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Implementing an Adapter
//!
//! 1. Implement [`ChaincodeStub`] for the platform's per-transaction handle
//! 2. Implement [`ClientIdentity`] over the platform's creator certificate
//! 3. Map platform errors to [`StorageError`]
//! 4. Run the [`conformance`] suite against it
//!
//! See the [`memory`] module source for a reference implementation.
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`], which wraps potential
//! [`StorageError`] variants.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` and `conformance` modules with shared test helpers
//!   (key generators, ledger factories, assertion macros). Enable this in `[dev-dependencies]` for
//!   integration tests.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod collection;
#[cfg(any(test, feature = "testutil"))]
pub mod conformance;
pub mod context;
pub mod error;
pub mod identity;
pub mod iterator;
pub mod memory;
pub mod query;
pub mod stub;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use collection::CollectionConfig;
pub use context::TransactionContext;
pub use error::{BoxError, ConfigError, StorageError, StorageResult};
pub use identity::{ClientIdentity, StaticIdentity};
pub use iterator::{QueryCursor, ResultsIterator, VecCursor};
pub use memory::{MemoryLedger, MemoryTransaction, private_data_hash};
pub use query::{RichQuery, SortField, SortOrder};
pub use stub::ChaincodeStub;
pub use types::{KeyModification, KeyValue, MspId, TransientMap, TxId};
