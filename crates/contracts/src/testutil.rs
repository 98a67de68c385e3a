//! Fixtures for exercising the contracts against a [`MemoryLedger`].
//!
//! Feature-gated behind `testutil`.
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use electronics_ledger_contracts::testutil::{MANUFACTURER, TestNetwork};
//! ```

use std::{collections::BTreeSet, sync::Arc};

use electronics_ledger_storage::{
    CollectionConfig, MemoryLedger, MemoryTransaction, MspId, StaticIdentity, TransientMap,
    testutil::transient,
};

use crate::{
    audit::MemoryAuditLogger,
    chaincode::Chaincode,
    config::ContractConfig,
    device::NewDevice,
    env::ContractEnv,
    error::ContractResult,
};

/// Default manufacturer organization.
pub const MANUFACTURER: &str = "Org1MSP";

/// Default dealer organization.
pub const DEALER: &str = "Org2MSP";

/// Default distributor organization.
pub const DISTRIBUTOR: &str = "Org3MSP";

/// An organization with no role at all.
pub const OUTSIDER: &str = "Org4MSP";

/// Order collection definition whose members are the manufacturer and
/// dealer of `config`.
///
/// # Panics
///
/// Panics if the configured collection name is invalid.
#[must_use]
pub fn order_collection(config: &ContractConfig) -> CollectionConfig {
    let members = BTreeSet::from([config.manufacturer_msp().clone(), config.dealer_msp().clone()]);
    CollectionConfig::builder()
        .name(config.order_collection())
        .member_orgs(members)
        .build()
        .expect("valid order collection")
}

/// A device input with fixed attributes.
#[must_use]
pub fn new_device(device_id: &str) -> NewDevice {
    NewDevice::builder()
        .device_id(device_id)
        .brand("Acme")
        .device_type("phone")
        .color("black")
        .manufacturer("AcmeCorp")
        .date_of_manufacture("2024-01-01")
        .build()
}

/// Transient map carrying all four order fields.
#[must_use]
pub fn order_transient(
    brand: &str,
    device_type: &str,
    color: &str,
    dealer_name: &str,
) -> TransientMap {
    transient(&[
        ("brand", brand),
        ("deviceType", device_type),
        ("color", color),
        ("dealerName", dealer_name),
    ])
}

/// A ledger, the deployed contracts, and a recording audit sink.
#[derive(Debug, Clone)]
pub struct TestNetwork {
    /// The shared ledger.
    pub ledger: MemoryLedger,
    /// Contracts under test.
    pub chaincode: Chaincode,
    /// Audit events of every mutating call.
    pub audit: Arc<MemoryAuditLogger>,
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl TestNetwork {
    /// Network with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ContractConfig::default())
    }

    /// Network with a custom configuration.
    #[must_use]
    pub fn with_config(config: ContractConfig) -> Self {
        let ledger = MemoryLedger::new().with_collection(order_collection(&config));
        let audit = Arc::new(MemoryAuditLogger::new());
        let env = ContractEnv::new(config).with_audit_logger(audit.clone());
        Self { ledger, chaincode: Chaincode::with_env(env), audit }
    }

    /// Opens a transaction as `msp_id`.
    #[must_use]
    pub fn begin(&self, msp_id: &str) -> MemoryTransaction {
        self.ledger.begin(StaticIdentity::new(MspId::from(msp_id)))
    }

    /// Invokes a function and commits on success.
    ///
    /// # Errors
    ///
    /// Returns the contract error, or `LedgerIo` if the commit conflicts.
    pub async fn submit(
        &self,
        msp_id: &str,
        contract: &str,
        function: &str,
        args: &[&str],
    ) -> ContractResult<String> {
        self.submit_tx(self.begin(msp_id), contract, function, args).await
    }

    /// Like [`submit`](Self::submit) with transient data attached.
    ///
    /// # Errors
    ///
    /// Returns the contract error, or `LedgerIo` if the commit conflicts.
    pub async fn submit_with_transient(
        &self,
        msp_id: &str,
        transient: TransientMap,
        contract: &str,
        function: &str,
        args: &[&str],
    ) -> ContractResult<String> {
        let tx = self.begin(msp_id).with_transient(transient);
        self.submit_tx(tx, contract, function, args).await
    }

    /// Invokes a function without committing.
    ///
    /// # Errors
    ///
    /// Returns the contract error.
    pub async fn evaluate(
        &self,
        msp_id: &str,
        contract: &str,
        function: &str,
        args: &[&str],
    ) -> ContractResult<String> {
        let tx = self.begin(msp_id);
        self.chaincode.invoke(&tx, contract, function, &owned(args)).await
    }

    /// Creates and commits a device as the manufacturer.
    ///
    /// # Panics
    ///
    /// Panics if creation or commit fails.
    pub async fn create_device(&self, device_id: &str) {
        let tx = self.begin(MANUFACTURER);
        self.chaincode.devices().create_device(&tx, new_device(device_id)).await.expect("create");
        tx.commit().expect("commit create");
    }

    /// Creates and commits an order as the dealer.
    ///
    /// # Panics
    ///
    /// Panics if creation or commit fails.
    pub async fn create_order(&self, order_id: &str, transient: TransientMap) {
        let tx = self.begin(DEALER).with_transient(transient);
        self.chaincode.orders().create_order(&tx, order_id).await.expect("create order");
        tx.commit().expect("commit order");
    }

    async fn submit_tx(
        &self,
        tx: MemoryTransaction,
        contract: &str,
        function: &str,
        args: &[&str],
    ) -> ContractResult<String> {
        let output = self.chaincode.invoke(&tx, contract, function, &owned(args)).await?;
        tx.commit()?;
        Ok(output)
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| (*a).to_owned()).collect()
}

/// Assert that a [`ContractResult`] failed with the given
/// [`ErrorKind`](crate::ErrorKind).
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use electronics_ledger_contracts::{ContractError, ContractResult, assert_contract_error};
///
/// let result: ContractResult<()> = Err(ContractError::not_found("device", "D1"));
/// assert_contract_error!(result, NotFound);
/// ```
#[macro_export]
macro_rules! assert_contract_error {
    ($result:expr, $kind:ident) => {
        match $result {
            Err(ref e) if e.kind() == $crate::ErrorKind::$kind => {},
            other => panic!("expected {} error, got: {:?}", stringify!($kind), other),
        }
    };
    ($result:expr, $kind:ident, $msg:expr) => {
        match $result {
            Err(ref e) if e.kind() == $crate::ErrorKind::$kind => {},
            other => panic!("{}: expected {} error, got: {:?}", $msg, stringify!($kind), other),
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ContractError;

    #[test]
    fn test_order_collection_members() {
        let collection = order_collection(&ContractConfig::default());
        assert!(collection.is_member(&MspId::from(MANUFACTURER)));
        assert!(collection.is_member(&MspId::from(DEALER)));
        assert!(!collection.is_member(&MspId::from(DISTRIBUTOR)));
    }

    #[test]
    fn test_assert_contract_error_matches_kind() {
        let result: ContractResult<()> = Err(ContractError::validation("bad"));
        assert_contract_error!(result, Validation);
    }

    #[test]
    #[should_panic(expected = "expected NotFound error")]
    fn test_assert_contract_error_reports_mismatch() {
        let result: ContractResult<()> = Ok(());
        assert_contract_error!(result, NotFound);
    }

    #[tokio::test]
    async fn test_create_device_fixture_commits() {
        let network = TestNetwork::new();
        network.create_device("D1").await;
        assert_eq!(network.ledger.height(), 1);
        assert_eq!(network.audit.len(), 1);
    }
}
