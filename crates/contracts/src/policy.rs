//! Organization-level access policy.
//!
//! Every mutating operation is guarded by one [`AccessPolicy::authorize`]
//! call that looks the caller's organization up in a table mapping each
//! [`Operation`] to the organizations allowed to perform it.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use electronics_ledger_storage::{MspId, TransactionContext};

use crate::{
    config::ContractConfig,
    error::{ContractError, ContractResult},
};

/// A guarded contract operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    /// Register a new device.
    CreateDevice,
    /// Remove a device from world state.
    DeleteDevice,
    /// Place a private order.
    CreateOrder,
    /// Remove a private order.
    DeleteOrder,
    /// Record a device assignment to a retailer.
    AssignDevice,
}

impl Operation {
    /// Every guarded operation.
    pub const ALL: [Self; 5] = [
        Self::CreateDevice,
        Self::DeleteDevice,
        Self::CreateOrder,
        Self::DeleteOrder,
        Self::AssignDevice,
    ];
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDevice => write!(f, "create_device"),
            Self::DeleteDevice => write!(f, "delete_device"),
            Self::CreateOrder => write!(f, "create_order"),
            Self::DeleteOrder => write!(f, "delete_order"),
            Self::AssignDevice => write!(f, "assign_device"),
        }
    }
}

/// Table of which organizations may perform which operation.
///
/// # Example
///
/// ```
/// use electronics_ledger_contracts::{AccessPolicy, ContractConfig, Operation};
/// use electronics_ledger_storage::MspId;
///
/// let policy = AccessPolicy::from_config(&ContractConfig::default());
/// assert!(policy.allows(Operation::DeleteOrder, &MspId::from("Org1MSP")));
/// assert!(policy.allows(Operation::DeleteOrder, &MspId::from("Org2MSP")));
/// assert!(!policy.allows(Operation::DeleteOrder, &MspId::from("Org3MSP")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    grants: BTreeMap<Operation, BTreeSet<MspId>>,
}

impl AccessPolicy {
    /// Policy with no grants; every operation is refused.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Standard role assignment derived from the configured organizations.
    ///
    /// | Operation | Allowed |
    /// |-----------|---------|
    /// | `CreateDevice`, `DeleteDevice` | manufacturer |
    /// | `CreateOrder` | dealer |
    /// | `DeleteOrder` | manufacturer, dealer |
    /// | `AssignDevice` | distributor |
    #[must_use]
    pub fn from_config(config: &ContractConfig) -> Self {
        let manufacturer = config.manufacturer_msp();
        let dealer = config.dealer_msp();
        Self::deny_all()
            .grant(Operation::CreateDevice, manufacturer.clone())
            .grant(Operation::DeleteDevice, manufacturer.clone())
            .grant(Operation::CreateOrder, dealer.clone())
            .grant(Operation::DeleteOrder, manufacturer.clone())
            .grant(Operation::DeleteOrder, dealer.clone())
            .grant(Operation::AssignDevice, config.distributor_msp().clone())
    }

    /// Adds `msp_id` to the organizations allowed to perform `operation`.
    #[must_use]
    pub fn grant(mut self, operation: Operation, msp_id: impl Into<MspId>) -> Self {
        self.grants.entry(operation).or_default().insert(msp_id.into());
        self
    }

    /// Whether `msp_id` may perform `operation`.
    #[must_use]
    pub fn allows(&self, operation: Operation, msp_id: &MspId) -> bool {
        self.grants.get(&operation).is_some_and(|orgs| orgs.contains(msp_id))
    }

    /// Organizations allowed to perform `operation`.
    pub fn permitted(&self, operation: Operation) -> impl Iterator<Item = &MspId> {
        self.grants.get(&operation).into_iter().flatten()
    }

    /// Resolves the caller's organization and checks it against the table.
    ///
    /// Returns the caller's organization so callers can record it.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Authorization`] when the organization is not
    /// allowed, or [`ContractError::LedgerIo`] when the identity cannot be
    /// resolved.
    pub fn authorize<C>(&self, ctx: &C, operation: Operation) -> ContractResult<MspId>
    where
        C: TransactionContext + ?Sized,
    {
        let msp_id = ctx.client_identity().msp_id()?;
        if self.allows(operation, &msp_id) {
            return Ok(msp_id);
        }
        tracing::warn!(msp_id = %msp_id, operation = %operation, "authorization denied");
        Err(ContractError::Authorization { msp_id, operation })
    }
}
