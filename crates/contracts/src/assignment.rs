//! Assignment ledger.
//!
//! Records which retailer received a device. Assignments are keyed by device
//! id and can only be made for devices that exist.

use electronics_ledger_storage::TransactionContext;

use crate::{
    assets::{self, Asset as _, DeviceAssignment, ElectronicDevice},
    audit::assignment_resource,
    env::ContractEnv,
    error::{ContractError, ContractResult},
    policy::Operation,
};

/// Contract managing [`DeviceAssignment`] records.
#[derive(Debug, Clone, Default)]
pub struct ElectronicAssignmentContract {
    env: ContractEnv,
}

impl ElectronicAssignmentContract {
    /// Creates the contract over a shared environment.
    #[must_use]
    pub fn new(env: ContractEnv) -> Self {
        Self { env }
    }

    /// Whether the device key holds a value.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::LedgerIo`] if the ledger read fails.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn device_exists<C>(&self, ctx: &C, device_id: &str) -> ContractResult<bool>
    where
        C: TransactionContext + ?Sized,
    {
        let key = self.env.keys().device_key(device_id);
        Ok(ctx.stub().get_state(&key).await?.is_some())
    }

    /// Records that `quantity` units of a device went to `retailer_name`.
    ///
    /// A later assignment of the same device replaces the earlier one.
    ///
    /// # Errors
    ///
    /// - [`ContractError::Authorization`] unless the caller is the distributor
    /// - [`ContractError::NotFound`] if the device does not exist
    #[tracing::instrument(skip(self, ctx))]
    pub async fn assign_device_to_retailer<C>(
        &self,
        ctx: &C,
        device_id: &str,
        retailer_name: &str,
        quantity: &str,
    ) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        let outcome = self.try_assign(ctx, device_id, retailer_name, quantity).await;
        let metadata = vec![("retailer", retailer_name), ("quantity", quantity)];
        let resource = assignment_resource(device_id);
        self.env.record(ctx, Operation::AssignDevice, resource, &outcome, metadata).await;
        outcome
    }

    async fn try_assign<C>(
        &self,
        ctx: &C,
        device_id: &str,
        retailer_name: &str,
        quantity: &str,
    ) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        self.env.authorize(ctx, Operation::AssignDevice)?;
        if !self.device_exists(ctx, device_id).await? {
            return Err(ContractError::not_found(ElectronicDevice::ENTITY, device_id));
        }
        let assignment = DeviceAssignment::builder()
            .device_id(device_id)
            .retailer_name(retailer_name)
            .quantity(quantity)
            .build();
        let key = self.env.keys().assignment_key(device_id);
        ctx.stub().put_state(&key, assets::encode(&assignment)?).await?;
        tracing::info!(device_id, retailer_name, "device assigned");
        Ok(format!(
            "Device {device_id} assigned to retailer {retailer_name} with quantity {quantity}"
        ))
    }

    /// Reads the assignment of a device.
    ///
    /// # Errors
    ///
    /// - [`ContractError::NotFound`] if the device or its assignment is absent
    /// - [`ContractError::Deserialization`] if the stored bytes are not an assignment
    #[tracing::instrument(skip(self, ctx))]
    pub async fn read_device_assignment<C>(
        &self,
        ctx: &C,
        device_id: &str,
    ) -> ContractResult<DeviceAssignment>
    where
        C: TransactionContext + ?Sized,
    {
        if !self.device_exists(ctx, device_id).await? {
            return Err(ContractError::not_found(ElectronicDevice::ENTITY, device_id));
        }
        let key = self.env.keys().assignment_key(device_id);
        match ctx.stub().get_state(&key).await? {
            Some(bytes) => assets::decode(&key, &bytes),
            None => Err(ContractError::not_found(DeviceAssignment::ENTITY, device_id)),
        }
    }
}
