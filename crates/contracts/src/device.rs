//! Device registry.
//!
//! Devices live in world state under [`KeyLayout::device_key`](crate::KeyLayout::device_key).
//! Only the manufacturer organization may create or delete them; anyone may
//! read, list and inspect their history.

use electronics_ledger_storage::{KeyModification, RichQuery, SortField, TransactionContext};
use serde_json::{Map, Value};

use crate::{
    assets::{
        self, Asset as _, DEVICE_ASSET_TYPE, ElectronicDevice, HistoryQueryResult, collect_records,
    },
    audit::device_resource,
    env::ContractEnv,
    error::{ContractError, ContractResult},
    policy::Operation,
};

/// Input of [`ElectronicDeviceContract::create_device`].
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct NewDevice {
    /// Unique device identifier.
    #[builder(into)]
    pub device_id: String,
    /// Brand.
    #[builder(into)]
    pub brand: String,
    /// Device category.
    #[builder(into)]
    pub device_type: String,
    /// Color.
    #[builder(into)]
    pub color: String,
    /// Manufacturer name, stored as `ownedBy`.
    #[builder(into)]
    pub manufacturer: String,
    /// Free-form manufacture date.
    #[builder(into)]
    pub date_of_manufacture: String,
}

impl NewDevice {
    fn into_record(self) -> ElectronicDevice {
        ElectronicDevice::builder()
            .device_id(self.device_id)
            .brand(self.brand)
            .device_type(self.device_type)
            .color(self.color)
            .owned_by(self.manufacturer)
            .date_of_manufacture(self.date_of_manufacture)
            .build()
    }
}

/// Contract managing [`ElectronicDevice`] records.
#[derive(Debug, Clone, Default)]
pub struct ElectronicDeviceContract {
    env: ContractEnv,
}

impl ElectronicDeviceContract {
    /// Creates the contract over a shared environment.
    #[must_use]
    pub fn new(env: ContractEnv) -> Self {
        Self { env }
    }

    /// Whether a device with this id is stored.
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

    /// Registers a device with status "In Factory".
    ///
    /// # Errors
    ///
    /// - [`ContractError::Authorization`] unless the caller is the manufacturer
    /// - [`ContractError::AlreadyExists`] if the id is taken
    #[tracing::instrument(skip(self, ctx, device), fields(device_id = %device.device_id))]
    pub async fn create_device<C>(&self, ctx: &C, device: NewDevice) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        let resource = device_resource(&device.device_id);
        let outcome = self.try_create_device(ctx, device).await;
        self.env.record(ctx, Operation::CreateDevice, resource, &outcome, Vec::new()).await;
        outcome
    }

    async fn try_create_device<C>(&self, ctx: &C, device: NewDevice) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        self.env.authorize(ctx, Operation::CreateDevice)?;
        if self.device_exists(ctx, &device.device_id).await? {
            return Err(ContractError::already_exists(ElectronicDevice::ENTITY, device.device_id));
        }
        let record = device.into_record();
        let key = self.env.keys().device_key(&record.device_id);
        ctx.stub().put_state(&key, assets::encode(&record)?).await?;
        tracing::info!(device_id = %record.device_id, "device created");
        Ok(format!("Successfully added device {}", record.device_id))
    }

    /// Reads a device.
    ///
    /// # Errors
    ///
    /// - [`ContractError::NotFound`] if absent
    /// - [`ContractError::Deserialization`] if the stored bytes are not a device
    #[tracing::instrument(skip(self, ctx))]
    pub async fn read_device<C>(&self, ctx: &C, device_id: &str) -> ContractResult<ElectronicDevice>
    where
        C: TransactionContext + ?Sized,
    {
        let key = self.env.keys().device_key(device_id);
        match ctx.stub().get_state(&key).await? {
            Some(bytes) => assets::decode(&key, &bytes),
            None => Err(ContractError::not_found(ElectronicDevice::ENTITY, device_id)),
        }
    }

    /// Removes a device from world state. Its history remains.
    ///
    /// # Errors
    ///
    /// - [`ContractError::Authorization`] unless the caller is the manufacturer
    /// - [`ContractError::NotFound`] if absent
    #[tracing::instrument(skip(self, ctx))]
    pub async fn delete_device<C>(&self, ctx: &C, device_id: &str) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        let outcome = self.try_delete_device(ctx, device_id).await;
        let resource = device_resource(device_id);
        self.env.record(ctx, Operation::DeleteDevice, resource, &outcome, Vec::new()).await;
        outcome
    }

    async fn try_delete_device<C>(&self, ctx: &C, device_id: &str) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        self.env.authorize(ctx, Operation::DeleteDevice)?;
        if !self.device_exists(ctx, device_id).await? {
            return Err(ContractError::not_found(ElectronicDevice::ENTITY, device_id));
        }
        ctx.stub().del_state(&self.env.keys().device_key(device_id)).await?;
        tracing::info!(device_id, "device deleted");
        Ok(format!("Device with id {device_id} is deleted from world state."))
    }

    /// Every stored device, highest `deviceId` first.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::LedgerIo`] if the query fails, or
    /// [`ContractError::Deserialization`] on a malformed record.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_all_devices<C>(&self, ctx: &C) -> ContractResult<Vec<ElectronicDevice>>
    where
        C: TransactionContext + ?Sized,
    {
        let query = all_devices_query().to_query_string()?;
        let results = ctx.stub().get_query_result(&query).await?;
        collect_records(results)
    }

    /// Devices whose id lies in `[start, end)`, ascending. Empty bounds are
    /// unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::LedgerIo`] if the scan fails, or
    /// [`ContractError::Deserialization`] on a malformed record.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_devices_by_range<C>(
        &self,
        ctx: &C,
        start: &str,
        end: &str,
    ) -> ContractResult<Vec<ElectronicDevice>>
    where
        C: TransactionContext + ?Sized,
    {
        let (start_key, end_key) = self.env.keys().device_range(start, end);
        let results = ctx.stub().get_state_by_range(&start_key, &end_key).await?;
        collect_records(results)
    }

    /// Every committed change to a device, oldest first.
    ///
    /// Deletions carry a placeholder record holding only the device id.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::LedgerIo`] if the history lookup fails, or
    /// [`ContractError::Deserialization`] on a malformed entry.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_device_history<C>(
        &self,
        ctx: &C,
        device_id: &str,
    ) -> ContractResult<Vec<HistoryQueryResult>>
    where
        C: TransactionContext + ?Sized,
    {
        let key = self.env.keys().device_key(device_id);
        let history = ctx.stub().get_history_for_key(&key).await?;
        let mut entries = Vec::new();
        for modification in history {
            let KeyModification { tx_id, timestamp, value, is_delete } = modification?;
            let record = if value.is_empty() {
                ElectronicDevice::placeholder(device_id)
            } else if let Some(other) = assets::foreign_asset_type::<ElectronicDevice>(&value) {
                ElectronicDevice::snapshot_of(device_id, other)
            } else {
                assets::decode(&key, &value)?
            };
            entries.push(HistoryQueryResult {
                record,
                tx_id: tx_id.to_string(),
                timestamp: assets::rfc1123(timestamp),
                is_delete,
            });
        }
        Ok(entries)
    }
}

/// `{"selector":{"assetType":"electronicDevice"},"sort":[{"deviceId":"desc"}]}`
fn all_devices_query() -> RichQuery {
    let selector: Map<String, Value> =
        [("assetType".to_owned(), Value::from(DEVICE_ASSET_TYPE))].into_iter().collect();
    RichQuery::builder().selector(selector).sort(vec![SortField::desc("deviceId")]).build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_all_devices_query_is_one_object() {
        let text = all_devices_query().to_query_string().unwrap();
        assert_eq!(
            text,
            r#"{"selector":{"assetType":"electronicDevice"},"sort":[{"deviceId":"desc"}]}"#
        );
    }

    #[test]
    fn test_new_device_maps_manufacturer_to_owner() {
        let record = NewDevice::builder()
            .device_id("D1")
            .brand("Acme")
            .device_type("phone")
            .color("black")
            .manufacturer("AcmeCorp")
            .date_of_manufacture("2024-01-01")
            .build()
            .into_record();
        assert_eq!(record.owned_by, "AcmeCorp");
        assert_eq!(record.status, assets::STATUS_IN_FACTORY);
        assert_eq!(record.asset_type, DEVICE_ASSET_TYPE);
    }
}
