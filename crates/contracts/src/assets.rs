//! Ledger record types and their JSON encoding.
//!
//! Field names and order are part of the stored format and must not change.
//! Every record carries an `assetType` tag; decoding rejects bytes whose tag
//! names a different record type.

use chrono::{DateTime, Utc};
use electronics_ledger_storage::{KeyValue, ResultsIterator, StorageError};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{ContractError, ContractResult};

/// Tag of [`ElectronicDevice`] records.
pub const DEVICE_ASSET_TYPE: &str = "electronicDevice";

/// Tag of [`ElectronicsOrder`] records.
pub const ORDER_ASSET_TYPE: &str = "electronicsOrder";

/// Tag of [`DeviceAssignment`] records.
pub const ASSIGNMENT_ASSET_TYPE: &str = "DeviceAssignment";

/// Status of a freshly manufactured device.
pub const STATUS_IN_FACTORY: &str = "In Factory";

const KNOWN_ASSET_TYPES: [&str; 3] = [DEVICE_ASSET_TYPE, ORDER_ASSET_TYPE, ASSIGNMENT_ASSET_TYPE];

/// A record type stored on the ledger.
pub trait Asset: Serialize + DeserializeOwned {
    /// Value of the `assetType` field.
    const ASSET_TYPE: &'static str;

    /// Human-readable entity name used in error messages.
    const ENTITY: &'static str;

    /// The `assetType` this instance carries.
    fn asset_type(&self) -> &str;
}

/// A manufactured device, stored in world state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase")]
pub struct ElectronicDevice {
    /// Always [`DEVICE_ASSET_TYPE`] for stored records.
    #[builder(skip = DEVICE_ASSET_TYPE.to_owned())]
    pub asset_type: String,
    /// Unique device identifier.
    #[builder(into)]
    pub device_id: String,
    /// Color.
    #[builder(into)]
    pub color: String,
    /// Free-form manufacture date.
    #[builder(into)]
    pub date_of_manufacture: String,
    /// Brand.
    #[builder(into)]
    pub brand: String,
    /// Device category.
    #[builder(into)]
    pub device_type: String,
    /// Manufacturer name.
    #[builder(into)]
    pub owned_by: String,
    /// Lifecycle status.
    #[builder(into, default = STATUS_IN_FACTORY.to_owned())]
    pub status: String,
}

impl ElectronicDevice {
    /// Record standing in for a history entry without a payload.
    ///
    /// Only `deviceId` is set; every other field is empty.
    #[must_use]
    pub fn placeholder(device_id: impl Into<String>) -> Self {
        Self {
            asset_type: String::new(),
            device_id: device_id.into(),
            color: String::new(),
            date_of_manufacture: String::new(),
            brand: String::new(),
            device_type: String::new(),
            owned_by: String::new(),
            status: String::new(),
        }
    }

    /// Record standing in for a history entry written by another entity
    /// under the device's key.
    ///
    /// Carries the writer's `assetType` and the `deviceId`; every other
    /// field is empty.
    #[must_use]
    pub fn snapshot_of(device_id: impl Into<String>, asset_type: impl Into<String>) -> Self {
        Self { asset_type: asset_type.into(), ..Self::placeholder(device_id) }
    }
}

impl Asset for ElectronicDevice {
    const ASSET_TYPE: &'static str = DEVICE_ASSET_TYPE;
    const ENTITY: &'static str = "device";

    fn asset_type(&self) -> &str {
        &self.asset_type
    }
}

/// A confidential order, stored in the order collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase")]
pub struct ElectronicsOrder {
    /// Always [`ORDER_ASSET_TYPE`] for stored records.
    #[builder(skip = ORDER_ASSET_TYPE.to_owned())]
    pub asset_type: String,
    /// Color.
    #[builder(into)]
    pub color: String,
    /// Ordering dealer.
    #[builder(into)]
    pub dealer_name: String,
    /// Brand.
    #[builder(into)]
    pub brand: String,
    /// Device category.
    #[builder(into)]
    pub device_type: String,
    /// Unique order identifier.
    #[serde(rename = "orderID")]
    #[builder(into)]
    pub order_id: String,
}

impl Asset for ElectronicsOrder {
    const ASSET_TYPE: &'static str = ORDER_ASSET_TYPE;
    const ENTITY: &'static str = "order";

    fn asset_type(&self) -> &str {
        &self.asset_type
    }
}

/// A device handed to a retailer, stored in world state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAssignment {
    /// Always [`ASSIGNMENT_ASSET_TYPE`] for stored records.
    #[builder(skip = ASSIGNMENT_ASSET_TYPE.to_owned())]
    pub asset_type: String,
    /// Assigned device.
    #[serde(rename = "deviceID")]
    #[builder(into)]
    pub device_id: String,
    /// Receiving retailer.
    #[builder(into)]
    pub retailer_name: String,
    /// Quantity, kept as the caller supplied it.
    #[builder(into)]
    pub quantity: String,
}

impl Asset for DeviceAssignment {
    const ASSET_TYPE: &'static str = ASSIGNMENT_ASSET_TYPE;
    const ENTITY: &'static str = "assignment";

    fn asset_type(&self) -> &str {
        &self.asset_type
    }
}

/// One entry of a device's modification history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQueryResult {
    /// Device as of this change, a placeholder for deletions, or a
    /// [`ElectronicDevice::snapshot_of`] for writes by another entity.
    pub record: ElectronicDevice,
    /// Transaction that made the change.
    pub tx_id: String,
    /// Commit time in RFC 1123 form.
    pub timestamp: String,
    /// Whether the change removed the device.
    pub is_delete: bool,
}

/// Formats a timestamp as RFC 1123, e.g. `Mon, 02 Jan 2006 15:04:05 UTC`.
#[must_use]
pub fn rfc1123(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S UTC").to_string()
}

/// Serializes a record for storage.
pub(crate) fn encode<A: Asset>(asset: &A) -> ContractResult<Vec<u8>> {
    serde_json::to_vec(asset).map_err(|e| {
        ContractError::from(StorageError::serialization_with_source(
            format!("failed to encode {}", A::ENTITY),
            e,
        ))
    })
}

/// Decodes the bytes stored at `key`, checking the asset-type tag.
pub(crate) fn decode<A: Asset>(key: &str, bytes: &[u8]) -> ContractResult<A> {
    let asset: A = serde_json::from_slice(bytes)
        .map_err(|e| ContractError::deserialization_with_source(A::ENTITY, key, e))?;
    if asset.asset_type() != A::ASSET_TYPE {
        return Err(ContractError::deserialization(
            A::ENTITY,
            key,
            format!("asset type {:?} is not {:?}", asset.asset_type(), A::ASSET_TYPE),
        ));
    }
    Ok(asset)
}

/// Tag of a stored record when it is a different known record type.
///
/// Listings over the shared key layout use this to step over records of
/// other entities; anything unrecognized returns `None` and is left for
/// [`decode`] to reject.
pub(crate) fn foreign_asset_type<A: Asset>(bytes: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct Tagged {
        #[serde(rename = "assetType")]
        asset_type: String,
    }

    let tagged: Tagged = serde_json::from_slice(bytes).ok()?;
    (tagged.asset_type != A::ASSET_TYPE && KNOWN_ASSET_TYPES.contains(&tagged.asset_type.as_str()))
        .then_some(tagged.asset_type)
}

/// Decodes every record of type `A` from a range or rich-query result.
///
/// Records of other known types are skipped. The iterator is consumed, so
/// it is released on success and on the first error alike.
pub(crate) fn collect_records<A: Asset>(
    results: ResultsIterator<KeyValue>,
) -> ContractResult<Vec<A>> {
    let mut records = Vec::new();
    for item in results {
        let KeyValue { key, value } = item?;
        if let Some(other) = foreign_asset_type::<A>(&value) {
            tracing::debug!(key = %key, asset_type = %other, "skipping record of another type");
            continue;
        }
        records.push(decode(&key, &value)?);
    }
    Ok(records)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::error::ErrorKind;

    fn device() -> ElectronicDevice {
        ElectronicDevice::builder()
            .device_id("D1")
            .brand("Acme")
            .device_type("phone")
            .color("black")
            .owned_by("AcmeCorp")
            .date_of_manufacture("2024-01-01")
            .build()
    }

    #[test]
    fn test_device_json_field_order() {
        let json = String::from_utf8(encode(&device()).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"assetType":"electronicDevice","deviceId":"D1","color":"black","dateOfManufacture":"2024-01-01","brand":"Acme","deviceType":"phone","ownedBy":"AcmeCorp","status":"In Factory"}"#
        );
    }

    #[test]
    fn test_order_json_field_order() {
        let order = ElectronicsOrder::builder()
            .order_id("O1")
            .brand("Acme")
            .device_type("laptop")
            .color("silver")
            .dealer_name("BestDeals")
            .build();
        let json = String::from_utf8(encode(&order).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"assetType":"electronicsOrder","color":"silver","dealerName":"BestDeals","brand":"Acme","deviceType":"laptop","orderID":"O1"}"#
        );
    }

    #[test]
    fn test_assignment_json_field_order() {
        let assignment = DeviceAssignment::builder()
            .device_id("D1")
            .retailer_name("ShopCo")
            .quantity("5")
            .build();
        let json = String::from_utf8(encode(&assignment).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"assetType":"DeviceAssignment","deviceID":"D1","retailerName":"ShopCo","quantity":"5"}"#
        );
    }

    #[test]
    fn test_decode_rejects_other_asset_type() {
        let bytes = encode(&device()).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["assetType"] = "somethingElse".into();
        let err = decode::<ElectronicDevice>("D1", &serde_json::to_vec(&value).unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deserialization);
    }

    #[test]
    fn test_decode_device_as_assignment_fails() {
        let bytes = encode(&device()).unwrap();
        let err = decode::<DeviceAssignment>("D1", &bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deserialization);
        assert!(err.to_string().contains("as assignment"));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode::<ElectronicDevice>("D1", b"not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deserialization);
    }

    #[test]
    fn test_foreign_asset_type() {
        let device_bytes = encode(&device()).unwrap();
        assert_eq!(
            foreign_asset_type::<DeviceAssignment>(&device_bytes).as_deref(),
            Some(DEVICE_ASSET_TYPE)
        );
        assert_eq!(foreign_asset_type::<ElectronicDevice>(&device_bytes), None);
        assert_eq!(foreign_asset_type::<ElectronicDevice>(br#"{"assetType":"car"}"#), None);
        assert_eq!(foreign_asset_type::<ElectronicDevice>(b"\xff"), None);
    }

    #[test]
    fn test_collect_records_skips_other_entities() {
        let assignment = DeviceAssignment::builder()
            .device_id("D1")
            .retailer_name("ShopCo")
            .quantity("1")
            .build();
        let results = ResultsIterator::from_vec(vec![
            KeyValue::new("D1", encode(&device()).unwrap().into()),
            KeyValue::new("D1", encode(&assignment).unwrap().into()),
        ]);
        let devices = collect_records::<ElectronicDevice>(results).unwrap();
        assert_eq!(devices, vec![device()]);
    }

    #[test]
    fn test_collect_records_stops_on_malformed_record() {
        let results = ResultsIterator::from_vec(vec![
            KeyValue::new("D1", encode(&device()).unwrap().into()),
            KeyValue::new("D2", bytes::Bytes::from_static(b"{broken")),
        ]);
        let err = collect_records::<ElectronicDevice>(results).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deserialization);
        assert!(err.to_string().contains("D2"));
    }

    #[test]
    fn test_placeholder_serializes_empty_fields() {
        let json = serde_json::to_value(ElectronicDevice::placeholder("D9")).unwrap();
        assert_eq!(json["deviceId"], "D9");
        assert_eq!(json["assetType"], "");
        assert_eq!(json["status"], "");
    }

    #[test]
    fn test_rfc1123() {
        let ts = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(rfc1123(ts), "Mon, 02 Jan 2006 15:04:05 UTC");
    }

    #[test]
    fn test_snapshot_keeps_writer_tag() {
        let snapshot = ElectronicDevice::snapshot_of("D1", ASSIGNMENT_ASSET_TYPE);
        assert_eq!(snapshot.asset_type, ASSIGNMENT_ASSET_TYPE);
        assert_eq!(snapshot.device_id, "D1");
        assert_eq!(
            ElectronicDevice { asset_type: String::new(), ..snapshot },
            ElectronicDevice::placeholder("D1")
        );
    }

    #[test]
    fn test_history_result_field_names() {
        let entry = HistoryQueryResult {
            record: ElectronicDevice::placeholder("D1"),
            tx_id: "abc".to_owned(),
            timestamp: "Mon, 02 Jan 2006 15:04:05 UTC".to_owned(),
            is_delete: true,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["txId"], "abc");
        assert_eq!(json["isDelete"], true);
        assert!(json.get("record").is_some());
    }
}
