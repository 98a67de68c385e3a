//! Private order vault.
//!
//! Orders are stored in a private collection keyed by order id. Their
//! contents arrive through transient data so they never appear in the
//! transaction proposal; the ledger publishes only a hash, which lets any
//! organization check that an order exists without seeing it.

use electronics_ledger_storage::{RichQuery, TransactionContext, TransientMap};
use serde_json::{Map, Value};

use crate::{
    assets::{self, Asset as _, ElectronicsOrder, ORDER_ASSET_TYPE, collect_records},
    audit::order_resource,
    env::ContractEnv,
    error::{ContractError, ContractResult},
    policy::Operation,
};

/// Transient keys an order needs, in the order they are checked.
pub const ORDER_TRANSIENT_FIELDS: [&str; 4] = ["brand", "deviceType", "color", "dealerName"];

/// Order contents taken from a transaction's transient data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Brand.
    pub brand: String,
    /// Device category.
    pub device_type: String,
    /// Color.
    pub color: String,
    /// Ordering dealer.
    pub dealer_name: String,
}

impl OrderRequest {
    /// Parses the four order fields out of a transient map.
    ///
    /// Fields are checked in the order of [`ORDER_TRANSIENT_FIELDS`]. Only
    /// presence is required; an empty value is accepted.
    ///
    /// # Errors
    ///
    /// - [`ContractError::Validation`] if the map is empty or a value is not UTF-8
    /// - [`ContractError::MissingTransientField`] citing the first absent field
    pub fn from_transient(transient: &TransientMap) -> ContractResult<Self> {
        if transient.is_empty() {
            return Err(ContractError::validation(format!(
                "please provide the private data of {}",
                ORDER_TRANSIENT_FIELDS.join(", ")
            )));
        }

        let missing: Vec<&'static str> = ORDER_TRANSIENT_FIELDS
            .into_iter()
            .filter(|field| !transient.contains_key(*field))
            .collect();
        if let Some(&field) = missing.first() {
            return Err(ContractError::MissingTransientField { field, missing });
        }

        let text = |field: &'static str| -> ContractResult<String> {
            let bytes = transient.get(field).map(|b| b.to_vec()).unwrap_or_default();
            String::from_utf8(bytes).map_err(|_| {
                ContractError::validation(format!("the {field} in transient data is not UTF-8"))
            })
        };

        Ok(Self {
            brand: text("brand")?,
            device_type: text("deviceType")?,
            color: text("color")?,
            dealer_name: text("dealerName")?,
        })
    }

    fn into_record(self, order_id: &str) -> ElectronicsOrder {
        ElectronicsOrder::builder()
            .order_id(order_id)
            .brand(self.brand)
            .device_type(self.device_type)
            .color(self.color)
            .dealer_name(self.dealer_name)
            .build()
    }
}

/// Contract managing [`ElectronicsOrder`] records.
#[derive(Debug, Clone, Default)]
pub struct ElectronicsOrderContract {
    env: ContractEnv,
}

impl ElectronicsOrderContract {
    /// Creates the contract over a shared environment.
    #[must_use]
    pub fn new(env: ContractEnv) -> Self {
        Self { env }
    }

    fn collection(&self) -> &str {
        self.env.config().order_collection()
    }

    /// Whether an order exists, judged by its published hash.
    ///
    /// Works for every organization, member of the collection or not.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::LedgerIo`] if the hash lookup fails.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn order_exists<C>(&self, ctx: &C, order_id: &str) -> ContractResult<bool>
    where
        C: TransactionContext + ?Sized,
    {
        let hash = ctx.stub().get_private_data_hash(self.collection(), order_id).await?;
        Ok(hash.is_some_and(|h| !h.is_empty()))
    }

    /// Places an order whose contents come from transient data.
    ///
    /// # Errors
    ///
    /// - [`ContractError::Authorization`] unless the caller is the dealer
    /// - [`ContractError::AlreadyExists`] if the id is taken
    /// - [`ContractError::Validation`] or [`ContractError::MissingTransientField`] for bad
    ///   transient data
    #[tracing::instrument(skip(self, ctx))]
    pub async fn create_order<C>(&self, ctx: &C, order_id: &str) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        let outcome = self.try_create_order(ctx, order_id).await;
        let resource = order_resource(self.collection(), order_id);
        self.env.record(ctx, Operation::CreateOrder, resource, &outcome, Vec::new()).await;
        outcome
    }

    async fn try_create_order<C>(&self, ctx: &C, order_id: &str) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        self.env.authorize(ctx, Operation::CreateOrder)?;
        if self.order_exists(ctx, order_id).await? {
            return Err(ContractError::already_exists(ElectronicsOrder::ENTITY, order_id));
        }
        let request = OrderRequest::from_transient(&ctx.stub().get_transient()?)?;
        let record = request.into_record(order_id);
        ctx.stub().put_private_data(self.collection(), order_id, assets::encode(&record)?).await?;
        tracing::info!(order_id, collection = %self.collection(), "order created");
        Ok(format!("Order with ID {order_id} added successfully"))
    }

    /// Reads an order's private contents.
    ///
    /// # Errors
    ///
    /// - [`ContractError::NotFound`] if no hash is published for the id
    /// - [`ContractError::LedgerIo`] if the caller's organization may not read the collection
    /// - [`ContractError::Deserialization`] if the stored bytes are not an order
    #[tracing::instrument(skip(self, ctx))]
    pub async fn read_order<C>(&self, ctx: &C, order_id: &str) -> ContractResult<ElectronicsOrder>
    where
        C: TransactionContext + ?Sized,
    {
        if !self.order_exists(ctx, order_id).await? {
            return Err(ContractError::not_found(ElectronicsOrder::ENTITY, order_id));
        }
        match ctx.stub().get_private_data(self.collection(), order_id).await? {
            Some(bytes) => assets::decode(order_id, &bytes),
            None => Err(ContractError::not_found(ElectronicsOrder::ENTITY, order_id)),
        }
    }

    /// Removes an order from the collection.
    ///
    /// # Errors
    ///
    /// - [`ContractError::Authorization`] unless the caller is the manufacturer or dealer
    /// - [`ContractError::NotFound`] if absent
    #[tracing::instrument(skip(self, ctx))]
    pub async fn delete_order<C>(&self, ctx: &C, order_id: &str) -> ContractResult<()>
    where
        C: TransactionContext + ?Sized,
    {
        let outcome = self.try_delete_order(ctx, order_id).await;
        let resource = order_resource(self.collection(), order_id);
        self.env.record(ctx, Operation::DeleteOrder, resource, &outcome, Vec::new()).await;
        outcome
    }

    async fn try_delete_order<C>(&self, ctx: &C, order_id: &str) -> ContractResult<()>
    where
        C: TransactionContext + ?Sized,
    {
        self.env.authorize(ctx, Operation::DeleteOrder)?;
        if !self.order_exists(ctx, order_id).await? {
            return Err(ContractError::not_found(ElectronicsOrder::ENTITY, order_id));
        }
        ctx.stub().del_private_data(self.collection(), order_id).await?;
        tracing::info!(order_id, collection = %self.collection(), "order deleted");
        Ok(())
    }

    /// Every order in the collection.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::LedgerIo`] if the query fails or the caller
    /// may not read the collection, or [`ContractError::Deserialization`] on
    /// a malformed record.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_all_orders<C>(&self, ctx: &C) -> ContractResult<Vec<ElectronicsOrder>>
    where
        C: TransactionContext + ?Sized,
    {
        let query = all_orders_query().to_query_string()?;
        let results = ctx.stub().get_private_data_query_result(self.collection(), &query).await?;
        collect_records(results)
    }

    /// Orders whose id lies in `[start, end)`, ascending. Empty bounds are
    /// unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::LedgerIo`] if the scan fails or the caller
    /// may not read the collection, or [`ContractError::Deserialization`] on
    /// a malformed record.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_orders_by_range<C>(
        &self,
        ctx: &C,
        start: &str,
        end: &str,
    ) -> ContractResult<Vec<ElectronicsOrder>>
    where
        C: TransactionContext + ?Sized,
    {
        let results = ctx.stub().get_private_data_by_range(self.collection(), start, end).await?;
        collect_records(results)
    }
}

fn all_orders_query() -> RichQuery {
    let selector: Map<String, Value> =
        [("assetType".to_owned(), Value::from(ORDER_ASSET_TYPE))].into_iter().collect();
    RichQuery::builder().selector(selector).build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::error::ErrorKind;

    fn transient(pairs: &[(&str, &str)]) -> TransientMap {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), Bytes::copy_from_slice(value.as_bytes())))
            .collect()
    }

    #[test]
    fn test_all_orders_query() {
        assert_eq!(
            all_orders_query().to_query_string().unwrap(),
            r#"{"selector":{"assetType":"electronicsOrder"}}"#
        );
    }

    #[test]
    fn test_parse_complete_request() {
        let request = OrderRequest::from_transient(&transient(&[
            ("brand", "Acme"),
            ("deviceType", "laptop"),
            ("color", "silver"),
            ("dealerName", "BestDeals"),
        ]))
        .unwrap();
        assert_eq!(request.brand, "Acme");
        assert_eq!(request.dealer_name, "BestDeals");
    }

    #[test]
    fn test_empty_map_is_validation() {
        let err = OrderRequest::from_transient(&TransientMap::new()).unwrap_err();
        assert!(matches!(err, ContractError::Validation { .. }));
        assert_eq!(
            err.to_string(),
            "please provide the private data of brand, deviceType, color, dealerName"
        );
    }

    #[test]
    fn test_first_missing_field_is_cited() {
        let err = OrderRequest::from_transient(&transient(&[("brand", "Acme")])).unwrap_err();
        match err {
            ContractError::MissingTransientField { field, ref missing } => {
                assert_eq!(field, "deviceType");
                assert_eq!(missing, &["deviceType", "color", "dealerName"]);
            },
            other => panic!("expected MissingTransientField, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_value_counts_as_present() {
        let request = OrderRequest::from_transient(&transient(&[
            ("brand", ""),
            ("deviceType", "laptop"),
            ("color", "silver"),
            ("dealerName", "BestDeals"),
        ]))
        .unwrap();
        assert_eq!(request.brand, "");
    }

    #[test]
    fn test_non_utf8_value_is_validation() {
        let mut map = transient(&[("deviceType", "laptop"), ("color", "x"), ("dealerName", "d")]);
        map.insert("brand".to_owned(), Bytes::from_static(&[0xff, 0xfe]));
        let err = OrderRequest::from_transient(&map).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("brand"));
    }
}
