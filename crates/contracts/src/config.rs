//! Configuration for the registry contracts.
//!
//! [`ContractConfig`] names the organizations that play the manufacturer,
//! dealer and distributor roles, the private collection holding orders, and
//! the [`KeyLayout`] used for device and assignment records.

use electronics_ledger_storage::{ConfigError, MspId};
use serde::{Deserialize, Serialize};

use crate::keys::KeyLayout;

/// Default manufacturer organization.
pub const DEFAULT_MANUFACTURER_MSP: &str = "Org1MSP";

/// Default dealer organization.
pub const DEFAULT_DEALER_MSP: &str = "Org2MSP";

/// Default distributor organization.
pub const DEFAULT_DISTRIBUTOR_MSP: &str = "Org3MSP";

/// Default private collection for orders.
pub const DEFAULT_ORDER_COLLECTION: &str = "ElectronicsOrderCollection";

/// Configuration shared by all three contracts.
///
/// # Example
///
/// ```
/// use electronics_ledger_contracts::{ContractConfig, KeyLayout};
///
/// let config = ContractConfig::builder()
///     .dealer_msp("DealerMSP")
///     .key_layout(KeyLayout::Shared)
///     .build()?;
///
/// assert_eq!(config.dealer_msp().as_str(), "DealerMSP");
/// assert_eq!(config.manufacturer_msp().as_str(), "Org1MSP");
/// # Ok::<(), electronics_ledger_storage::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractConfig {
    /// Organization allowed to create and delete devices.
    #[serde(default = "default_manufacturer_msp")]
    pub(crate) manufacturer_msp: MspId,

    /// Organization allowed to create orders.
    #[serde(default = "default_dealer_msp")]
    pub(crate) dealer_msp: MspId,

    /// Organization allowed to assign devices to retailers.
    #[serde(default = "default_distributor_msp")]
    pub(crate) distributor_msp: MspId,

    /// Private collection holding order payloads.
    #[serde(default = "default_order_collection")]
    pub(crate) order_collection: String,

    /// Key layout for devices and assignments.
    #[serde(default)]
    pub(crate) key_layout: KeyLayout,
}

fn default_manufacturer_msp() -> MspId {
    MspId::from(DEFAULT_MANUFACTURER_MSP)
}

fn default_dealer_msp() -> MspId {
    MspId::from(DEFAULT_DEALER_MSP)
}

fn default_distributor_msp() -> MspId {
    MspId::from(DEFAULT_DISTRIBUTOR_MSP)
}

fn default_order_collection() -> String {
    DEFAULT_ORDER_COLLECTION.to_owned()
}

#[bon::bon]
impl ContractConfig {
    /// Creates a validated configuration.
    ///
    /// Every field has a default, so `ContractConfig::builder().build()`
    /// yields the standard three-organization network.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any organization id or the collection name
    /// is blank, or if the collection name contains whitespace.
    #[builder]
    pub fn new(
        #[builder(into, default = default_manufacturer_msp())] manufacturer_msp: MspId,
        #[builder(into, default = default_dealer_msp())] dealer_msp: MspId,
        #[builder(into, default = default_distributor_msp())] distributor_msp: MspId,
        #[builder(into, default = default_order_collection())] order_collection: String,
        #[builder(default)] key_layout: KeyLayout,
    ) -> Result<Self, ConfigError> {
        let config =
            Self { manufacturer_msp, dealer_msp, distributor_msp, order_collection, key_layout };
        config.validate()?;
        Ok(config)
    }
}

impl ContractConfig {
    /// Checks the invariants enforced by the builder.
    ///
    /// Deserialization bypasses the builder, so call this on loaded configs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Empty`] for a blank field and
    /// [`ConfigError::Invalid`] for a collection name with whitespace.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("manufacturer_msp", self.manufacturer_msp.as_str()),
            ("dealer_msp", self.dealer_msp.as_str()),
            ("distributor_msp", self.distributor_msp.as_str()),
            ("order_collection", self.order_collection.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty { field });
            }
        }
        if self.order_collection.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                field: "order_collection",
                value: self.order_collection.clone(),
                reason: "collection names cannot contain whitespace".to_owned(),
            });
        }
        Ok(())
    }

    /// Manufacturer organization.
    #[must_use]
    pub fn manufacturer_msp(&self) -> &MspId {
        &self.manufacturer_msp
    }

    /// Dealer organization.
    #[must_use]
    pub fn dealer_msp(&self) -> &MspId {
        &self.dealer_msp
    }

    /// Distributor organization.
    #[must_use]
    pub fn distributor_msp(&self) -> &MspId {
        &self.distributor_msp
    }

    /// Private collection for orders.
    #[must_use]
    pub fn order_collection(&self) -> &str {
        &self.order_collection
    }

    /// Key layout for devices and assignments.
    #[must_use]
    pub fn key_layout(&self) -> KeyLayout {
        self.key_layout
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            manufacturer_msp: default_manufacturer_msp(),
            dealer_msp: default_dealer_msp(),
            distributor_msp: default_distributor_msp(),
            order_collection: default_order_collection(),
            key_layout: KeyLayout::default(),
        }
    }
}
