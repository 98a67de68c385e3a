//! Private data collection definitions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, types::MspId};

/// Definition of one private data collection.
///
/// Values in a collection are disseminated only to member organizations.
/// Everyone else sees the SHA-256 hash that each write publishes. Any
/// organization may write.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
///
/// use electronics_ledger_storage::{CollectionConfig, MspId};
///
/// let orders = CollectionConfig::builder()
///     .name("ElectronicsOrderCollection")
///     .member_orgs(BTreeSet::from([MspId::from("Org1MSP"), MspId::from("Org2MSP")]))
///     .build()
///     .unwrap();
///
/// assert!(orders.is_member(&MspId::from("Org2MSP")));
/// assert!(!orders.is_member(&MspId::from("Org3MSP")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    name: String,
    member_orgs: BTreeSet<MspId>,
    #[serde(default = "default_true")]
    member_only_read: bool,
}

fn default_true() -> bool {
    true
}

#[bon::bon]
impl CollectionConfig {
    /// Creates a validated collection definition.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Empty`] if the name or member list is empty.
    #[builder]
    pub fn new(
        #[builder(into)] name: String,
        member_orgs: BTreeSet<MspId>,
        #[builder(default = true)] member_only_read: bool,
    ) -> Result<Self, ConfigError> {
        let config = Self { name, member_orgs, member_only_read };
        config.validate()?;
        Ok(config)
    }
}

impl CollectionConfig {
    /// Checks the invariants enforced by the builder.
    ///
    /// Useful after deserialization, which bypasses the builder.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Empty`] if the name or member list is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Empty { field: "name" });
        }
        if self.member_orgs.is_empty() {
            return Err(ConfigError::Empty { field: "member_orgs" });
        }
        Ok(())
    }

    /// Collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Organizations that receive the private values.
    #[must_use]
    pub fn member_orgs(&self) -> &BTreeSet<MspId> {
        &self.member_orgs
    }

    /// Whether `org` is a member.
    #[must_use]
    pub fn is_member(&self, org: &MspId) -> bool {
        self.member_orgs.contains(org)
    }

    /// Whether `org` may read private values.
    #[must_use]
    pub fn can_read(&self, org: &MspId) -> bool {
        !self.member_only_read || self.is_member(org)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn orgs(names: &[&str]) -> BTreeSet<MspId> {
        names.iter().map(|n| MspId::from(*n)).collect()
    }

    #[test]
    fn test_builder_rejects_empty_name() {
        let err = CollectionConfig::builder().name("  ").member_orgs(orgs(&["Org1MSP"])).build();
        assert_eq!(err.unwrap_err(), ConfigError::Empty { field: "name" });
    }

    #[test]
    fn test_builder_rejects_no_members() {
        let err = CollectionConfig::builder().name("c").member_orgs(BTreeSet::new()).build();
        assert_eq!(err.unwrap_err(), ConfigError::Empty { field: "member_orgs" });
    }

    #[test]
    fn test_read_policy() {
        let members = orgs(&["Org1MSP"]);
        let outsider = MspId::from("Org3MSP");

        let config =
            CollectionConfig::builder().name("c").member_orgs(members.clone()).build().unwrap();
        assert!(config.can_read(&MspId::from("Org1MSP")));
        assert!(!config.can_read(&outsider));

        let open = CollectionConfig::builder()
            .name("c")
            .member_orgs(members)
            .member_only_read(false)
            .build()
            .unwrap();
        assert!(open.can_read(&outsider));
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let config: CollectionConfig =
            serde_json::from_str(r#"{"name":"c","member_orgs":["Org1MSP"]}"#).unwrap();
        assert!(config.validate().is_ok());
        assert!(!config.can_read(&MspId::from("Org2MSP")));
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result =
            serde_json::from_str::<CollectionConfig>(r#"{"name":"c","member_orgs":[],"ttl":1}"#);
        assert!(result.is_err());
    }
}
