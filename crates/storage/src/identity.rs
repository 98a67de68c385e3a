//! Caller identity.

use crate::{error::StorageResult, types::MspId};

/// Resolves who submitted the current transaction.
pub trait ClientIdentity: Send + Sync {
    /// Membership service provider id of the caller's organization.
    fn msp_id(&self) -> StorageResult<MspId>;

    /// Opaque unique id of the calling user.
    fn id(&self) -> StorageResult<String>;
}

/// A fixed identity, used by [`MemoryLedger`](crate::MemoryLedger) and tests.
///
/// # Examples
///
/// ```
/// use electronics_ledger_storage::{ClientIdentity, StaticIdentity};
///
/// let caller = StaticIdentity::new("Org2MSP").with_id("dealer-admin");
/// assert_eq!(caller.msp_id().unwrap().as_str(), "Org2MSP");
/// assert_eq!(caller.id().unwrap(), "dealer-admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity {
    msp_id: MspId,
    id: String,
}

impl StaticIdentity {
    /// Creates an identity for an anonymous member of `msp_id`.
    pub fn new(msp_id: impl Into<MspId>) -> Self {
        let msp_id = msp_id.into();
        let id = format!("x509::CN=user::{msp_id}");
        Self { msp_id, id }
    }

    /// Overrides the user id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

impl ClientIdentity for StaticIdentity {
    fn msp_id(&self) -> StorageResult<MspId> {
        Ok(self.msp_id.clone())
    }

    fn id(&self) -> StorageResult<String> {
        Ok(self.id.clone())
    }
}
