//! Per-invocation transaction context.

use crate::{identity::ClientIdentity, stub::ChaincodeStub};

/// Everything a contract method may use while handling one invocation.
///
/// Contracts hold no per-call state; the ledger stub and the caller's
/// identity both arrive through the context.
pub trait TransactionContext: Send + Sync {
    /// Ledger access for this transaction.
    fn stub(&self) -> &dyn ChaincodeStub;

    /// Identity of the submitting client.
    fn client_identity(&self) -> &dyn ClientIdentity;
}
