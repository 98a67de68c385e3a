//! Immutable settings shared by the contracts.

use std::{fmt, sync::Arc};

use electronics_ledger_storage::TransactionContext;

use crate::{
    audit::{AuditEvent, AuditLogger, AuditResult, NoopAuditLogger},
    config::ContractConfig,
    error::ContractResult,
    keys::KeyLayout,
    policy::{AccessPolicy, Operation},
};

/// Configuration, access policy and audit sink of a contract.
///
/// Cloning is cheap; all three contracts of one [`Chaincode`](crate::Chaincode)
/// share the same environment.
#[derive(Clone)]
pub struct ContractEnv {
    config: Arc<ContractConfig>,
    policy: Arc<AccessPolicy>,
    audit: Arc<dyn AuditLogger>,
}

impl ContractEnv {
    /// Environment with the policy derived from `config` and no audit sink.
    #[must_use]
    pub fn new(config: ContractConfig) -> Self {
        let policy = AccessPolicy::from_config(&config);
        Self {
            config: Arc::new(config),
            policy: Arc::new(policy),
            audit: Arc::new(NoopAuditLogger),
        }
    }

    /// Replaces the access policy.
    #[must_use]
    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Contract configuration.
    #[must_use]
    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    /// Access policy.
    #[must_use]
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub(crate) fn keys(&self) -> KeyLayout {
        self.config.key_layout()
    }

    pub(crate) fn authorize<C>(&self, ctx: &C, operation: Operation) -> ContractResult<()>
    where
        C: TransactionContext + ?Sized,
    {
        self.policy.authorize(ctx, operation).map(drop)
    }

    /// Emits the audit event for a finished mutating call.
    pub(crate) async fn record<C, T>(
        &self,
        ctx: &C,
        action: Operation,
        resource: String,
        outcome: &ContractResult<T>,
        metadata: Vec<(&str, &str)>,
    ) where
        C: TransactionContext + ?Sized,
    {
        let actor = ctx
            .client_identity()
            .msp_id()
            .map_or_else(|_| "unknown".to_owned(), |msp_id| msp_id.to_string());
        let event = AuditEvent::builder()
            .actor(actor)
            .action(action)
            .resource(resource)
            .tx_id(ctx.stub().tx_id().to_string())
            .result(AuditResult::from_outcome(outcome))
            .metadata(metadata.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect())
            .build();
        self.audit.log(&event).await;
    }
}

impl fmt::Debug for ContractEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractEnv")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for ContractEnv {
    fn default() -> Self {
        Self::new(ContractConfig::default())
    }
}
